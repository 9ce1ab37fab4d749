//! Structured execution tracing (`SPEC_FULL.md` AMBIENT-2).
//!
//! Generalizes the teacher's trait-based, zero-cost-when-`Noop` tracer
//! design (bytecode instruction events) to the tree-walking evaluator's
//! coarser event set: calls, pipe stages, decorator wraps, and errors.

use std::fmt;

/// One traced evaluator event. Kept flat and `Clone` so [`RecordingTracer`]
/// can store a `Vec<TraceEvent>` cheaply.
#[derive(Debug, Clone)]
pub enum TraceEvent {
    /// A function (or reversible-function direction) was invoked.
    Call { name: String, depth: usize },
    /// A function call returned a value, rendered for display.
    Return { name: String, result: String },
    /// A pipe expression moved a value into its next stage.
    Pipe { kind: &'static str, target: String },
    /// A decorator wrapped a call with the given argument count.
    Decorator { name: String, args: usize },
    /// Evaluation failed; carries the error's display string.
    Error { message: String },
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceEvent::Call { name, depth } => write!(f, "{:>width$}call {name}", "", width = depth * 2),
            TraceEvent::Return { name, result } => write!(f, "  -> {name} = {result}"),
            TraceEvent::Pipe { kind, target } => write!(f, "  {kind} -> {target}"),
            TraceEvent::Decorator { name, args } => write!(f, "  #{name}({args} args)"),
            TraceEvent::Error { message } => write!(f, "  ! {message}"),
        }
    }
}

/// Receives [`TraceEvent`]s as evaluation proceeds. The `#trace` and
/// `#debug` decorators (`spec.md` §4.6) emit through whichever tracer the
/// `Evaluator` was constructed with; `#log`/`#log_verbose` write straight to
/// the configured `PrintWriter` instead and do not go through this trait.
pub trait VmTracer {
    fn on_event(&mut self, event: TraceEvent);
}

/// Discards every event. Picking this tracer costs nothing beyond a single
/// empty-function call per event — no allocation, no formatting.
#[derive(Debug, Default)]
pub struct NoopTracer;

impl VmTracer for NoopTracer {
    fn on_event(&mut self, _event: TraceEvent) {}
}

/// Writes each event to stderr as it happens, for interactive debugging
/// (`conduit-cli`'s `--trace` flag).
#[derive(Debug, Default)]
pub struct StderrTracer;

impl VmTracer for StderrTracer {
    fn on_event(&mut self, event: TraceEvent) {
        eprintln!("{event}");
    }
}

/// Buffers every event for later inspection; used by `#debug` and by tests
/// that assert on traced call order.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    events: Vec<TraceEvent>,
}

impl RecordingTracer {
    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn take(&mut self) -> Vec<TraceEvent> {
        std::mem::take(&mut self.events)
    }
}

impl VmTracer for RecordingTracer {
    fn on_event(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}

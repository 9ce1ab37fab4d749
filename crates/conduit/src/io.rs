//! `print` output sink abstraction (`SPEC_FULL.md` AMBIENT-2 companion).
//!
//! Generalizes the teacher's `PrintWriter` trait (originally split into
//! per-argument writes plus a separator/terminator call, to match CPython's
//! `print(*args, sep=, end=)` signature) down to the one call Conduit's
//! kernel `print` builtin needs: a single already-joined line
//! (`spec.md` §6: "`print(x)` -> prints `x`'s display form").

use std::{
    cell::RefCell,
    io::{self, Write as _},
};

/// Receives output from the `print` kernel built-in (`spec.md` §10) and from
/// the `#log`/`#log_verbose`/`#tease` decorators (`spec.md` §4.6).
pub trait PrintWriter {
    /// Writes one line (without a trailing newline; the implementation adds
    /// its own line separator).
    fn write_line(&mut self, line: &str);
}

/// Default writer: stdout, one line per call.
#[derive(Debug, Default)]
pub struct StdPrint;

impl PrintWriter for StdPrint {
    fn write_line(&mut self, line: &str) {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        let _ = writeln!(lock, "{line}");
    }
}

/// Collects every line into a buffer instead of writing to stdout. Used by
/// `#pure` (swapped in for the duration of a call to catch accidental
/// prints) and by tests that assert on printed output without capturing
/// process stdout.
#[derive(Debug, Default)]
pub struct CollectStringPrint(RefCell<String>);

impl CollectStringPrint {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn output(&self) -> String {
        self.0.borrow().clone()
    }

    #[must_use]
    pub fn into_output(self) -> String {
        self.0.into_inner()
    }
}

impl PrintWriter for CollectStringPrint {
    fn write_line(&mut self, line: &str) {
        let mut buf = self.0.borrow_mut();
        buf.push_str(line);
        buf.push('\n');
    }
}

/// Discards all output. Used by `#pure` to detect-and-warn on a `print` call
/// without actually emitting anything.
#[derive(Debug, Default)]
pub struct NoPrint;

impl PrintWriter for NoPrint {
    fn write_line(&mut self, _line: &str) {}
}

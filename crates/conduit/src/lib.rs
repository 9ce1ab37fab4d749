#![doc = include_str!("../../../README.md")]
#![expect(clippy::cast_possible_truncation, reason = "numeric narrowing is checked")]
#![expect(clippy::cast_sign_loss, reason = "sign-changing casts are intentional")]
#![expect(clippy::too_many_arguments, reason = "some constructors mirror AST node shapes")]
#![expect(clippy::type_complexity, reason = "executor/decorator types are intentionally rich")]

pub mod builtins;
pub mod context;
pub mod decorator;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod expressions;
pub mod function;
pub mod io;
pub mod lexer;
pub mod ops;
pub mod parser;
pub mod pipe;
pub mod pipeline;
pub mod promise;
pub mod resource;
pub mod run;
pub mod signature;
pub mod tracer;
pub mod value;

pub use context::ContextRegistry;
pub use environment::{EnvRef, Environment};
pub use error::{ErrorKind, RunError, RunResult};
pub use evaluator::Evaluator;
pub use expressions::Program;
pub use function::Function;
pub use io::{CollectStringPrint, NoPrint, PrintWriter, StdPrint};
pub use parser::parse_program;
pub use pipeline::{BidirectionalPipeline, Pipeline, ReversibleFunction};
pub use promise::Promise;
pub use resource::ResourceLimits;
pub use run::{prepare_root, run, run_async};
pub use tracer::{NoopTracer, RecordingTracer, StderrTracer, TraceEvent, VmTracer};
pub use value::Value;

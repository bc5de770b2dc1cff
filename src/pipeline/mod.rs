//! Staged pipeline: step contract, shared context and runner
//!
//! A run executes its steps strictly one after another. The first failing
//! step stops the run unless it opts into `continue_on_error`; either way the
//! run finishes FAILED and its record is finalized.

mod context;
mod runner;
mod step;
pub mod steps;

pub use context::PipelineContext;
pub use runner::PipelineRunner;
pub use step::{ErrorCategory, ErrorInfo, Step, StepOptions, StepResult};

//! State module for tracking listing and pipeline progress
//!
//! # Components
//!
//! - `ProcessingStatus`: lifecycle of a single listing (pending, enriched, duplicate, failed)
//! - `StepStatus`: outcome of a pipeline step or a whole execution run

mod processing_status;
mod step_status;

// Re-export main types
pub use processing_status::ProcessingStatus;
pub use step_status::StepStatus;

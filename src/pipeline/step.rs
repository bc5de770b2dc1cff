//! Step contract and result types

use crate::pipeline::PipelineContext;
use crate::state::StepStatus;
use crate::{CrawlError, Result};
use async_trait::async_trait;
use std::fmt;

/// Fault taxonomy recorded in step results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Network,
    Timeout,
    Selector,
    Parse,
    Database,
    Api,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Selector => "selector",
            Self::Parse => "parse",
            Self::Database => "database",
            Self::Api => "api",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A categorized error reported by a step
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorInfo {
    pub category: ErrorCategory,
    pub message: String,
    pub detail: Option<String>,
}

impl ErrorInfo {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl From<&CrawlError> for ErrorInfo {
    fn from(error: &CrawlError) -> Self {
        let info = Self::new(error.category(), error.to_string());
        match std::error::Error::source(error) {
            Some(source) => info.with_detail(source.to_string()),
            None => info,
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.category, self.message)
    }
}

/// Outcome of one step execution
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub status: StepStatus,
    pub items_processed: u64,
    pub items_created: u64,
    pub items_failed: u64,
    pub errors: Vec<ErrorInfo>,
}

impl StepResult {
    /// A completed step with its audit counters
    ///
    /// # Arguments
    ///
    /// * `items_processed` - Items the step examined
    /// * `items_created` - Items the step created or completed
    /// * `items_failed` - Items that failed without failing the step
    pub fn succeeded(items_processed: u64, items_created: u64, items_failed: u64) -> Self {
        Self {
            status: StepStatus::Succeeded,
            items_processed,
            items_created,
            items_failed,
            errors: Vec::new(),
        }
    }

    /// A step that could not do its work; counters are zero
    pub fn failed(error: ErrorInfo) -> Self {
        Self {
            status: StepStatus::Failed,
            items_processed: 0,
            items_created: 0,
            items_failed: 0,
            errors: vec![error],
        }
    }

    /// A step that had nothing to do
    pub fn skipped() -> Self {
        Self {
            status: StepStatus::Skipped,
            items_processed: 0,
            items_created: 0,
            items_failed: 0,
            errors: Vec::new(),
        }
    }

    /// Any error entry fails the step regardless of `status`
    pub fn is_failure(&self) -> bool {
        !self.errors.is_empty() || self.status == StepStatus::Failed
    }

    /// Status to record once the step has returned
    pub fn final_status(&self) -> StepStatus {
        if self.is_failure() {
            StepStatus::Failed
        } else if self.status == StepStatus::Skipped {
            StepStatus::Skipped
        } else {
            StepStatus::Succeeded
        }
    }

    /// All recorded errors joined with `; `, or `None` when there are none
    pub fn error_message(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        Some(
            self.errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Per-step execution policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOptions {
    /// Keep running later steps when this one fails; the run still ends FAILED
    pub continue_on_error: bool,
}

/// A named unit of pipeline work
#[async_trait]
pub trait Step: Send + Sync {
    /// Stable name, used as the key in the context's result map
    fn name(&self) -> &str;

    fn options(&self) -> StepOptions {
        StepOptions::default()
    }

    /// Performs the step's work against the shared context
    ///
    /// # Arguments
    ///
    /// * `ctx` - Store, criteria and results of earlier steps
    ///
    /// # Returns
    ///
    /// * `Ok(StepResult)` - The step's outcome, including reported failures
    /// * `Err(CrawlError)` - An unexpected fault; the runner records it as a failure
    async fn execute(&self, ctx: &mut PipelineContext) -> Result<StepResult>;
}

//! Sequential step execution with run and step auditing

use crate::pipeline::{ErrorInfo, PipelineContext, Step, StepResult};
use crate::state::StepStatus;
use crate::storage::ExecutionRun;
use crate::Result;
use tracing::{error, info, warn};

/// Executes steps in order against one shared context
pub struct PipelineRunner {
    mode: String,
    steps: Vec<Box<dyn Step>>,
}

impl PipelineRunner {
    /// `mode` labels the execution run record
    pub fn new(mode: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            steps: Vec::new(),
        }
    }

    /// Appends a step; steps run in the order they were added
    pub fn with_step(mut self, step: Box<dyn Step>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Runs every step and returns the finished run record
    ///
    /// The run is finalized and persisted whether or not a step failed. Only
    /// store faults while creating or finalizing records surface as `Err`.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Context shared by all steps; its store receives the audit records
    ///
    /// # Returns
    ///
    /// * `Ok(ExecutionRun)` - The finalized run, `Succeeded` or `Failed`
    /// * `Err(CrawlError)` - The store rejected a run or step record
    pub async fn run(&self, ctx: &mut PipelineContext) -> Result<ExecutionRun> {
        let mut run = ctx.storage.create_run(&self.mode)?;
        info!("Run {} started (mode: {})", run.id, self.mode);

        let outcome = self.run_steps(ctx, &mut run).await;

        match &outcome {
            Ok(None) => run.finish(StepStatus::Succeeded, None),
            Ok(Some(message)) => run.finish(StepStatus::Failed, Some(message.clone())),
            Err(e) => run.finish(StepStatus::Failed, Some(e.to_string())),
        }
        let finalized = ctx.storage.update_run(&run);

        outcome?;
        finalized?;

        match run.status {
            StepStatus::Failed => error!(
                "Run {} FAILED: {}",
                run.id,
                run.error_message.as_deref().unwrap_or("unknown error")
            ),
            _ => info!(
                "Run {} succeeded (processed={} created={} failed={})",
                run.id, run.items_processed, run.items_created, run.items_failed
            ),
        }

        Ok(run)
    }

    /// Returns the first failure message, if any step failed
    async fn run_steps(
        &self,
        ctx: &mut PipelineContext,
        run: &mut ExecutionRun,
    ) -> Result<Option<String>> {
        let mut first_failure: Option<String> = None;

        for step in &self.steps {
            let name = step.name().to_string();
            let mut record = ctx.storage.create_step(run.id, &name)?;
            info!("Step '{}' started", name);

            let result = match step.execute(ctx).await {
                Ok(result) => result,
                Err(e) => {
                    error!("Step '{}' raised: {}", name, e);
                    StepResult::failed(ErrorInfo::from(&e))
                }
            };

            let status = result.final_status();
            record.items_processed = result.items_processed;
            record.items_created = result.items_created;
            record.items_failed = result.items_failed;
            record.finish(status, result.error_message());
            ctx.storage.update_step(&record)?;

            run.items_processed += result.items_processed;
            run.items_created += result.items_created;
            run.items_failed += result.items_failed;

            let failure = result
                .error_message()
                .map(|message| format!("step '{}' failed: {}", name, message))
                .or_else(|| {
                    (status == StepStatus::Failed).then(|| format!("step '{}' failed", name))
                });
            ctx.step_results.insert(name.clone(), result);

            let Some(message) = failure else {
                info!("Step '{}' finished: {}", name, status);
                continue;
            };

            error!("{}", message);
            first_failure.get_or_insert(message);
            if step.options().continue_on_error {
                warn!("Step '{}' allows continuing after failure", name);
            } else {
                break;
            }
        }

        Ok(first_failure)
    }
}

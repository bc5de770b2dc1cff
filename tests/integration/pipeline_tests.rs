//! Runner behavior: fail-fast, audit records and per-step options

use crate::common::memory_storage;
use async_trait::async_trait;
use imovel_harvest::listing::SearchCriteria;
use imovel_harvest::pipeline::{
    ErrorCategory, ErrorInfo, PipelineContext, PipelineRunner, Step, StepOptions, StepResult,
};
use imovel_harvest::{CrawlError, Result, StepStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

enum Behavior {
    Succeed(u64),
    Raise,
    ReportError,
}

struct ScriptedStep {
    name: &'static str,
    behavior: Behavior,
    continue_on_error: bool,
    ran: Arc<AtomicBool>,
}

impl ScriptedStep {
    fn new(name: &'static str, behavior: Behavior) -> (Self, Arc<AtomicBool>) {
        let ran = Arc::new(AtomicBool::new(false));
        let step = Self {
            name,
            behavior,
            continue_on_error: false,
            ran: Arc::clone(&ran),
        };
        (step, ran)
    }

    fn continuing(mut self) -> Self {
        self.continue_on_error = true;
        self
    }
}

#[async_trait]
impl Step for ScriptedStep {
    fn name(&self) -> &str {
        self.name
    }

    fn options(&self) -> StepOptions {
        StepOptions {
            continue_on_error: self.continue_on_error,
        }
    }

    async fn execute(&self, _ctx: &mut PipelineContext) -> Result<StepResult> {
        self.ran.store(true, Ordering::SeqCst);
        match self.behavior {
            Behavior::Succeed(items) => Ok(StepResult::succeeded(items, items, 0)),
            Behavior::Raise => Err(CrawlError::Parse(format!("{} exploded", self.name))),
            Behavior::ReportError => {
                let mut result = StepResult::succeeded(1, 0, 1);
                result.errors.push(ErrorInfo::new(
                    ErrorCategory::Selector,
                    "listing grid not found",
                ));
                Ok(result)
            }
        }
    }
}

fn context() -> PipelineContext {
    PipelineContext::new(Box::new(memory_storage()), SearchCriteria::default())
}

#[tokio::test]
async fn test_raising_step_halts_pipeline_and_fails_run() {
    let (a, _) = ScriptedStep::new("a", Behavior::Succeed(2));
    let (b, _) = ScriptedStep::new("b", Behavior::Raise);
    let (c, c_ran) = ScriptedStep::new("c", Behavior::Succeed(5));
    let runner = PipelineRunner::new("test")
        .with_step(Box::new(a))
        .with_step(Box::new(b))
        .with_step(Box::new(c));

    let mut ctx = context();
    let run = runner.run(&mut ctx).await.unwrap();

    assert_eq!(run.status, StepStatus::Failed);
    assert!(run.finished_at.is_some());
    assert!(run
        .error_message
        .as_deref()
        .is_some_and(|m| m.contains("step 'b' failed") && m.contains("b exploded")));

    assert!(ctx.result("a").is_some());
    assert!(ctx.result("b").is_some_and(StepResult::is_failure));
    assert!(ctx.result("c").is_none());
    assert!(!c_ran.load(Ordering::SeqCst));

    let persisted = ctx.storage.get_run(run.id).unwrap();
    assert_eq!(persisted.status, StepStatus::Failed);
    assert!(persisted.finished_at.is_some());
    assert_eq!(persisted.items_processed, 2);

    let steps = ctx.storage.get_steps_for_run(run.id).unwrap();
    let names: Vec<&str> = steps.iter().map(|s| s.step_name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(steps[0].status, StepStatus::Succeeded);
    assert_eq!(steps[1].status, StepStatus::Failed);
    assert!(steps[1].finished_at.is_some());
    assert!(steps[1]
        .error_message
        .as_deref()
        .is_some_and(|m| m.contains("b exploded")));
}

#[tokio::test]
async fn test_reported_errors_fail_the_step() {
    let (a, _) = ScriptedStep::new("a", Behavior::ReportError);
    let (b, b_ran) = ScriptedStep::new("b", Behavior::Succeed(1));
    let runner = PipelineRunner::new("test")
        .with_step(Box::new(a))
        .with_step(Box::new(b));

    let mut ctx = context();
    let run = runner.run(&mut ctx).await.unwrap();

    assert_eq!(run.status, StepStatus::Failed);
    assert!(!b_ran.load(Ordering::SeqCst));
    let steps = ctx.storage.get_steps_for_run(run.id).unwrap();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].status, StepStatus::Failed);
    assert_eq!(steps[0].items_failed, 1);
    assert_eq!(
        steps[0].error_message.as_deref(),
        Some("listing grid not found")
    );
}

#[tokio::test]
async fn test_continue_on_error_runs_later_steps_but_run_fails() {
    let (a, _) = ScriptedStep::new("a", Behavior::Raise);
    let (b, b_ran) = ScriptedStep::new("b", Behavior::Succeed(3));
    let runner = PipelineRunner::new("test")
        .with_step(Box::new(a.continuing()))
        .with_step(Box::new(b));

    let mut ctx = context();
    let run = runner.run(&mut ctx).await.unwrap();

    assert!(b_ran.load(Ordering::SeqCst));
    assert!(ctx.result("b").is_some());
    assert_eq!(run.status, StepStatus::Failed);
    assert_eq!(run.items_processed, 3);
    assert!(run
        .error_message
        .as_deref()
        .is_some_and(|m| m.contains("step 'a' failed")));
}

#[tokio::test]
async fn test_successful_run_sums_counters() {
    let (a, _) = ScriptedStep::new("a", Behavior::Succeed(2));
    let (b, _) = ScriptedStep::new("b", Behavior::Succeed(3));
    let runner = PipelineRunner::new("full_crawl")
        .with_step(Box::new(a))
        .with_step(Box::new(b));
    assert_eq!(runner.step_names(), vec!["a", "b"]);

    let mut ctx = context();
    let run = runner.run(&mut ctx).await.unwrap();

    assert_eq!(run.status, StepStatus::Succeeded);
    assert_eq!(run.mode, "full_crawl");
    assert_eq!(run.items_processed, 5);
    assert_eq!(run.items_created, 5);
    assert!(run.error_message.is_none());

    let latest = ctx.storage.get_latest_run().unwrap().unwrap();
    assert_eq!(latest.id, run.id);
    assert_eq!(latest.status, StepStatus::Succeeded);
}

#[tokio::test]
async fn test_each_invocation_creates_a_new_run() {
    let runner = PipelineRunner::new("resume");
    let mut ctx = context();

    let first = runner.run(&mut ctx).await.unwrap();
    let second = runner.run(&mut ctx).await.unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(second.status, StepStatus::Succeeded);
}

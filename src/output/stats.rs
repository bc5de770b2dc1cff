//! Listing and run statistics read back from the record store

use crate::state::ProcessingStatus;
use crate::storage::{ExecutionRun, StepRecord, Storage};
use crate::Result;
use std::collections::HashMap;

/// Snapshot of the store used by `--stats`
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    pub total_listings: u64,

    /// Count of listings by processing status
    pub listings_by_status: HashMap<ProcessingStatus, u64>,

    pub latest_run: Option<ExecutionRun>,

    /// Step records of the latest run, in execution order
    pub latest_steps: Vec<StepRecord>,
}

impl CrawlStatistics {
    pub fn count(&self, status: ProcessingStatus) -> u64 {
        self.listings_by_status.get(&status).copied().unwrap_or(0)
    }
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn Storage) -> Result<CrawlStatistics> {
    let total_listings = storage.count_listings()?;
    let listings_by_status = storage.count_by_status()?;
    let latest_run = storage.get_latest_run()?;
    let latest_steps = match &latest_run {
        Some(run) => storage.get_steps_for_run(run.id)?,
        None => Vec::new(),
    };

    Ok(CrawlStatistics {
        total_listings,
        listings_by_status,
        latest_run,
        latest_steps,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Listing Statistics ===\n");

    println!("Listings: {}", stats.total_listings);
    for status in ProcessingStatus::all_statuses() {
        let count = stats.count(status);
        let percentage = if stats.total_listings > 0 {
            (count as f64 / stats.total_listings as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    let Some(run) = &stats.latest_run else {
        println!("No pipeline runs recorded");
        return;
    };

    println!("Latest run #{} ({})", run.id, run.mode);
    println!("  Status: {}", run.status);
    println!("  Started: {}", run.started_at.to_rfc3339());
    match run.finished_at {
        Some(finished) => {
            let seconds = (finished - run.started_at).num_seconds();
            println!("  Finished: {} ({}s)", finished.to_rfc3339(), seconds);
        }
        None => println!("  Finished: -"),
    }
    println!(
        "  Items: processed={} created={} failed={}",
        run.items_processed, run.items_created, run.items_failed
    );
    if let Some(message) = &run.error_message {
        println!("  Error: {}", message);
    }

    if !stats.latest_steps.is_empty() {
        println!();
        println!("Steps:");
        for step in &stats.latest_steps {
            println!(
                "  {:<18} {:<10} processed={} created={} failed={}",
                step.step_name,
                step.status.to_string(),
                step.items_processed,
                step.items_created,
                step.items_failed
            );
            if let Some(message) = &step.error_message {
                println!("      {}", message);
            }
        }
    }
}

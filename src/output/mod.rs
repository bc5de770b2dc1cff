//! Output module for exported listings and crawl statistics
//!
//! This module handles:
//! - Exporting enriched listings as JSON and CSV
//! - Reading listing and run statistics back from the store

pub mod export;
pub mod stats;

pub use export::{export_listings, ExportRecord};
pub use stats::{load_statistics, print_statistics, CrawlStatistics};

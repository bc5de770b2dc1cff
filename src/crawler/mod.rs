//! Crawl modes and the coordinator that assembles their pipelines

mod coordinator;

pub use coordinator::{Coordinator, CrawlMode};

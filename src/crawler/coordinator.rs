//! Crawler coordinator - wires configuration into pipeline runs
//!
//! Each pipeline mode maps to an ordered list of steps:
//! - full crawl: search, extract, export
//! - segmented crawl: segmented search, extract, export
//! - resume: extract, export (only remaining pending work)
//!
//! The two test modes bypass the runner and the store entirely.

use crate::config::Config;
use crate::listing::{ContentHash, Listing, SearchCriteria};
use crate::normalize::parse_detail_payload;
use crate::pipeline::steps::{
    ExportStep, ExtractStep, SearchStep, SegmentedSearchStep, MAX_PAGES_KEY,
};
use crate::pipeline::{PipelineContext, PipelineRunner};
use crate::storage::{open_storage, ExecutionRun, Storage};
use crate::transport::{
    build_http_client, CoordinatesCollector, DetailFetcher, HttpCoordinatesQuery,
    HttpDetailFetcher, HttpSearchClient, SearchTransport,
};
use crate::{CrawlError, Result};
use reqwest::Client;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// What a single invocation does
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CrawlMode {
    /// Paginated search, enrichment and export
    FullCrawl,
    /// Bulk identifier discovery, enrichment and export
    SegmentedCrawl,
    /// Enrichment and export of listings still pending
    Resume,
    /// Fetch one search page and print it
    TestSearch,
    /// Fetch and parse one detail page and print it
    TestListing,
}

impl CrawlMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullCrawl => "full_crawl",
            Self::SegmentedCrawl => "segmented_crawl",
            Self::Resume => "resume",
            Self::TestSearch => "test_search",
            Self::TestListing => "test_listing",
        }
    }

    /// True for modes that run the step pipeline against the store
    pub fn is_pipeline(&self) -> bool {
        matches!(self, Self::FullCrawl | Self::SegmentedCrawl | Self::Resume)
    }
}

impl fmt::Display for CrawlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Builds transports and steps from one configuration
pub struct Coordinator {
    config: Config,
    client: Client,
}

impl Coordinator {
    pub fn new(config: Config) -> Result<Self> {
        let client = build_http_client(&config.api)?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn search_client(&self) -> HttpSearchClient {
        HttpSearchClient::new(self.client.clone(), &self.config.api, &self.config.scraping)
    }

    fn detail_fetcher(&self) -> HttpDetailFetcher {
        HttpDetailFetcher::new(self.client.clone(), &self.config.api, &self.config.scraping)
    }

    fn extract_step(&self) -> ExtractStep {
        ExtractStep::new(
            Box::new(self.detail_fetcher()),
            self.config.scraping.photo_base_url.clone(),
        )
    }

    fn export_step(&self) -> ExportStep {
        ExportStep::new(
            self.config.export.output_dir.clone(),
            self.config.export.formats.clone(),
        )
    }

    /// Builds the step runner for a pipeline mode
    ///
    /// # Arguments
    ///
    /// * `mode` - One of the pipeline modes
    ///
    /// # Returns
    ///
    /// * `Ok(PipelineRunner)` - Runner with the mode's steps in order
    /// * `Err(CrawlError::UnsupportedMode)` - For the two test modes
    pub fn build_runner(&self, mode: CrawlMode) -> Result<PipelineRunner> {
        let runner = PipelineRunner::new(mode.as_str());
        let runner = match mode {
            CrawlMode::FullCrawl => runner.with_step(Box::new(SearchStep::new(
                Box::new(self.search_client()),
                self.config.scraping.max_pages,
            ))),
            CrawlMode::SegmentedCrawl => {
                let query =
                    HttpCoordinatesQuery::new(self.client.clone(), &self.config.coordinates);
                let collector = CoordinatesCollector::new(query, &self.config.coordinates)
                    .with_delay(Duration::from_millis(
                        self.config.api.delay_between_requests_ms,
                    ));
                runner.with_step(Box::new(SegmentedSearchStep::new(
                    Box::new(collector),
                    self.config.scraping.detail_base_url.clone(),
                    self.config.search.target_count,
                    self.config.search.property_type.clone(),
                )))
            }
            CrawlMode::Resume => runner,
            CrawlMode::TestSearch | CrawlMode::TestListing => {
                return Err(CrawlError::UnsupportedMode(mode.to_string()))
            }
        };

        Ok(runner
            .with_step(Box::new(self.extract_step()))
            .with_step(Box::new(self.export_step())))
    }

    /// Runs a pipeline mode against the configured database
    ///
    /// The database's parent directory is created when missing.
    ///
    /// # Arguments
    ///
    /// * `mode` - Pipeline mode to run
    /// * `max_pages` - Overrides the configured search page budget
    ///
    /// # Returns
    ///
    /// * `Ok(ExecutionRun)` - The finalized run; a failed step shows as `Failed` status
    /// * `Err(CrawlError)` - The store could not be opened or written
    pub async fn run(&self, mode: CrawlMode, max_pages: Option<u32>) -> Result<ExecutionRun> {
        let path = Path::new(&self.config.output.database_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let storage = open_storage(path)?;
        self.run_with_storage(mode, Box::new(storage), max_pages).await
    }

    /// Runs a pipeline mode against an already opened store
    pub async fn run_with_storage(
        &self,
        mode: CrawlMode,
        storage: Box<dyn Storage>,
        max_pages: Option<u32>,
    ) -> Result<ExecutionRun> {
        let runner = self.build_runner(mode)?;
        tracing::info!("Pipeline '{}': {}", mode, runner.step_names().join(" -> "));

        let mut ctx = PipelineContext::new(storage, self.config.search.criteria())
            .with_metadata("mode", mode.as_str());
        if let Some(pages) = max_pages {
            ctx = ctx.with_metadata(MAX_PAGES_KEY, pages);
        }

        runner.run(&mut ctx).await
    }

    /// Fetches the first search page without persisting anything
    pub async fn test_search(&self, criteria: &SearchCriteria) -> Result<(Vec<Listing>, u64)> {
        self.search_client().search(criteria, 0).await
    }

    /// Fetches and parses one detail page without persisting anything
    ///
    /// Returns `None` when the detail page could not be fetched.
    pub async fn test_listing(&self, source_id: &str) -> Result<Option<Listing>> {
        let mut listing =
            Listing::from_source_id(source_id, &self.config.scraping.detail_base_url);

        let Some(raw) = self.detail_fetcher().extract_detail(&listing).await else {
            return Ok(None);
        };

        let patch = parse_detail_payload(&raw, &self.config.scraping.photo_base_url)?;
        patch.apply(&mut listing);
        listing.content_hash = Some(ContentHash::from_text(&raw));
        Ok(Some(listing))
    }
}

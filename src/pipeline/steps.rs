//! Pipeline steps wrapping the discovery, enrichment and export use cases

use crate::output::export_listings;
use crate::pipeline::{ErrorInfo, PipelineContext, Step, StepResult};
use crate::transport::{BulkIdTransport, DetailFetcher, SearchTransport};
use crate::usecase::{EnrichListings, SearchListings, SegmentedSearch};
use crate::Result;
use async_trait::async_trait;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

pub const SEARCH_STEP: &str = "search";
pub const SEGMENTED_SEARCH_STEP: &str = "segmented_search";
pub const EXTRACT_STEP: &str = "extract";
pub const EXPORT_STEP: &str = "export";

/// Metadata key that overrides the configured page budget
pub const MAX_PAGES_KEY: &str = "max_pages";

/// Paginated search discovery
pub struct SearchStep {
    transport: Box<dyn SearchTransport>,
    max_pages: u32,
}

impl SearchStep {
    pub fn new(transport: Box<dyn SearchTransport>, max_pages: u32) -> Self {
        Self {
            transport,
            max_pages,
        }
    }
}

#[async_trait]
impl Step for SearchStep {
    fn name(&self) -> &str {
        SEARCH_STEP
    }

    async fn execute(&self, ctx: &mut PipelineContext) -> Result<StepResult> {
        let max_pages = ctx
            .metadata_u64(MAX_PAGES_KEY)
            .map(|pages| u32::try_from(pages).unwrap_or(u32::MAX))
            .unwrap_or(self.max_pages);

        let criteria = ctx.criteria.clone();
        let search = SearchListings::new(self.transport.as_ref(), max_pages);
        let summary = match search.execute(ctx.storage.as_mut(), &criteria).await {
            Ok(summary) => summary,
            Err(e) => return Ok(StepResult::failed(ErrorInfo::from(&e))),
        };

        ctx.metadata
            .insert("search_total_found".to_string(), json!(summary.total_found));
        Ok(StepResult::succeeded(
            summary.total_found,
            summary.new_listings,
            0,
        ))
    }
}

/// Bulk identifier discovery across shifted viewports
pub struct SegmentedSearchStep {
    transport: Box<dyn BulkIdTransport>,
    detail_base_url: String,
    target_count: usize,
    property_type: String,
}

impl SegmentedSearchStep {
    pub fn new(
        transport: Box<dyn BulkIdTransport>,
        detail_base_url: impl Into<String>,
        target_count: usize,
        property_type: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            detail_base_url: detail_base_url.into(),
            target_count,
            property_type: property_type.into(),
        }
    }
}

#[async_trait]
impl Step for SegmentedSearchStep {
    fn name(&self) -> &str {
        SEGMENTED_SEARCH_STEP
    }

    async fn execute(&self, ctx: &mut PipelineContext) -> Result<StepResult> {
        let criteria = ctx.criteria.clone();
        let search = SegmentedSearch::new(self.transport.as_ref(), &self.detail_base_url);
        let result = search
            .execute(
                ctx.storage.as_mut(),
                &criteria,
                self.target_count,
                &self.property_type,
            )
            .await;

        match result {
            Ok(summary) => Ok(StepResult::succeeded(
                summary.total_found,
                summary.new_listings,
                0,
            )),
            Err(e) => Ok(StepResult::failed(ErrorInfo::from(&e))),
        }
    }
}

/// Detail enrichment of every pending listing
pub struct ExtractStep {
    fetcher: Box<dyn DetailFetcher>,
    photo_base_url: String,
}

impl ExtractStep {
    pub fn new(fetcher: Box<dyn DetailFetcher>, photo_base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            photo_base_url: photo_base_url.into(),
        }
    }
}

#[async_trait]
impl Step for ExtractStep {
    fn name(&self) -> &str {
        EXTRACT_STEP
    }

    async fn execute(&self, ctx: &mut PipelineContext) -> Result<StepResult> {
        let enrich = EnrichListings::new(self.fetcher.as_ref(), &self.photo_base_url);
        let summary = match enrich.execute(ctx.storage.as_mut()).await {
            Ok(summary) => summary,
            Err(e) => return Ok(StepResult::failed(ErrorInfo::from(&e))),
        };

        ctx.metadata
            .insert("duplicates".to_string(), json!(summary.duplicates));
        Ok(StepResult::succeeded(
            summary.processed,
            summary.enriched,
            summary.failed,
        ))
    }
}

/// Writes every enriched listing to the configured export formats
///
/// With no formats configured the step is recorded as skipped.
pub struct ExportStep {
    output_dir: PathBuf,
    formats: Vec<String>,
}

impl ExportStep {
    pub fn new(output_dir: impl Into<PathBuf>, formats: Vec<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            formats,
        }
    }
}

#[async_trait]
impl Step for ExportStep {
    fn name(&self) -> &str {
        EXPORT_STEP
    }

    async fn execute(&self, ctx: &mut PipelineContext) -> Result<StepResult> {
        if self.formats.is_empty() {
            info!("No export formats configured, skipping export");
            return Ok(StepResult::skipped());
        }

        ctx.listings = ctx.storage.get_enriched()?;
        let count = ctx.listings.len() as u64;

        match export_listings(&ctx.listings, &self.output_dir, &self.formats) {
            Ok(paths) => {
                info!("Export wrote {} record(s) to {} file(s)", count, paths.len());
                Ok(StepResult::succeeded(count, count, 0))
            }
            Err(e) => Ok(StepResult::failed(ErrorInfo::from(&e))),
        }
    }
}

//! Collaborators that talk to the source site
//!
//! The use cases only see the traits declared here; the HTTP implementations
//! live in the submodules and can be swapped for fakes in tests.

mod client;
mod coordinates;
mod detail;
mod search;

pub use client::build_http_client;
pub use coordinates::{
    shifted_viewports, CapturedRequest, CoordinatesCollector, CoordinatesQuery,
    HttpCoordinatesQuery, Viewport,
};
pub use detail::HttpDetailFetcher;
pub use search::HttpSearchClient;

use crate::listing::{Listing, SearchCriteria};
use crate::Result;
use async_trait::async_trait;

/// Listings per server-rendered search page
pub const PAGE_SIZE: u32 = 12;

/// One identifier harvested from the bulk coordinate index
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedId {
    pub source_id: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl CollectedId {
    pub fn new(source_id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            source_id: source_id.into(),
            latitude,
            longitude,
        }
    }
}

/// Paginated search over the source site
#[async_trait]
pub trait SearchTransport: Send + Sync {
    /// Fetches the page starting at `offset`; returns its listings and the
    /// total the source reports as available
    async fn search(&self, criteria: &SearchCriteria, offset: u32) -> Result<(Vec<Listing>, u64)>;

    fn page_size(&self) -> u32 {
        PAGE_SIZE
    }
}

/// Bulk identifier harvesting over a spatial index
#[async_trait]
pub trait BulkIdTransport: Send + Sync {
    /// Collects up to `target_count` distinct identifiers
    async fn collect_ids(
        &self,
        location_slug: &str,
        property_type: &str,
        target_count: usize,
    ) -> Result<Vec<CollectedId>>;
}

/// Per-listing detail payload retrieval
#[async_trait]
pub trait DetailFetcher: Send + Sync {
    /// Raw detail payload, or `None` once every attempt has failed
    async fn extract_detail(&self, listing: &Listing) -> Option<String>;
}

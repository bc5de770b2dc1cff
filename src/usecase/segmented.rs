//! Segmented discovery: bulk identifier collection, lazy enrichment
//!
//! Identifiers harvested from the coordinate index become minimal pending
//! listings (id, detail URL, coordinates). The extract step fills in the rest.

use crate::listing::{Coordinates, Listing, SearchCriteria};
use crate::storage::Storage;
use crate::transport::BulkIdTransport;
use crate::usecase::SearchSummary;
use crate::Result;
use tracing::{info, warn};

/// Stores bulk-collected identifiers as minimal pending listings
pub struct SegmentedSearch<'a> {
    transport: &'a dyn BulkIdTransport,
    detail_base_url: &'a str,
}

impl<'a> SegmentedSearch<'a> {
    pub fn new(transport: &'a dyn BulkIdTransport, detail_base_url: &'a str) -> Self {
        Self {
            transport,
            detail_base_url,
        }
    }

    /// Collects identifiers and inserts the unknown ones as pending
    ///
    /// # Arguments
    ///
    /// * `storage` - Listing store; known listings are left untouched
    /// * `criteria` - Supplies the location slug for the coordinate query
    /// * `target_count` - Upper bound on identifiers to collect
    /// * `property_type` - Property type label sent with the query
    ///
    /// # Returns
    ///
    /// * `Ok(SearchSummary)` - `total_found` is the number of ids collected
    /// * `Err(CrawlError)` - The collector or the store failed
    pub async fn execute(
        &self,
        storage: &mut dyn Storage,
        criteria: &SearchCriteria,
        target_count: usize,
        property_type: &str,
    ) -> Result<SearchSummary> {
        let slug = criteria.location_slug();
        info!(
            "Segmented search: collecting ids (target={}, slug={}, type={})",
            target_count, slug, property_type
        );

        let collected = self
            .transport
            .collect_ids(&slug, property_type, target_count)
            .await?;

        if collected.is_empty() {
            warn!("No listing ids collected from the coordinate index");
            return Ok(SearchSummary {
                total_found: 0,
                new_listings: 0,
                pages_searched: 0,
                stop_reason: None,
            });
        }

        let listings: Vec<Listing> = collected
            .iter()
            .map(|item| {
                let mut listing = Listing::from_source_id(&item.source_id, self.detail_base_url);
                listing.coordinates = Coordinates::checked(item.latitude, item.longitude);
                listing
            })
            .collect();

        let created = storage.upsert_many(&listings)? as u64;
        info!(
            "Segmented search completed: {} ids collected, {} new listings",
            collected.len(),
            created
        );

        Ok(SearchSummary {
            total_found: collected.len() as u64,
            new_listings: created,
            pages_searched: 0,
            stop_reason: None,
        })
    }
}

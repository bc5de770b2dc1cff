//! Detail enrichment with content-hash deduplication

use crate::listing::{ContentHash, Listing};
use crate::normalize::parse_detail_payload;
use crate::state::ProcessingStatus;
use crate::storage::Storage;
use crate::transport::DetailFetcher;
use crate::Result;
use tracing::{debug, info, warn};

/// Aggregate counts of one enrichment pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichSummary {
    pub processed: u64,
    pub enriched: u64,
    pub duplicates: u64,
    pub failed: u64,
}

/// Enriches every pending listing from its detail payload
pub struct EnrichListings<'a> {
    fetcher: &'a dyn DetailFetcher,
    photo_base_url: &'a str,
}

impl<'a> EnrichListings<'a> {
    pub fn new(fetcher: &'a dyn DetailFetcher, photo_base_url: &'a str) -> Self {
        Self {
            fetcher,
            photo_base_url,
        }
    }

    /// Processes the pending listings one at a time
    ///
    /// A fault while handling one listing marks it FAILED and the pass moves
    /// on. Only a store fault while recording that failure aborts the pass.
    ///
    /// # Arguments
    ///
    /// * `storage` - Listing store holding the pending listings
    ///
    /// # Returns
    ///
    /// * `Ok(EnrichSummary)` - Per-outcome counts of the pass
    /// * `Err(CrawlError)` - The store could not list or record listings
    pub async fn execute(&self, storage: &mut dyn Storage) -> Result<EnrichSummary> {
        let pending = storage.get_by_status(ProcessingStatus::Pending)?;
        info!("Found {} pending listings to enrich", pending.len());

        let mut summary = EnrichSummary {
            processed: pending.len() as u64,
            ..EnrichSummary::default()
        };

        for mut listing in pending {
            let payload = match self.fetcher.extract_detail(&listing).await {
                Some(payload) if !payload.trim().is_empty() => payload,
                _ => {
                    warn!("No detail payload for {}", listing.source_id);
                    listing.mark_failed()?;
                    storage.upsert_listing(&listing)?;
                    summary.failed += 1;
                    continue;
                }
            };

            match self.enrich_one(storage, &listing, &payload) {
                Ok(ProcessingStatus::Duplicate) => {
                    debug!("Duplicate: {}", listing.source_id);
                    summary.duplicates += 1;
                }
                Ok(_) => {
                    debug!("Enriched: {}", listing.source_id);
                    summary.enriched += 1;
                }
                Err(e) => {
                    warn!("Failed to enrich {}: {}", listing.source_id, e);
                    listing.mark_failed()?;
                    storage.upsert_listing(&listing)?;
                    summary.failed += 1;
                }
            }
        }

        info!(
            "Enrichment completed: processed={} enriched={} duplicates={} failed={}",
            summary.processed, summary.enriched, summary.duplicates, summary.failed
        );
        Ok(summary)
    }

    /// Merges, fingerprints and persists one listing; returns its new status
    fn enrich_one(
        &self,
        storage: &mut dyn Storage,
        listing: &Listing,
        payload: &str,
    ) -> Result<ProcessingStatus> {
        let patch = parse_detail_payload(payload, self.photo_base_url)?;
        let mut working = listing.clone();
        patch.apply(&mut working);

        let hash = ContentHash::from_text(payload);
        if storage.exists_by_hash(&hash)? {
            working.mark_duplicate()?;
        } else {
            working.mark_enriched(hash)?;
        }

        storage.upsert_listing(&working)?;
        Ok(working.status)
    }
}

//! Paginated search with stopping heuristics

use crate::listing::SearchCriteria;
use crate::storage::Storage;
use crate::transport::SearchTransport;
use crate::Result;
use tracing::info;

/// Consecutive pages without new listings tolerated before giving up
pub const MAX_STALE_PAGES: u32 = 3;

/// Why a search stopped paginating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    PageBudget,
    EmptyPage,
    StaleResults,
    ReachedTotal,
    ShortPage,
}

/// Outcome of one discovery pass
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSummary {
    /// Last total reported by the source (or identifiers collected)
    pub total_found: u64,
    /// Listings created by this search
    pub new_listings: u64,
    pub pages_searched: u32,
    pub stop_reason: Option<StopReason>,
}

impl SearchSummary {
    fn empty() -> Self {
        Self {
            total_found: 0,
            new_listings: 0,
            pages_searched: 0,
            stop_reason: None,
        }
    }
}

/// Walks the search pages and stores every listing found as pending
pub struct SearchListings<'a> {
    transport: &'a dyn SearchTransport,
    max_pages: u32,
}

impl<'a> SearchListings<'a> {
    pub fn new(transport: &'a dyn SearchTransport, max_pages: u32) -> Self {
        Self {
            transport,
            max_pages,
        }
    }

    /// Paginates until a stop condition holds and stores new listings
    ///
    /// Pagination stops on an empty page, a short page, the reported total,
    /// `MAX_STALE_PAGES` pages in a row without new listings, or the page budget.
    ///
    /// # Arguments
    ///
    /// * `storage` - Listing store; new listings are inserted as pending
    /// * `criteria` - Location and filters sent with every page request
    ///
    /// # Returns
    ///
    /// * `Ok(SearchSummary)` - Counters and the reason pagination stopped
    /// * `Err(CrawlError)` - A page request or the store failed
    pub async fn execute(
        &self,
        storage: &mut dyn Storage,
        criteria: &SearchCriteria,
    ) -> Result<SearchSummary> {
        info!("Searching listings: city={}", criteria.city);
        let page_size = self.transport.page_size();
        let mut summary = SearchSummary::empty();
        let mut offset: u32 = 0;
        let mut stale_pages = 0;

        for page in 1..=self.max_pages {
            let (listings, total) = self.transport.search(criteria, offset).await?;
            summary.total_found = total;
            summary.pages_searched = page;

            if listings.is_empty() {
                info!("No listings at offset {}, stopping", offset);
                summary.stop_reason = Some(StopReason::EmptyPage);
                break;
            }

            let created = storage.upsert_many(&listings)? as u64;
            summary.new_listings += created;
            info!(
                "Page {}: found={} new={} (total available={})",
                page,
                listings.len(),
                created,
                total
            );

            if created == 0 {
                stale_pages += 1;
                if stale_pages >= MAX_STALE_PAGES {
                    info!("{} consecutive pages without new listings, stopping", stale_pages);
                    summary.stop_reason = Some(StopReason::StaleResults);
                    break;
                }
            } else {
                stale_pages = 0;
            }

            offset += page_size;
            if total > 0 && u64::from(offset) >= total {
                info!("Reached end of results (offset={} total={})", offset, total);
                summary.stop_reason = Some(StopReason::ReachedTotal);
                break;
            }
            if (listings.len() as u64) < u64::from(page_size) {
                info!("Short page ({} < {}), stopping", listings.len(), page_size);
                summary.stop_reason = Some(StopReason::ShortPage);
                break;
            }
        }

        if summary.stop_reason.is_none() && summary.pages_searched > 0 {
            summary.stop_reason = Some(StopReason::PageBudget);
        }

        info!(
            "Search completed: pages={} total_found={} new={}",
            summary.pages_searched, summary.total_found, summary.new_listings
        );
        Ok(summary)
    }
}

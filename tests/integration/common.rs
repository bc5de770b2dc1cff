//! Shared fakes and fixtures

use async_trait::async_trait;
use imovel_harvest::listing::{Listing, SearchCriteria};
use imovel_harvest::storage::SqliteStorage;
use imovel_harvest::transport::{
    CapturedRequest, CollectedId, CoordinatesQuery, DetailFetcher, SearchTransport, Viewport,
};
use imovel_harvest::Result;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const DETAIL_BASE: &str = "https://www.example.com/imovel";
pub const PHOTO_BASE: &str = "https://img.example.com/med/";

pub fn memory_storage() -> SqliteStorage {
    SqliteStorage::open_in_memory().unwrap()
}

pub fn pending(source_id: &str) -> Listing {
    Listing::from_source_id(source_id, DETAIL_BASE)
}

pub fn listings(ids: impl IntoIterator<Item = usize>) -> Vec<Listing> {
    ids.into_iter().map(|i| pending(&i.to_string())).collect()
}

/// A detail document in the shape of the rendered page's embedded data
pub fn detail_payload(house: serde_json::Value) -> String {
    serde_json::json!({"props": {"pageProps": {"house": house}}}).to_string()
}

/// Serves scripted pages by offset and records every offset asked for
pub struct PagedSearch {
    pages: Vec<Vec<Listing>>,
    total: u64,
    pub offsets: Mutex<Vec<u32>>,
}

impl PagedSearch {
    pub fn new(pages: Vec<Vec<Listing>>, total: u64) -> Self {
        Self {
            pages,
            total,
            offsets: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.offsets.lock().unwrap().len()
    }
}

#[async_trait]
impl SearchTransport for PagedSearch {
    async fn search(&self, _criteria: &SearchCriteria, offset: u32) -> Result<(Vec<Listing>, u64)> {
        self.offsets.lock().unwrap().push(offset);
        let index = (offset / self.page_size()) as usize;
        let page = self.pages.get(index).cloned().unwrap_or_default();
        Ok((page, self.total))
    }
}

/// Returns the same page for every offset
pub struct RepeatingSearch {
    page: Vec<Listing>,
    total: u64,
    pub calls: AtomicUsize,
}

impl RepeatingSearch {
    pub fn new(page: Vec<Listing>, total: u64) -> Self {
        Self {
            page,
            total,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SearchTransport for RepeatingSearch {
    async fn search(&self, _criteria: &SearchCriteria, _offset: u32) -> Result<(Vec<Listing>, u64)> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((self.page.clone(), self.total))
    }
}

/// Detail payloads keyed by source id; unknown ids fail
pub struct StaticDetails {
    payloads: HashMap<String, String>,
}

impl StaticDetails {
    pub fn new(payloads: impl IntoIterator<Item = (&'static str, String)>) -> Self {
        Self {
            payloads: payloads
                .into_iter()
                .map(|(id, payload)| (id.to_string(), payload))
                .collect(),
        }
    }
}

#[async_trait]
impl DetailFetcher for StaticDetails {
    async fn extract_detail(&self, listing: &Listing) -> Option<String> {
        self.payloads.get(&listing.source_id).cloned()
    }
}

/// Bulk query returning `per_viewport` fresh ids for every fetch
pub struct GridQuery {
    per_viewport: usize,
    fetches: Arc<AtomicUsize>,
}

impl GridQuery {
    /// The query and a handle on its fetch counter
    pub fn new(per_viewport: usize) -> (Self, Arc<AtomicUsize>) {
        let fetches = Arc::new(AtomicUsize::new(0));
        let query = Self {
            per_viewport,
            fetches: Arc::clone(&fetches),
        };
        (query, fetches)
    }
}

#[async_trait]
impl CoordinatesQuery for GridQuery {
    async fn capture(
        &self,
        _location_slug: &str,
        _property_type: &str,
    ) -> Result<Option<CapturedRequest>> {
        Ok(Some(CapturedRequest {
            url: url::Url::parse("https://api.example.com/coordinates")?,
            headers: Default::default(),
        }))
    }

    async fn fetch(
        &self,
        _request: &CapturedRequest,
        viewport: Option<&Viewport>,
    ) -> Vec<CollectedId> {
        let round = self.fetches.fetch_add(1, Ordering::SeqCst);
        let (lat, lng) = viewport.map(Viewport::center).unwrap_or((-23.55, -46.63));
        (0..self.per_viewport)
            .map(|i| CollectedId::new(format!("{}-{}", round, i), lat, lng))
            .collect()
    }
}

//! Search, segmented discovery and enrichment against in-memory stores

use crate::common::{
    detail_payload, listings, memory_storage, pending, GridQuery, PagedSearch, RepeatingSearch,
    StaticDetails, DETAIL_BASE, PHOTO_BASE,
};
use imovel_harvest::config::CoordinatesConfig;
use imovel_harvest::listing::{ContentHash, FurnishedStatus, SearchCriteria};
use imovel_harvest::storage::Storage;
use imovel_harvest::transport::{BulkIdTransport, CoordinatesCollector};
use imovel_harvest::usecase::{EnrichListings, SearchListings, SegmentedSearch, StopReason};
use imovel_harvest::ProcessingStatus;
use serde_json::json;
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_search_twice_creates_nothing_the_second_time() {
    let mut storage = memory_storage();
    let transport = PagedSearch::new(vec![listings(0..12), listings(12..17)], 17);
    let criteria = SearchCriteria::default();
    let search = SearchListings::new(&transport, 50);

    let first = search.execute(&mut storage, &criteria).await.unwrap();
    assert_eq!(first.new_listings, 17);
    assert_eq!(first.total_found, 17);
    assert_eq!(first.pages_searched, 2);

    let second = search.execute(&mut storage, &criteria).await.unwrap();
    assert_eq!(second.new_listings, 0);
    assert_eq!(second.pages_searched, 2);
    assert_eq!(storage.count_listings().unwrap(), 17);
}

#[tokio::test]
async fn test_three_stale_pages_stop_the_search() {
    let mut storage = memory_storage();
    let known = listings(0..12);
    storage.upsert_many(&known).unwrap();

    let transport = RepeatingSearch::new(known, 5_000);
    let search = SearchListings::new(&transport, 50);
    let summary = search
        .execute(&mut storage, &SearchCriteria::default())
        .await
        .unwrap();

    assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
    assert_eq!(summary.pages_searched, 3);
    assert_eq!(summary.new_listings, 0);
    assert_eq!(summary.stop_reason, Some(StopReason::StaleResults));
}

#[tokio::test]
async fn test_short_and_empty_pages_stop_the_search() {
    let mut storage = memory_storage();
    let transport = PagedSearch::new(vec![listings(0..12), listings(12..15)], 0);
    let summary = SearchListings::new(&transport, 50)
        .execute(&mut storage, &SearchCriteria::default())
        .await
        .unwrap();
    assert_eq!(summary.stop_reason, Some(StopReason::ShortPage));
    assert_eq!(*transport.offsets.lock().unwrap(), vec![0, 12]);

    let transport = PagedSearch::new(vec![], 0);
    let summary = SearchListings::new(&transport, 50)
        .execute(&mut storage, &SearchCriteria::default())
        .await
        .unwrap();
    assert_eq!(summary.stop_reason, Some(StopReason::EmptyPage));
    assert_eq!(summary.pages_searched, 1);
    assert_eq!(transport.calls(), 1);
}

fn coordinates_config() -> CoordinatesConfig {
    CoordinatesConfig::default()
}

#[tokio::test]
async fn test_bulk_collection_stops_at_target() {
    let (query, fetches) = GridQuery::new(4);
    let collector = CoordinatesCollector::new(query, &coordinates_config());

    let ids = collector
        .collect_ids("sao-paulo-sp-brasil", "apartamento", 30)
        .await
        .unwrap();

    assert_eq!(ids.len(), 30);
    assert_eq!(fetches.load(Ordering::SeqCst), 8);
    let distinct: HashSet<&str> = ids.iter().map(|id| id.source_id.as_str()).collect();
    assert_eq!(distinct.len(), 30);
}

#[tokio::test]
async fn test_bulk_collection_exhausts_all_shifts() {
    let (query, fetches) = GridQuery::new(4);
    let collector = CoordinatesCollector::new(query, &coordinates_config());

    let ids = collector
        .collect_ids("sao-paulo-sp-brasil", "apartamento", 100)
        .await
        .unwrap();

    assert_eq!(fetches.load(Ordering::SeqCst), 9);
    assert_eq!(ids.len(), 36);
}

#[tokio::test]
async fn test_bulk_collection_waits_after_each_query() {
    let (query, fetches) = GridQuery::new(4);
    let collector = CoordinatesCollector::new(query, &coordinates_config())
        .with_delay(Duration::from_millis(40));

    let started = Instant::now();
    let ids = collector
        .collect_ids("sao-paulo-sp-brasil", "apartamento", 12)
        .await
        .unwrap();

    assert_eq!(ids.len(), 12);
    assert_eq!(fetches.load(Ordering::SeqCst), 3);
    assert!(started.elapsed() >= Duration::from_millis(120));
}

#[tokio::test]
async fn test_segmented_search_stores_collected_ids_as_pending() {
    let (query, _) = GridQuery::new(4);
    let collector = CoordinatesCollector::new(query, &coordinates_config());
    let mut storage = memory_storage();

    let summary = SegmentedSearch::new(&collector, DETAIL_BASE)
        .execute(&mut storage, &SearchCriteria::default(), 10, "apartamento")
        .await
        .unwrap();

    assert_eq!(summary.new_listings, 10);
    let stored = storage.get_by_status(ProcessingStatus::Pending).unwrap();
    assert_eq!(stored.len(), 10);
    let first = &stored[0];
    assert_eq!(
        first.source_url,
        format!("{}/{}", DETAIL_BASE, first.source_id)
    );
    assert!(first.coordinates.is_some());
    assert!(first.description.is_empty());
}

#[tokio::test]
async fn test_identical_payloads_become_duplicates() {
    let mut storage = memory_storage();
    storage
        .upsert_many(&[pending("1"), pending("2"), pending("3")])
        .unwrap();

    let shared = detail_payload(json!({"id": 1, "remarks": "Same page"}));
    let fetcher = StaticDetails::new([("1", shared.clone()), ("2", shared.clone())]);
    let summary = EnrichListings::new(&fetcher, PHOTO_BASE)
        .execute(&mut storage)
        .await
        .unwrap();

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.enriched, 1);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.failed, 1);

    let status = |id: &str| storage.get_by_source_id(id).unwrap().unwrap().status;
    assert_eq!(status("1"), ProcessingStatus::Enriched);
    assert_eq!(status("2"), ProcessingStatus::Duplicate);
    assert_eq!(status("3"), ProcessingStatus::Failed);

    let hash = ContentHash::from_text(&shared);
    assert!(storage.exists_by_hash(&hash).unwrap());
    assert_eq!(
        storage.get_by_source_id("1").unwrap().unwrap().content_hash,
        Some(hash)
    );
}

#[tokio::test]
async fn test_zero_price_in_payload_keeps_known_price() {
    let mut storage = memory_storage();
    let mut listing = pending("42");
    listing.price.sale_price = 1000.0;
    listing.price.condo_fee = 300.0;
    storage.upsert_many(&[listing]).unwrap();

    let payload = detail_payload(json!({
        "id": 42,
        "salePrice": 0,
        "condoPrice": "450",
        "hasFurniture": false,
        "address": {"street": "Rua Augusta", "city": "São Paulo"},
        "photos": [{"url": "abc.jpg"}]
    }));
    let fetcher = StaticDetails::new([("42", payload)]);
    EnrichListings::new(&fetcher, PHOTO_BASE)
        .execute(&mut storage)
        .await
        .unwrap();

    let enriched = storage.get_by_source_id("42").unwrap().unwrap();
    assert_eq!(enriched.status, ProcessingStatus::Enriched);
    assert_eq!(enriched.price.sale_price, 1000.0);
    assert_eq!(enriched.price.condo_fee, 450.0);
    assert_eq!(enriched.furnished, FurnishedStatus::Unfurnished);
    assert_eq!(enriched.address.street, "Rua Augusta");
    assert_eq!(enriched.images, vec!["https://img.example.com/med/abc.jpg"]);
}

#[tokio::test]
async fn test_malformed_payload_fails_only_that_listing() {
    let mut storage = memory_storage();
    storage.upsert_many(&[pending("1"), pending("2")]).unwrap();

    let fetcher = StaticDetails::new([
        ("1", "{not json".to_string()),
        ("2", detail_payload(json!({"id": 2}))),
    ]);
    let summary = EnrichListings::new(&fetcher, PHOTO_BASE)
        .execute(&mut storage)
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.enriched, 1);
    assert!(storage
        .get_by_status(ProcessingStatus::Pending)
        .unwrap()
        .is_empty());
}

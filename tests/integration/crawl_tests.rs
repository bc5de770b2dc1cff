//! End-to-end crawls through the coordinator against a mock site

use crate::common::detail_payload;
use imovel_harvest::config::Config;
use imovel_harvest::crawler::{Coordinator, CrawlMode};
use imovel_harvest::output::load_statistics;
use imovel_harvest::storage::{SqliteStorage, Storage};
use imovel_harvest::{Listing, ProcessingStatus, StepStatus};
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_config(server: &MockServer, dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.api.search_base_url = format!("{}/comprar/imovel", server.uri());
    config.api.delay_between_requests_ms = 0;
    config.scraping.detail_base_url = format!("{}/imovel", server.uri());
    config.scraping.photo_base_url = format!("{}/img/", server.uri());
    config.scraping.retry_attempts = 2;
    config.scraping.retry_delay_ms = 0;
    config.output.database_path = dir
        .path()
        .join("db")
        .join("listings.db")
        .display()
        .to_string();
    config.export.output_dir = dir.path().join("export").display().to_string();
    config
}

async fn mount_search_page(server: &MockServer, ids: &[u64]) {
    let houses: serde_json::Map<String, serde_json::Value> = ids
        .iter()
        .map(|id| (id.to_string(), json!({"id": id, "salePrice": 400000 + id})))
        .collect();
    let document = json!({"props": {"pageProps": {"initialState": {
        "houses": houses,
        "search": {"markers": {"total": ids.len()}}
    }}}});
    let page = format!(
        r#"<html><body><script id="__NEXT_DATA__" type="application/json">{}</script></body></html>"#,
        document
    );

    Mock::given(method("GET"))
        .and(path("/comprar/imovel/sao-paulo-sp-brasil"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, id: u64, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("/imovel/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn open(config: &Config) -> SqliteStorage {
    SqliteStorage::new(Path::new(&config.output.database_path)).unwrap()
}

#[tokio::test]
async fn test_full_crawl_enriches_deduplicates_and_exports() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, &dir);

    mount_search_page(&server, &[1, 2, 3, 4]).await;
    mount_detail(
        &server,
        1,
        detail_payload(json!({"id": 1, "remarks": "Reformado", "photos": ["a.jpg"]})),
    )
    .await;
    mount_detail(&server, 2, detail_payload(json!({"id": 2, "floorNumber": 5}))).await;
    // 3 serves the same bytes as 2; 4 has no mock and returns 404
    mount_detail(&server, 3, detail_payload(json!({"id": 2, "floorNumber": 5}))).await;

    let coordinator = Coordinator::new(config.clone()).unwrap();
    let run = coordinator.run(CrawlMode::FullCrawl, Some(3)).await.unwrap();

    assert_eq!(run.status, StepStatus::Succeeded);
    assert_eq!(run.mode, "full_crawl");
    assert!(run.finished_at.is_some());

    let storage = open(&config);
    let stats = load_statistics(&storage).unwrap();
    assert_eq!(stats.total_listings, 4);
    assert_eq!(stats.count(ProcessingStatus::Enriched), 2);
    assert_eq!(stats.count(ProcessingStatus::Duplicate), 1);
    assert_eq!(stats.count(ProcessingStatus::Failed), 1);

    let steps = storage.get_steps_for_run(run.id).unwrap();
    let names: Vec<&str> = steps.iter().map(|s| s.step_name.as_str()).collect();
    assert_eq!(names, vec!["search", "extract", "export"]);
    assert_eq!(steps[0].items_processed, 4);
    assert_eq!(steps[0].items_created, 4);
    assert_eq!(steps[1].items_processed, 4);
    assert_eq!(steps[1].items_failed, 1);
    assert_eq!(steps[2].items_processed, 2);
    assert_eq!(steps[2].items_created, 2);

    let first = storage.get_by_source_id("1").unwrap().unwrap();
    assert_eq!(first.description, "Reformado");
    assert_eq!(first.images, vec![format!("{}/img/a.jpg", server.uri())]);
    assert_eq!(first.price.sale_price, 400001.0);

    let export_dir = Path::new(&config.export.output_dir);
    let json = std::fs::read_to_string(export_dir.join("listings.json")).unwrap();
    let exported: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(exported.as_array().map(Vec::len), Some(2));
    assert!(export_dir.join("listings.csv").exists());
}

#[tokio::test]
async fn test_resume_only_touches_pending_listings() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, &dir);

    mount_search_page(&server, &[1, 2]).await;
    mount_detail(&server, 1, detail_payload(json!({"id": 1}))).await;

    let coordinator = Coordinator::new(config.clone()).unwrap();
    coordinator.run(CrawlMode::FullCrawl, None).await.unwrap();

    let mut storage = open(&config);
    assert_eq!(
        storage.get_by_source_id("2").unwrap().unwrap().status,
        ProcessingStatus::Failed
    );
    let discovered = Listing::from_source_id("5", &config.scraping.detail_base_url);
    storage.upsert_many(&[discovered]).unwrap();
    drop(storage);
    mount_detail(&server, 5, detail_payload(json!({"id": 5}))).await;

    let run = coordinator.run(CrawlMode::Resume, None).await.unwrap();
    assert_eq!(run.status, StepStatus::Succeeded);
    assert_eq!(run.mode, "resume");

    let storage = open(&config);
    let steps = storage.get_steps_for_run(run.id).unwrap();
    assert_eq!(steps[0].step_name, "extract");
    assert_eq!(steps[0].items_processed, 1);
    assert_eq!(steps[0].items_created, 1);
    assert_eq!(
        storage.get_by_source_id("2").unwrap().unwrap().status,
        ProcessingStatus::Failed
    );
    assert_eq!(
        storage.get_by_source_id("5").unwrap().unwrap().status,
        ProcessingStatus::Enriched
    );
}

#[tokio::test]
async fn test_unreachable_search_fails_the_run() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, &dir);

    Mock::given(method("GET"))
        .and(path("/comprar/imovel/sao-paulo-sp-brasil"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(config.clone()).unwrap();
    let run = coordinator.run(CrawlMode::FullCrawl, None).await.unwrap();

    assert_eq!(run.status, StepStatus::Failed);
    assert!(run.finished_at.is_some());

    let storage = open(&config);
    let steps = storage.get_steps_for_run(run.id).unwrap();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].status, StepStatus::Failed);
    assert!(!Path::new(&config.export.output_dir).exists());
}

#[tokio::test]
async fn test_listing_mode_parses_without_persisting() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, &dir);

    mount_detail(
        &server,
        77,
        detail_payload(json!({
            "id": 77,
            "acceptsPets": "sim",
            "address": {"street": "Rua Harmonia", "lat": -23.55, "lng": -46.69}
        })),
    )
    .await;

    let coordinator = Coordinator::new(config.clone()).unwrap();
    let listing = coordinator.test_listing("77").await.unwrap().unwrap();

    assert_eq!(listing.address.street, "Rua Harmonia");
    assert_eq!(listing.pet_friendly.as_bool(), Some(true));
    assert!(listing.coordinates.is_some());
    assert!(listing.content_hash.is_some());
    assert_eq!(listing.status, ProcessingStatus::Pending);
    assert!(!Path::new(&config.output.database_path).exists());

    assert!(coordinator.test_listing("78").await.unwrap().is_none());
}

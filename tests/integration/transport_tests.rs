//! HTTP transports against wiremock servers

use crate::common::detail_payload;
use imovel_harvest::config::{ApiConfig, CoordinatesConfig, ScrapingConfig};
use imovel_harvest::listing::{Listing, SearchCriteria};
use imovel_harvest::transport::{
    BulkIdTransport, CoordinatesCollector, CoordinatesQuery, DetailFetcher, HttpCoordinatesQuery,
    HttpDetailFetcher, HttpSearchClient, SearchTransport,
};
use imovel_harvest::CrawlError;
use reqwest::Client;
use serde_json::json;
use std::collections::BTreeMap;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_config(server: &MockServer) -> ApiConfig {
    ApiConfig {
        search_base_url: format!("{}/comprar/imovel", server.uri()),
        delay_between_requests_ms: 0,
        ..ApiConfig::default()
    }
}

fn scraping_config(server: &MockServer) -> ScrapingConfig {
    ScrapingConfig {
        detail_base_url: format!("{}/imovel", server.uri()),
        retry_attempts: 3,
        retry_delay_ms: 0,
        ..ScrapingConfig::default()
    }
}

fn rendered_page(document: &serde_json::Value) -> String {
    format!(
        r#"<html><head><title>Imóveis</title></head><body>
        <div id="__next"></div>
        <script id="__NEXT_DATA__" type="application/json">{}</script>
        </body></html>"#,
        document
    )
}

#[tokio::test]
async fn test_search_reads_rendered_first_page() {
    let server = MockServer::start().await;
    let document = json!({"props": {"pageProps": {"initialState": {
        "houses": {
            "101": {"id": 101, "type": "Apartamento", "salePrice": 500000, "bedrooms": 2},
            "102": {"id": 102, "type": "Casa", "salePrice": "780000"}
        },
        "search": {"markers": {"total": {"value": 240}}}
    }}}});
    Mock::given(method("GET"))
        .and(path("/comprar/imovel/sao-paulo-sp-brasil"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rendered_page(&document)))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpSearchClient::new(
        Client::new(),
        &api_config(&server),
        &scraping_config(&server),
    );
    let (mut listings, total) = client
        .search(&SearchCriteria::default(), 0)
        .await
        .unwrap();
    listings.sort_by(|a, b| a.source_id.cmp(&b.source_id));

    assert_eq!(total, 240);
    assert_eq!(listings.len(), 2);
    assert_eq!(listings[0].source_id, "101");
    assert_eq!(listings[0].bedrooms, 2);
    assert_eq!(listings[1].price.sale_price, 780000.0);
    assert_eq!(
        listings[1].source_url,
        format!("{}/imovel/102", server.uri())
    );
}

#[tokio::test]
async fn test_search_requests_page_parameter_and_accepts_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/comprar/imovel/sao-paulo-sp-brasil"))
        .and(query_param("pagina", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": {
                "total": {"value": 30},
                "hits": [{"_id": "j1", "_source": {"id": "j1", "salePrice": 1}}]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpSearchClient::new(
        Client::new(),
        &api_config(&server),
        &scraping_config(&server),
    );
    let (listings, total) = client
        .search(&SearchCriteria::default(), 24)
        .await
        .unwrap();

    assert_eq!(total, 30);
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].source_id, "j1");
}

#[tokio::test]
async fn test_search_sends_criteria_filters() {
    let server = MockServer::start().await;
    let document = json!({"props": {"pageProps": {"initialState": {
        "houses": {"301": {"id": 301, "bedrooms": 3, "area": 95}},
        "search": {"markers": {"total": 1}}
    }}}});
    Mock::given(method("GET"))
        .and(path("/comprar/imovel/sao-paulo-sp-brasil"))
        .and(query_param("filters.location.neighborhoods", "Pinheiros"))
        .and(query_param("filters.location.neighborhoods", "Perdizes"))
        .and(query_param("filters.priceRange.min", "400000"))
        .and(query_param("filters.priceRange.max", "1200000"))
        .and(query_param("filters.houseSpecs.bedrooms.min", "2"))
        .and(query_param("filters.houseSpecs.bedrooms.max", "4"))
        .and(query_param("filters.houseSpecs.area.min", "60"))
        .and(query_param("filters.houseSpecs.area.max", "150.5"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rendered_page(&document)))
        .expect(1)
        .mount(&server)
        .await;

    let criteria = SearchCriteria {
        neighborhoods: vec!["Pinheiros".to_string(), "Perdizes".to_string()],
        price_min: Some(400000.0),
        price_max: Some(1200000.0),
        bedrooms_min: Some(2),
        bedrooms_max: Some(4),
        area_min: Some(60.0),
        area_max: Some(150.5),
        ..SearchCriteria::default()
    };
    let client = HttpSearchClient::new(
        Client::new(),
        &api_config(&server),
        &scraping_config(&server),
    );
    let (listings, total) = client.search(&criteria, 0).await.unwrap();

    assert_eq!(total, 1);
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].source_id, "301");
}

#[tokio::test]
async fn test_search_error_statuses_and_markup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/comprar/imovel/sao-paulo-sp-brasil"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/comprar/imovel/rio-de-janeiro-rj-brasil"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>captcha</body></html>"))
        .mount(&server)
        .await;

    let client = HttpSearchClient::new(
        Client::new(),
        &api_config(&server),
        &scraping_config(&server),
    );

    let err = client
        .search(&SearchCriteria::default(), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, CrawlError::Api { status: 503, .. }));

    let rio = SearchCriteria::new("Rio de Janeiro", "RJ");
    let err = client.search(&rio, 0).await.unwrap_err();
    assert!(matches!(err, CrawlError::Markup { .. }));
}

fn detail_listing(server: &MockServer, id: &str) -> Listing {
    Listing::from_source_id(id, &format!("{}/imovel", server.uri()))
}

#[tokio::test]
async fn test_detail_fetch_retries_until_success() {
    let server = MockServer::start().await;
    let payload = detail_payload(json!({"id": 7, "remarks": "Sol da manhã"}));
    let page = rendered_page(&serde_json::from_str(&payload).unwrap());

    Mock::given(method("GET"))
        .and(path("/imovel/7"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/imovel/7"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpDetailFetcher::new(
        Client::new(),
        &api_config(&server),
        &scraping_config(&server),
    );
    let raw = fetcher
        .extract_detail(&detail_listing(&server, "7"))
        .await
        .unwrap();

    let document: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(document["props"]["pageProps"]["house"]["id"], 7);
}

#[tokio::test]
async fn test_detail_fetch_gives_up_after_retry_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/imovel/8"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let fetcher = HttpDetailFetcher::new(
        Client::new(),
        &api_config(&server),
        &scraping_config(&server),
    );
    assert!(fetcher
        .extract_detail(&detail_listing(&server, "8"))
        .await
        .is_none());
}

#[tokio::test]
async fn test_detail_fetch_passes_json_body_through() {
    let server = MockServer::start().await;
    let payload = detail_payload(json!({"id": 9}));
    Mock::given(method("GET"))
        .and(path("/imovel/9"))
        .respond_with(ResponseTemplate::new(200).set_body_string(payload.clone()))
        .mount(&server)
        .await;

    let fetcher = HttpDetailFetcher::new(
        Client::new(),
        &api_config(&server),
        &scraping_config(&server),
    );
    let raw = fetcher.extract_detail(&detail_listing(&server, "9")).await;
    assert_eq!(raw, Some(payload));
}

fn coordinates_config(server: &MockServer) -> CoordinatesConfig {
    let mut headers = BTreeMap::new();
    headers.insert("User-Agent".to_string(), "replay-agent".to_string());
    headers.insert("Cookie".to_string(), "session=secret".to_string());
    CoordinatesConfig {
        request_url: Some(format!(
            "{}/api/coordinates?slug={{slug}}&type={{property_type}}",
            server.uri()
        )),
        headers,
        ..CoordinatesConfig::default()
    }
}

fn coordinates_body(ids: &[&str]) -> serde_json::Value {
    let hits: Vec<serde_json::Value> = ids
        .iter()
        .map(|id| json!({"_id": id, "_source": {"location": {"lat": -23.56, "lon": -46.65}}}))
        .collect();
    json!({"hits": {"total": {"value": ids.len()}, "hits": hits}})
}

#[tokio::test]
async fn test_coordinates_query_replays_captured_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/coordinates"))
        .and(query_param("slug", "sao-paulo-sp-brasil"))
        .and(query_param("type", "apartamento"))
        .and(header("user-agent", "replay-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(coordinates_body(&["a", "b"])))
        .expect(1)
        .mount(&server)
        .await;

    let query = HttpCoordinatesQuery::new(Client::new(), &coordinates_config(&server));
    let request = query
        .capture("sao-paulo-sp-brasil", "apartamento")
        .await
        .unwrap()
        .unwrap();
    assert!(!request.headers.contains_key("cookie"));

    let ids = query.fetch(&request, None).await;
    let names: Vec<&str> = ids.iter().map(|id| id.source_id.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(ids[0].latitude, -23.56);
}

#[tokio::test]
async fn test_coordinates_query_non_200_yields_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/coordinates"))
        .respond_with(ResponseTemplate::new(403).set_body_json(coordinates_body(&["a"])))
        .mount(&server)
        .await;

    let query = HttpCoordinatesQuery::new(Client::new(), &coordinates_config(&server));
    let request = query
        .capture("sao-paulo-sp-brasil", "apartamento")
        .await
        .unwrap()
        .unwrap();
    assert!(query.fetch(&request, None).await.is_empty());
}

#[tokio::test]
async fn test_collector_tries_every_viewport_when_ids_repeat() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/coordinates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(coordinates_body(&["a", "b", "c"])))
        .expect(9)
        .mount(&server)
        .await;

    let config = coordinates_config(&server);
    let collector =
        CoordinatesCollector::new(HttpCoordinatesQuery::new(Client::new(), &config), &config);
    let ids = collector
        .collect_ids("sao-paulo-sp-brasil", "apartamento", 10)
        .await
        .unwrap();

    assert_eq!(ids.len(), 3);
}

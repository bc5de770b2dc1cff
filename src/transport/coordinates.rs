//! Segmented identifier collection over the bulk coordinate index
//!
//! One coordinate query returns every listing id inside a map viewport, far
//! more than a search page. The collector replays a captured query for the
//! initial viewport and then for eight viewports shifted around the origin
//! until it has seen enough distinct identifiers.

use crate::config::CoordinatesConfig;
use crate::normalize::lookup::{as_string, first, first_f64, lookup};
use crate::transport::{BulkIdTransport, CollectedId};
use crate::{CrawlError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

const VIEWPORT_KEYS: [&str; 4] = [
    "filters.location.viewport.north",
    "filters.location.viewport.south",
    "filters.location.viewport.east",
    "filters.location.viewport.west",
];

/// Headers from the captured request that are replayed
const REPLAYED_HEADERS: &[&str] = &["accept", "user-agent", "x-ab-test"];

/// Rectangular map area in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Viewport {
    pub fn around(latitude: f64, longitude: f64, half_span: f64) -> Self {
        Self {
            north: latitude + half_span,
            south: latitude - half_span,
            east: longitude + half_span,
            west: longitude - half_span,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.north + self.south) / 2.0,
            (self.east + self.west) / 2.0,
        )
    }
}

/// The eight compass shifts of a viewport around the origin
///
/// Order: east, west, north, south, northeast, southeast, northwest, southwest.
pub fn shifted_viewports(
    origin_lat: f64,
    origin_lng: f64,
    shift: f64,
    half_span: f64,
) -> Vec<Viewport> {
    const DIRECTIONS: [(f64, f64); 8] = [
        (0.0, 1.0),
        (0.0, -1.0),
        (1.0, 0.0),
        (-1.0, 0.0),
        (1.0, 1.0),
        (-1.0, 1.0),
        (1.0, -1.0),
        (-1.0, -1.0),
    ];

    DIRECTIONS
        .iter()
        .map(|(dlat, dlng)| {
            Viewport::around(
                origin_lat + dlat * shift,
                origin_lng + dlng * shift,
                half_span,
            )
        })
        .collect()
}

/// An authoritative bulk query, as issued by a live page load
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedRequest {
    pub url: Url,
    pub headers: BTreeMap<String, String>,
}

impl CapturedRequest {
    /// The captured URL with its viewport parameters replaced
    pub fn with_viewport(&self, viewport: &Viewport) -> Url {
        let kept: Vec<(String, String)> = self
            .url
            .query_pairs()
            .filter(|(key, _)| !VIEWPORT_KEYS.iter().any(|k| k == key))
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        let mut url = self.url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            pairs.extend_pairs(kept);
            let values = [viewport.north, viewport.south, viewport.east, viewport.west];
            for (key, value) in VIEWPORT_KEYS.iter().zip(values) {
                pairs.append_pair(key, &value.to_string());
            }
        }
        url
    }
}

/// Capture and replay of the bulk coordinate query
#[async_trait]
pub trait CoordinatesQuery: Send + Sync {
    /// Obtains the authoritative query for a location and property type
    async fn capture(
        &self,
        location_slug: &str,
        property_type: &str,
    ) -> Result<Option<CapturedRequest>>;

    /// Issues the query, optionally for a different viewport
    ///
    /// Failures are logged and yield no identifiers.
    async fn fetch(&self, request: &CapturedRequest, viewport: Option<&Viewport>)
        -> Vec<CollectedId>;
}

/// Viewport-tiling collector over a `CoordinatesQuery`
pub struct CoordinatesCollector<Q> {
    query: Q,
    origin_lat: f64,
    origin_lng: f64,
    shift_degrees: f64,
    half_span_degrees: f64,
    delay: Duration,
}

impl<Q: CoordinatesQuery> CoordinatesCollector<Q> {
    /// Creates a collector with no pacing between queries
    ///
    /// # Arguments
    ///
    /// * `query` - Capture and replay of the coordinate query
    /// * `config` - Origin and viewport geometry
    pub fn new(query: Q, config: &CoordinatesConfig) -> Self {
        Self {
            query,
            origin_lat: config.origin_lat,
            origin_lng: config.origin_lng,
            shift_degrees: config.shift_degrees,
            half_span_degrees: config.half_span_degrees,
            delay: Duration::ZERO,
        }
    }

    /// Waits `delay` after every query sent to the source
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    async fn fetch_paced(
        &self,
        request: &CapturedRequest,
        viewport: Option<&Viewport>,
    ) -> Vec<CollectedId> {
        let batch = self.query.fetch(request, viewport).await;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        batch
    }
}

/// Distinct identifiers in first-seen order
#[derive(Default)]
struct SeenIds {
    order: Vec<CollectedId>,
    ids: HashSet<String>,
}

impl SeenIds {
    fn merge(&mut self, batch: Vec<CollectedId>) -> usize {
        let mut added = 0;
        for item in batch {
            if self.ids.insert(item.source_id.clone()) {
                self.order.push(item);
                added += 1;
            }
        }
        added
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

#[async_trait]
impl<Q: CoordinatesQuery> BulkIdTransport for CoordinatesCollector<Q> {
    async fn collect_ids(
        &self,
        location_slug: &str,
        property_type: &str,
        target_count: usize,
    ) -> Result<Vec<CollectedId>> {
        let Some(request) = self.query.capture(location_slug, property_type).await? else {
            warn!("No coordinates query captured for {}", location_slug);
            return Ok(Vec::new());
        };

        let mut seen = SeenIds::default();
        seen.merge(self.fetch_paced(&request, None).await);
        info!(
            "Coordinates query: {} ids from initial viewport (target: {})",
            seen.len(),
            target_count
        );

        let viewports = shifted_viewports(
            self.origin_lat,
            self.origin_lng,
            self.shift_degrees,
            self.half_span_degrees,
        );
        for viewport in &viewports {
            if seen.len() >= target_count {
                break;
            }
            let added = seen.merge(self.fetch_paced(&request, Some(viewport)).await);
            info!("Viewport shift: +{} new ids (total: {})", added, seen.len());
        }

        let mut collected = seen.order;
        collected.truncate(target_count);
        info!("Collected {} unique listing ids", collected.len());
        Ok(collected)
    }
}

/// Replays the configured coordinate query over HTTP
///
/// Capturing the query needs a rendered browser session, so the request is
/// taken from configuration. `{slug}` and `{property_type}` in the configured
/// URL are substituted.
pub struct HttpCoordinatesQuery {
    client: Client,
    config: CoordinatesConfig,
}

impl HttpCoordinatesQuery {
    pub fn new(client: Client, config: &CoordinatesConfig) -> Self {
        Self {
            client,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl CoordinatesQuery for HttpCoordinatesQuery {
    async fn capture(
        &self,
        location_slug: &str,
        property_type: &str,
    ) -> Result<Option<CapturedRequest>> {
        let Some(template) = &self.config.request_url else {
            return Ok(None);
        };

        let url = Url::parse(
            &template
                .replace("{slug}", location_slug)
                .replace("{property_type}", property_type),
        )
        .map_err(CrawlError::from)?;

        let headers = self
            .config
            .headers
            .iter()
            .filter(|(name, _)| REPLAYED_HEADERS.contains(&name.to_lowercase().as_str()))
            .map(|(name, value)| (name.to_lowercase(), value.clone()))
            .collect();

        Ok(Some(CapturedRequest { url, headers }))
    }

    async fn fetch(
        &self,
        request: &CapturedRequest,
        viewport: Option<&Viewport>,
    ) -> Vec<CollectedId> {
        let url = match viewport {
            Some(viewport) => request.with_viewport(viewport),
            None => request.url.clone(),
        };

        let mut builder = self.client.get(url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Coordinates query failed for {}: {}", url, e);
                return Vec::new();
            }
        };

        if response.status().as_u16() != 200 {
            warn!("Coordinates query returned {}", response.status());
            return Vec::new();
        }

        match response.json::<serde_json::Value>().await {
            Ok(data) => parse_coordinates_response(&data),
            Err(e) => {
                warn!("Coordinates response was not JSON: {}", e);
                Vec::new()
            }
        }
    }
}

/// Reads `hits.hits[]` as `_id` plus `_source.location.{lat,lon}`
pub fn parse_coordinates_response(data: &serde_json::Value) -> Vec<CollectedId> {
    let Some(serde_json::Value::Array(hits)) = lookup(data, "hits.hits") else {
        return Vec::new();
    };

    hits.iter()
        .filter_map(|hit| {
            let source_id = first(hit, &["_id"]).and_then(as_string)?;
            if source_id.is_empty() {
                return None;
            }
            let latitude = first_f64(hit, &["_source.location.lat"]).unwrap_or(0.0);
            let longitude =
                first_f64(hit, &["_source.location.lon", "_source.location.lng"]).unwrap_or(0.0);
            Some(CollectedId::new(source_id, latitude, longitude))
        })
        .collect()
}

use crate::listing::SearchCriteria;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure
///
/// Every section is optional in the file; omitted keys take the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub scraping: ScrapingConfig,
    pub search: SearchConfig,
    pub coordinates: CoordinatesConfig,
    pub output: OutputConfig,
    pub export: ExportConfig,
}

/// Search endpoint and request pacing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server-rendered search page root; the location slug is appended
    #[serde(rename = "search-base-url")]
    pub search_base_url: String,

    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Pause after each outbound request to the source site (milliseconds)
    #[serde(rename = "delay-between-requests-ms")]
    pub delay_between_requests_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            search_base_url: "https://www.quintoandar.com.br/comprar/imovel".to_string(),
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                         AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
                .to_string(),
            timeout_secs: 30,
            delay_between_requests_ms: 1500,
        }
    }
}

/// Detail page fetching
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    #[serde(rename = "detail-base-url")]
    pub detail_base_url: String,

    /// Prefix for relative photo paths found in detail payloads
    #[serde(rename = "photo-base-url")]
    pub photo_base_url: String,

    /// Search page budget per run
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    #[serde(rename = "retry-attempts")]
    pub retry_attempts: u32,

    #[serde(rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            detail_base_url: "https://www.quintoandar.com.br/imovel".to_string(),
            photo_base_url: "https://www.quintoandar.com.br/img/med/".to_string(),
            max_pages: 50,
            retry_attempts: 3,
            retry_delay_ms: 3000,
        }
    }
}

/// Search criteria and discovery targets
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub city: String,
    pub state: String,
    pub neighborhoods: Vec<String>,

    /// Identifier target for segmented discovery
    #[serde(rename = "target-count")]
    pub target_count: usize,

    /// Property type filter used in the segmented discovery query
    #[serde(rename = "property-type")]
    pub property_type: String,

    #[serde(rename = "price-min")]
    pub price_min: Option<f64>,
    #[serde(rename = "price-max")]
    pub price_max: Option<f64>,
    #[serde(rename = "bedrooms-min")]
    pub bedrooms_min: Option<u32>,
    #[serde(rename = "bedrooms-max")]
    pub bedrooms_max: Option<u32>,
    #[serde(rename = "area-min")]
    pub area_min: Option<f64>,
    #[serde(rename = "area-max")]
    pub area_max: Option<f64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            city: "São Paulo".to_string(),
            state: "SP".to_string(),
            neighborhoods: Vec::new(),
            target_count: 1000,
            property_type: "apartamento".to_string(),
            price_min: None,
            price_max: None,
            bedrooms_min: None,
            bedrooms_max: None,
            area_min: None,
            area_max: None,
        }
    }
}

impl SearchConfig {
    /// Builds the immutable criteria value handed to the pipeline
    pub fn criteria(&self) -> SearchCriteria {
        SearchCriteria {
            city: self.city.clone(),
            state: self.state.clone(),
            neighborhoods: self.neighborhoods.clone(),
            price_min: self.price_min,
            price_max: self.price_max,
            bedrooms_min: self.bedrooms_min,
            bedrooms_max: self.bedrooms_max,
            area_min: self.area_min,
            area_max: self.area_max,
        }
    }
}

/// Bulk coordinate-index query replayed by the segmented collector
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoordinatesConfig {
    /// Captured query URL including its viewport parameters
    #[serde(rename = "request-url")]
    pub request_url: Option<String>,

    /// Headers that accompanied the captured query
    pub headers: BTreeMap<String, String>,

    #[serde(rename = "origin-lat")]
    pub origin_lat: f64,

    #[serde(rename = "origin-lng")]
    pub origin_lng: f64,

    /// Distance of each shifted viewport center from the origin (degrees)
    #[serde(rename = "shift-degrees")]
    pub shift_degrees: f64,

    /// Half of a viewport's width and height (degrees)
    #[serde(rename = "half-span-degrees")]
    pub half_span_degrees: f64,
}

impl Default for CoordinatesConfig {
    fn default() -> Self {
        Self {
            request_url: None,
            headers: BTreeMap::new(),
            origin_lat: -23.55,
            origin_lng: -46.63,
            shift_degrees: 0.15,
            half_span_degrees: 0.08,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "./data/listings.db".to_string(),
        }
    }
}

/// Export configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    #[serde(rename = "output-dir")]
    pub output_dir: String,

    /// Any of `json`, `csv`
    pub formats: Vec<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: "./output".to_string(),
            formats: vec!["json".to_string(), "csv".to_string()],
        }
    }
}

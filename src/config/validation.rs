use crate::config::types::{
    ApiConfig, Config, CoordinatesConfig, ExportConfig, OutputConfig, ScrapingConfig,
    SearchConfig,
};
use crate::ConfigError;
use url::Url;

/// Export formats the export step knows how to write
pub const SUPPORTED_FORMATS: &[&str] = &["json", "csv"];

/// Validates the entire configuration
///
/// # Arguments
///
/// * `config` - The parsed configuration
///
/// # Returns
///
/// * `Ok(())` - Every section is usable
/// * `Err(ConfigError)` - The first rejected field, as `Validation` or `InvalidUrl`
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_scraping_config(&config.scraping)?;
    validate_search_config(&config.search)?;
    validate_coordinates_config(&config.coordinates)?;
    validate_output_config(&config.output)?;
    validate_export_config(&config.export)?;
    Ok(())
}

/// Validates the source endpoint and request timeout
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    validate_http_url("search-base-url", &config.search_base_url)?;

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates page budget, retries and base URLs
fn validate_scraping_config(config: &ScrapingConfig) -> Result<(), ConfigError> {
    validate_http_url("detail-base-url", &config.detail_base_url)?;
    validate_http_url("photo-base-url", &config.photo_base_url)?;

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.retry_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "retry-attempts must be >= 1, got {}",
            config.retry_attempts
        )));
    }

    Ok(())
}

/// Validates location, discovery target and filter bounds
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if config.city.trim().is_empty() || config.state.trim().is_empty() {
        return Err(ConfigError::Validation(
            "search city and state cannot be empty".to_string(),
        ));
    }

    if config.target_count < 1 {
        return Err(ConfigError::Validation(
            "target-count must be >= 1".to_string(),
        ));
    }

    validate_range("price", config.price_min, config.price_max)?;
    validate_range(
        "bedrooms",
        config.bedrooms_min.map(f64::from),
        config.bedrooms_max.map(f64::from),
    )?;
    validate_range("area", config.area_min, config.area_max)?;

    Ok(())
}

/// Validates the replayed query URL and viewport geometry
fn validate_coordinates_config(config: &CoordinatesConfig) -> Result<(), ConfigError> {
    if let Some(url) = &config.request_url {
        validate_http_url("coordinates request-url", url)?;
    }

    if !(-90.0..=90.0).contains(&config.origin_lat)
        || !(-180.0..=180.0).contains(&config.origin_lng)
    {
        return Err(ConfigError::Validation(format!(
            "origin ({}, {}) is not a valid coordinate",
            config.origin_lat, config.origin_lng
        )));
    }

    if config.shift_degrees <= 0.0 || config.half_span_degrees <= 0.0 {
        return Err(ConfigError::Validation(
            "shift-degrees and half-span-degrees must be positive".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates export directory and formats
fn validate_export_config(config: &ExportConfig) -> Result<(), ConfigError> {
    if config.output_dir.is_empty() {
        return Err(ConfigError::Validation(
            "export output-dir cannot be empty".to_string(),
        ));
    }

    if config.formats.is_empty() {
        return Err(ConfigError::Validation(
            "export formats cannot be empty".to_string(),
        ));
    }

    for format in &config.formats {
        if !SUPPORTED_FORMATS.contains(&format.to_lowercase().as_str()) {
            return Err(ConfigError::Validation(format!(
                "Unknown export format '{}', expected one of {:?}",
                format, SUPPORTED_FORMATS
            )));
        }
    }

    Ok(())
}

/// Requires an absolute http(s) URL
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            field, value
        )));
    }

    Ok(())
}

fn validate_range(name: &str, min: Option<f64>, max: Option<f64>) -> Result<(), ConfigError> {
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(ConfigError::Validation(format!(
                "{} min ({}) is greater than max ({})",
                name, min, max
            )));
        }
    }
    Ok(())
}

//! Imovel-Harvest: a staged crawler for property listing sites
//!
//! This crate discovers candidate listings (paginated search or bulk
//! coordinate-indexed ID collection), enriches each one from its detail page,
//! deduplicates by content hash and exports the enriched records.

pub mod config;
pub mod crawler;
pub mod listing;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod state;
pub mod storage;
pub mod transport;
pub mod usecase;

use pipeline::ErrorCategory;
use thiserror::Error;

/// Main error type for crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Unexpected markup at {url}: {message}")]
    Markup { url: String, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Upstream API returned {status} for {url}")]
    Api { status: u16, url: String },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: state::ProcessingStatus,
        to: state::ProcessingStatus,
    },

    #[error("Export error: {0}")]
    Export(String),

    #[error("Mode '{0}' does not run the pipeline")]
    UnsupportedMode(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CrawlError {
    /// Maps this error onto the audit taxonomy recorded in step results
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Http { source, .. } | Self::Reqwest(source) => {
                if source.is_timeout() {
                    ErrorCategory::Timeout
                } else {
                    ErrorCategory::Network
                }
            }
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Markup { .. } => ErrorCategory::Selector,
            Self::Parse(_) | Self::Json(_) | Self::UrlParse(_) | Self::Csv(_) => {
                ErrorCategory::Parse
            }
            Self::Database(_) | Self::Storage(_) => ErrorCategory::Database,
            Self::Api { .. } => ErrorCategory::Api,
            Self::Config(_)
            | Self::InvalidTransition { .. }
            | Self::Export(_)
            | Self::UnsupportedMode(_)
            | Self::Io(_) => ErrorCategory::Unknown,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use listing::{Listing, SearchCriteria};
pub use state::{ProcessingStatus, StepStatus};

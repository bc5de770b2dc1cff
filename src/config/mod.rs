//! Configuration module
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use imovel_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Search page budget: {}", config.scraping.max_pages);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    ApiConfig, Config, CoordinatesConfig, ExportConfig, OutputConfig, ScrapingConfig,
    SearchConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{validate, SUPPORTED_FORMATS};

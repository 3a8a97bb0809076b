//! Configuration module for POI Sweep
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use poi_sweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sweep.toml")).unwrap();
//! println!("Sweep will use max depth: {}", config.crawl.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{ApiConfig, Config, CrawlConfig, RuntimeConfig};

// Re-export parser functions
pub use parser::{
    apply_env_key, compute_config_hash, load_config, load_config_with_hash, parse_config,
    API_KEY_ENV,
};
pub use validation::{validate, validate_request};

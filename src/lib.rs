//! POI Sweep: an adaptive spatial crawler for place-search APIs
//!
//! This crate discovers points-of-interest across a geographic area with cheap
//! minimal-field search queries, subdividing the search grid only where the
//! API's page cap is hit, then fetches full attributes once per unique place.

pub mod area;
pub mod config;
pub mod crawler;
pub mod output;
pub mod places;
pub mod state;

use thiserror::Error;

/// Main error type for crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Geocoding failed for '{location}': {reason}")]
    Geocode { location: String, reason: String },

    #[error("Fatal API error: {0}")]
    Api(#[from] ApiError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
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

    #[error("Missing API key: set GOOGLE_PLACES_API_KEY or [api] key")]
    MissingApiKey,
}

/// Errors returned by the remote geocoding, search, detail and boundary calls
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request rejected by {service}: HTTP {status}: {message}")]
    Unauthorized {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited by {service}")]
    RateLimited { service: &'static str },

    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Server error from {service}: HTTP {status}")]
    Server { service: &'static str, status: u16 },

    #[error("Unexpected HTTP {status} from {service}: {message}")]
    UnexpectedStatus {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("{task} task did not complete: {message}")]
    TaskFailed { task: &'static str, message: String },
}

impl ApiError {
    /// Returns true for transient conditions worth retrying after a backoff
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Server { .. } => true,
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }

    /// Returns true when the error means every further call will fail too
    /// (bad credentials, disabled API), so the whole crawl must stop
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for remote API operations
pub type ApiResult<T> = std::result::Result<T, ApiError>;

// Re-export commonly used types
pub use area::{Area, Boundary, BoundaryFilter, Bounds, Cell, LatLng};
pub use config::Config;
pub use crawler::{CrawlOrchestrator, CrawlReport, Deduplicator, GridScheduler};
pub use places::{AttributeSet, PlaceRecord, TypeFilter};
pub use state::CellState;

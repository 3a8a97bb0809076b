use crate::places::AttributeSet;
use serde::Deserialize;

/// Main configuration structure for POI Sweep
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub crawl: CrawlConfig,
    pub attributes: AttributeSet,
    pub runtime: RuntimeConfig,
}

/// Remote endpoints and credentials
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ApiConfig {
    /// Google Maps Platform key; `GOOGLE_PLACES_API_KEY` overrides it
    pub key: Option<String>,

    /// Base URL of the Places API (New)
    pub places_url: String,

    /// Geocoding endpoint
    pub geocode_url: String,

    /// Nominatim-compatible search endpoint used for boundary polygons
    pub boundary_url: String,

    /// User-Agent sent with every request
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: None,
            places_url: "https://places.googleapis.com/v1".to_string(),
            geocode_url: "https://maps.googleapis.com/maps/api/geocode/json".to_string(),
            boundary_url: "https://nominatim.openstreetmap.org/search".to_string(),
            user_agent: format!("poi-sweep/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// What to search for and how finely to grid the area
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlConfig {
    /// Free-text search terms, e.g. "coffee"
    pub keywords: String,

    /// Place name to geocode, e.g. "Taipei City"
    pub location: String,

    /// Place types to query separately; empty means one unfiltered query
    pub primary_types: Vec<String>,

    /// Maximum subdivision depth (root cell is depth 0)
    pub max_depth: u32,

    /// Stop discovery once this many unique places have been found
    pub max_results: Option<usize>,

    /// Pages followed per (cell, type) query
    pub max_pages: u32,

    /// Results requested per page
    pub page_size: u32,

    /// Raw result count at which a cell is treated as truncated
    pub page_cap: usize,

    /// Cells narrower than this (degrees) are never split
    pub min_cell_span: f64,

    /// Viewports narrower than this (degrees) are searched as a point
    pub min_viewport_span: f64,

    /// Bias radius for point-like areas
    pub fallback_radius_m: f64,

    /// Look up an administrative boundary and clip results to it
    pub use_boundary: bool,

    pub language_code: Option<String>,

    pub region_code: Option<String>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            keywords: String::new(),
            location: String::new(),
            primary_types: Vec::new(),
            max_depth: 5,
            max_results: None,
            max_pages: 3,
            page_size: 20,
            page_cap: 60,
            min_cell_span: 0.003,
            min_viewport_span: 0.01,
            fallback_radius_m: 20_000.0,
            use_boundary: true,
            language_code: None,
            region_code: None,
        }
    }
}

/// Concurrency, timeouts and pacing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RuntimeConfig {
    /// Upper bound on outstanding remote calls
    pub max_concurrent_requests: u32,

    /// Timeout for a single call attempt (seconds)
    pub request_timeout_secs: u64,

    /// Retries after the first attempt for transient failures
    pub max_retries: u32,

    /// First backoff delay (milliseconds); doubles per retry
    pub backoff_base_ms: u64,

    /// Pause between pages of one query (milliseconds)
    pub page_delay_ms: u64,

    /// Minimum spacing between boundary lookups (milliseconds)
    pub boundary_delay_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 4,
            request_timeout_secs: 30,
            max_retries: 3,
            backoff_base_ms: 500,
            page_delay_ms: 300,
            boundary_delay_ms: 1100,
        }
    }
}

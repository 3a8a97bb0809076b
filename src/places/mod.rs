//! Remote place services
//!
//! This module provides:
//! - Trait seams for geocoding, boundary lookup, search and details
//! - HTTP implementations for Google Maps Platform and Nominatim
//! - `RequestGate`, the shared concurrency limit and retry policy
//! - The minimal-field search adapter and the full-attribute detail adapter

pub mod api;
pub mod client;
pub mod details;
pub mod gateway;
pub mod nominatim;
pub mod search;
mod types;

pub use api::{BoundarySource, Geocoder, PlacesApi};
pub use client::{build_http_client, GoogleMapsClient};
pub use details::{DetailFetcher, DetailOutcome};
pub use gateway::{RequestGate, RetryPolicy};
pub use nominatim::NominatimClient;
pub use search::{CellQuery, SearchClient, SearchSettings};
pub use types::{
    AttributeSet, GeocodeResult, PlaceRecord, SearchHit, SearchPage, SearchRegion, SearchRequest,
    TypeFilter,
};

//! Trait seams for the remote services the crawl consumes
//!
//! The engine only talks to these traits. HTTP implementations live in
//! `client` and `nominatim`; tests substitute in-memory fakes.

use crate::area::Boundary;
use crate::places::types::{AttributeSet, GeocodeResult, PlaceRecord, SearchPage, SearchRequest};
use crate::ApiResult;
use async_trait::async_trait;

/// Resolves a free-form location into a center and viewport
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Returns `ApiError::NotFound` when the location has no match
    async fn geocode(&self, location: &str, language_code: Option<&str>)
        -> ApiResult<GeocodeResult>;
}

/// Looks up an administrative outline for a location
#[async_trait]
pub trait BoundarySource: Send + Sync {
    /// `Ok(None)` means the location has no known shape, which is not an error
    async fn fetch_boundary(&self, location: &str) -> ApiResult<Option<Boundary>>;
}

/// The place search and place detail endpoints
#[async_trait]
pub trait PlacesApi: Send + Sync {
    /// Fetches one page of minimal-field search results
    async fn search_places(&self, request: &SearchRequest) -> ApiResult<SearchPage>;

    /// Fetches the requested attributes of one place
    async fn fetch_place_details(
        &self,
        place_id: &str,
        attributes: &AttributeSet,
    ) -> ApiResult<PlaceRecord>;
}

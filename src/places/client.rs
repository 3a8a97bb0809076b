//! HTTP client for the Google Geocoding and Places (New) APIs
//!
//! This module handles:
//! - Building the shared HTTP client
//! - Text Search requests with a minimal field mask (IDs and coordinates)
//! - Place Details requests with a field mask derived from `AttributeSet`
//! - Geocoding a location string into a center and viewport
//! - Mapping HTTP and API status codes onto `ApiError`
//!
//! # Status mapping
//!
//! | Condition | Error |
//! |-----------|-------|
//! | HTTP 401 / 403, or 400 mentioning the API key | `Unauthorized` (fatal) |
//! | HTTP 404 | `NotFound` |
//! | HTTP 429 | `RateLimited` (retried) |
//! | HTTP 5xx | `Server` (retried) |
//! | Anything else ≥ 400 | `UnexpectedStatus` |

use crate::area::{Bounds, LatLng};
use crate::config::ApiConfig;
use crate::places::api::{Geocoder, PlacesApi};
use crate::places::types::{
    AttributeSet, GeocodeResult, PlaceRecord, SearchHit, SearchPage, SearchRegion, SearchRequest,
};
use crate::{ApiError, ApiResult};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Field mask for the discovery phase: nothing beyond what dedup and
/// spatial filtering need
const SEARCH_FIELD_MASK: &str = "places.id,places.location,nextPageToken";

const PLACES_SERVICE: &str = "places";
const GEOCODE_SERVICE: &str = "geocode";

/// Builds an HTTP client with the crawler's user agent and timeouts
///
/// # Arguments
///
/// * `user_agent` - Value for the User-Agent header
/// * `timeout` - Whole-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Google Maps Platform client implementing `Geocoder` and `PlacesApi`
#[derive(Debug, Clone)]
pub struct GoogleMapsClient {
    http: Client,
    api_key: String,
    places_url: String,
    geocode_url: String,
}

impl GoogleMapsClient {
    pub fn new(http: Client, api_key: impl Into<String>, config: &ApiConfig) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            places_url: config.places_url.trim_end_matches('/').to_string(),
            geocode_url: config.geocode_url.clone(),
        }
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(
        service: &'static str,
        response: Response,
    ) -> ApiResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(service, status, &body));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(format!("{} response: {}", service, e)))
    }
}

/// Maps a failed HTTP response onto an `ApiError`
pub fn classify_status(service: &'static str, status: StatusCode, body: &str) -> ApiError {
    let message = error_message(body);
    let code = status.as_u16();

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized {
            service,
            status: code,
            message,
        },
        StatusCode::BAD_REQUEST if message.to_lowercase().contains("api key") => {
            ApiError::Unauthorized {
                service,
                status: code,
                message,
            }
        }
        StatusCode::NOT_FOUND => ApiError::NotFound(message),
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited { service },
        s if s.is_server_error() => ApiError::Server {
            service,
            status: code,
        },
        _ => ApiError::UnexpectedStatus {
            service,
            status: code,
            message,
        },
    }
}

/// Pulls `error.message` out of a Google error body, falling back to the
/// first 200 characters of the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            let error = v.get("error")?;
            error
                .get("message")
                .or_else(|| error.get("status"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}

fn search_body(request: &SearchRequest) -> Value {
    let mut body = json!({
        "textQuery": request.text_query,
        "pageSize": request.page_size,
    });

    match request.region {
        SearchRegion::Rectangle(bounds) => {
            body["locationRestriction"] = json!({
                "rectangle": {
                    "low": { "latitude": bounds.south, "longitude": bounds.west },
                    "high": { "latitude": bounds.north, "longitude": bounds.east },
                }
            });
        }
        SearchRegion::Circle { center, radius_m } => {
            body["locationBias"] = json!({
                "circle": {
                    "center": { "latitude": center.lat, "longitude": center.lng },
                    "radius": radius_m,
                }
            });
        }
    }

    if let Some(included_type) = &request.included_type {
        body["includedType"] = json!(included_type);
        body["strictTypeFiltering"] = json!(true);
    }
    if let Some(token) = &request.page_token {
        body["pageToken"] = json!(token);
    }
    if let Some(language) = &request.language_code {
        body["languageCode"] = json!(language);
    }
    if let Some(region) = &request.region_code {
        body["regionCode"] = json!(region);
    }
    body
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchTextResponse {
    #[serde(default)]
    places: Vec<PlaceResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LocalizedText {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiLatLng {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpeningHours {
    #[serde(default)]
    weekday_descriptions: Vec<String>,
}

/// A place as returned by the Places API (New)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaceResource {
    id: Option<String>,
    name: Option<String>,
    display_name: Option<LocalizedText>,
    formatted_address: Option<String>,
    location: Option<ApiLatLng>,
    #[serde(default)]
    types: Vec<String>,
    primary_type: Option<String>,
    business_status: Option<String>,
    rating: Option<f64>,
    user_rating_count: Option<u32>,
    national_phone_number: Option<String>,
    international_phone_number: Option<String>,
    website_uri: Option<String>,
    google_maps_uri: Option<String>,
    price_level: Option<String>,
    regular_opening_hours: Option<OpeningHours>,
}

impl PlaceResource {
    /// The bare place ID, from `id` or the `places/{id}` resource name
    fn place_id(&self) -> Option<String> {
        self.id
            .clone()
            .or_else(|| {
                self.name
                    .as_deref()
                    .map(|n| n.trim_start_matches("places/").to_string())
            })
            .filter(|id| !id.is_empty())
    }

    fn lat_lng(&self) -> Option<LatLng> {
        self.location
            .as_ref()
            .map(|l| LatLng::new(l.latitude, l.longitude))
    }

    fn into_record(self) -> PlaceRecord {
        let place_id = self.place_id().unwrap_or_default();
        let location = self.lat_lng();
        PlaceRecord {
            place_id,
            name: self.display_name.and_then(|d| d.text),
            address: self.formatted_address,
            location,
            types: self.types,
            primary_type: self.primary_type,
            business_status: self.business_status,
            rating: self.rating,
            user_rating_count: self.user_rating_count,
            national_phone: self.national_phone_number,
            international_phone: self.international_phone_number,
            website: self.website_uri,
            google_maps_uri: self.google_maps_uri,
            price_level: self.price_level,
            opening_hours: self
                .regular_opening_hours
                .map(|h| h.weekday_descriptions)
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeEntry>,
}

#[derive(Debug, Deserialize)]
struct GeocodeEntry {
    formatted_address: Option<String>,
    geometry: GeocodeGeometry,
}

#[derive(Debug, Deserialize)]
struct GeocodeGeometry {
    location: GeoPoint,
    viewport: Option<GeocodeViewport>,
}

#[derive(Debug, Deserialize)]
struct GeoPoint {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct GeocodeViewport {
    northeast: GeoPoint,
    southwest: GeoPoint,
}

impl GeocodeViewport {
    /// Converts to `Bounds`, or `None` for a viewport that crosses the
    /// antimeridian (west edge east of the east edge)
    fn into_bounds(self, location: &str) -> Option<Bounds> {
        if self.southwest.lng > self.northeast.lng {
            tracing::warn!(
                location,
                west = self.southwest.lng,
                east = self.northeast.lng,
                "viewport crosses the antimeridian, searching around the center only"
            );
            return None;
        }
        Some(Bounds::from_corners(
            LatLng::new(self.southwest.lat, self.southwest.lng),
            LatLng::new(self.northeast.lat, self.northeast.lng),
        ))
    }
}

impl GeocodeResponse {
    fn into_result(self, location: &str) -> ApiResult<GeocodeResult> {
        let detail = self
            .error_message
            .clone()
            .unwrap_or_else(|| self.status.clone());
        match self.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Err(ApiError::NotFound(location.to_string())),
            "REQUEST_DENIED" => {
                return Err(ApiError::Unauthorized {
                    service: GEOCODE_SERVICE,
                    status: 200,
                    message: detail,
                })
            }
            "OVER_QUERY_LIMIT" => {
                return Err(ApiError::RateLimited {
                    service: GEOCODE_SERVICE,
                })
            }
            "UNKNOWN_ERROR" => {
                return Err(ApiError::Server {
                    service: GEOCODE_SERVICE,
                    status: 200,
                })
            }
            _ => {
                return Err(ApiError::UnexpectedStatus {
                    service: GEOCODE_SERVICE,
                    status: 200,
                    message: detail,
                })
            }
        }

        let entry = self
            .results
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::NotFound(location.to_string()))?;
        let geometry = entry.geometry;
        Ok(GeocodeResult {
            center: LatLng::new(geometry.location.lat, geometry.location.lng),
            viewport: geometry.viewport.and_then(|vp| vp.into_bounds(location)),
            formatted_address: entry.formatted_address,
        })
    }
}

#[async_trait]
impl PlacesApi for GoogleMapsClient {
    async fn search_places(&self, request: &SearchRequest) -> ApiResult<SearchPage> {
        let url = format!("{}/places:searchText", self.places_url);
        let response = self
            .http
            .post(&url)
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", SEARCH_FIELD_MASK)
            .json(&search_body(request))
            .send()
            .await?;

        let data: SearchTextResponse = Self::read_json(PLACES_SERVICE, response).await?;
        let results = data
            .places
            .iter()
            .filter_map(|place| {
                Some(SearchHit {
                    place_id: place.place_id()?,
                    location: place.lat_lng(),
                })
            })
            .collect();

        Ok(SearchPage {
            results,
            next_page_token: data.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    async fn fetch_place_details(
        &self,
        place_id: &str,
        attributes: &AttributeSet,
    ) -> ApiResult<PlaceRecord> {
        let url = format!("{}/places/{}", self.places_url, place_id);
        let response = self
            .http
            .get(&url)
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", attributes.field_mask().join(","))
            .send()
            .await?;

        let place: PlaceResource = Self::read_json(PLACES_SERVICE, response).await?;
        let mut record = place.into_record();
        if record.place_id.is_empty() {
            record.place_id = place_id.to_string();
        }
        Ok(record)
    }
}

#[async_trait]
impl Geocoder for GoogleMapsClient {
    async fn geocode(
        &self,
        location: &str,
        language_code: Option<&str>,
    ) -> ApiResult<GeocodeResult> {
        let mut query = vec![("address", location), ("key", self.api_key.as_str())];
        if let Some(language) = language_code {
            query.push(("language", language));
        }

        let response = self
            .http
            .get(&self.geocode_url)
            .query(&query)
            .send()
            .await?;

        let data: GeocodeResponse = Self::read_json(GEOCODE_SERVICE, response).await?;
        data.into_result(location)
    }
}

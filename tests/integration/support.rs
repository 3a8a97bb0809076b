//! In-memory stand-ins for the remote services

use async_trait::async_trait;
use poi_sweep::area::{Boundary, Bounds, LatLng};
use poi_sweep::config::Config;
use poi_sweep::places::{
    AttributeSet, BoundarySource, GeocodeResult, Geocoder, PlaceRecord, PlacesApi, SearchHit,
    SearchPage, SearchRegion, SearchRequest,
};
use poi_sweep::{ApiError, ApiResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Most results the fake search endpoint returns for one query
pub const API_CAP: usize = 60;

/// A config that runs fast against the fakes
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.api.key = Some("test-key".to_string());
    config.crawl.keywords = "coffee".to_string();
    config.crawl.location = "Testville".to_string();
    config.crawl.min_cell_span = 0.0;
    config.runtime.max_concurrent_requests = 1;
    config.runtime.max_retries = 1;
    config.runtime.backoff_base_ms = 1;
    config.runtime.page_delay_ms = 0;
    config
}

pub fn unit_square() -> Bounds {
    Bounds::from_corners(LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0))
}

pub enum GeocodeBehavior {
    Found(GeocodeResult),
    Missing,
}

pub struct FakeGeocoder {
    behavior: GeocodeBehavior,
    pub calls: AtomicUsize,
}

impl FakeGeocoder {
    pub fn viewport(bounds: Bounds) -> Self {
        Self {
            behavior: GeocodeBehavior::Found(GeocodeResult {
                center: bounds.center(),
                viewport: Some(bounds),
                formatted_address: Some("Testville".to_string()),
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn missing() -> Self {
        Self {
            behavior: GeocodeBehavior::Missing,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn geocode(&self, location: &str, _language: Option<&str>) -> ApiResult<GeocodeResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            GeocodeBehavior::Found(result) => Ok(result.clone()),
            GeocodeBehavior::Missing => Err(ApiError::NotFound(location.to_string())),
        }
    }
}

pub enum FakeBoundary {
    Shape(Boundary),
    Unavailable,
}

#[async_trait]
impl BoundarySource for FakeBoundary {
    async fn fetch_boundary(&self, _location: &str) -> ApiResult<Option<Boundary>> {
        match self {
            FakeBoundary::Shape(boundary) => Ok(Some(boundary.clone())),
            FakeBoundary::Unavailable => Err(ApiError::UnexpectedStatus {
                service: "boundary",
                status: 418,
                message: "unavailable".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FakePlace {
    pub id: String,
    pub location: LatLng,
    pub place_type: String,
}

/// A search endpoint over a fixed set of places
///
/// Returns the places inside the requested rectangle (edges inclusive), in
/// insertion order, 20 per page and never more than `API_CAP` per query.
pub struct FakePlaces {
    places: Vec<FakePlace>,
    missing_details: Vec<String>,
    reject_searches: bool,
    pub searches: Mutex<Vec<SearchRequest>>,
    pub detail_calls: Mutex<HashMap<String, usize>>,
}

impl FakePlaces {
    pub fn new(places: Vec<FakePlace>) -> Self {
        Self {
            places,
            missing_details: Vec::new(),
            reject_searches: false,
            searches: Mutex::new(Vec::new()),
            detail_calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_missing_details(mut self, ids: &[&str]) -> Self {
        self.missing_details = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn rejecting_key(mut self) -> Self {
        self.reject_searches = true;
        self
    }

    /// Queries issued, counting each (cell, type) query once
    pub fn query_count(&self) -> usize {
        self.searches
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.page_token.is_none())
            .count()
    }

    pub fn detail_calls_for(&self, id: &str) -> usize {
        self.detail_calls
            .lock()
            .unwrap()
            .get(id)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_detail_calls(&self) -> usize {
        self.detail_calls.lock().unwrap().values().sum()
    }

    fn location_of(&self, id: &str) -> Option<LatLng> {
        self.places
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.location)
    }
}

#[async_trait]
impl PlacesApi for FakePlaces {
    async fn search_places(&self, request: &SearchRequest) -> ApiResult<SearchPage> {
        self.searches.lock().unwrap().push(request.clone());
        if self.reject_searches {
            return Err(ApiError::Unauthorized {
                service: "places",
                status: 403,
                message: "API key not valid".to_string(),
            });
        }

        let matching: Vec<&FakePlace> = self
            .places
            .iter()
            .filter(|p| match request.region {
                SearchRegion::Rectangle(bounds) => bounds.contains(p.location),
                SearchRegion::Circle { .. } => true,
            })
            .filter(|p| match &request.included_type {
                Some(t) => &p.place_type == t,
                None => true,
            })
            .take(API_CAP)
            .collect();

        let start: usize = request
            .page_token
            .as_deref()
            .map(|t| t.parse().unwrap())
            .unwrap_or(0);
        let end = (start + request.page_size as usize).min(matching.len());
        let results = matching[start..end]
            .iter()
            .map(|p| SearchHit {
                place_id: p.id.clone(),
                location: Some(p.location),
            })
            .collect();

        Ok(SearchPage {
            results,
            next_page_token: (end < matching.len()).then(|| end.to_string()),
        })
    }

    async fn fetch_place_details(
        &self,
        place_id: &str,
        _attributes: &AttributeSet,
    ) -> ApiResult<PlaceRecord> {
        *self
            .detail_calls
            .lock()
            .unwrap()
            .entry(place_id.to_string())
            .or_insert(0) += 1;

        if self.missing_details.iter().any(|m| m == place_id) {
            return Err(ApiError::NotFound(place_id.to_string()));
        }

        let mut record = PlaceRecord::new(place_id);
        record.name = Some(format!("Place {}", place_id));
        record.location = self.location_of(place_id);
        Ok(record)
    }
}

/// A 10×10 lattice of places across the unit square, alternating between
/// cafés and restaurants, plus one place "X" exactly at the centre
pub fn lattice_with_center() -> Vec<FakePlace> {
    let mut places = Vec::new();
    for i in 0..10 {
        for j in 0..10 {
            places.push(FakePlace {
                id: format!("p{}{}", i, j),
                location: LatLng::new(0.05 + 0.1 * i as f64, 0.05 + 0.1 * j as f64),
                place_type: if (i + j) % 2 == 0 { "cafe" } else { "restaurant" }.to_string(),
            });
        }
    }
    places.push(FakePlace {
        id: "X".to_string(),
        location: LatLng::new(0.5, 0.5),
        place_type: "cafe".to_string(),
    });
    places
}

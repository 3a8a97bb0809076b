//! Geographic area module
//!
//! This module provides the geometry the crawl works on:
//! - `LatLng` and `Bounds` primitives
//! - `Cell`, the rectangular search unit and its 2×2 subdivision
//! - `Boundary` and `BoundaryFilter` for polygon-constrained crawls
//! - `Area`, the immutable description of what a crawl covers

mod boundary;
mod cell;

pub use boundary::{Boundary, BoundaryFilter};
pub use cell::Cell;

use serde::{Deserialize, Serialize};

/// A WGS84 coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// An axis-aligned lat/lng rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// Creates bounds from two corners in any order
    pub fn from_corners(a: LatLng, b: LatLng) -> Self {
        Self {
            south: a.lat.min(b.lat),
            west: a.lng.min(b.lng),
            north: a.lat.max(b.lat),
            east: a.lng.max(b.lng),
        }
    }

    /// Latitude extent in degrees
    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    /// Longitude extent in degrees
    pub fn lng_span(&self) -> f64 {
        self.east - self.west
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    /// Corners in SW, SE, NE, NW order
    pub fn corners(&self) -> [LatLng; 4] {
        [
            LatLng::new(self.south, self.west),
            LatLng::new(self.south, self.east),
            LatLng::new(self.north, self.east),
            LatLng::new(self.north, self.west),
        ]
    }

    /// Returns true if the point lies inside or on the edge of the rectangle
    pub fn contains(&self, point: LatLng) -> bool {
        point.lat >= self.south
            && point.lat <= self.north
            && point.lng >= self.west
            && point.lng <= self.east
    }

    /// Returns true if both spans are at least `min_span` degrees
    pub fn spans_at_least(&self, min_span: f64) -> bool {
        self.lat_span() >= min_span && self.lng_span() >= min_span
    }

    pub(crate) fn to_rect(self) -> geo::Rect<f64> {
        geo::Rect::new(
            geo::coord! { x: self.west, y: self.south },
            geo::coord! { x: self.east, y: self.north },
        )
    }
}

/// The area a crawl covers, derived once from the geocode result
///
/// When a boundary polygon is attached, searching is restricted to the
/// polygon's bounding box and results are post-filtered to the exact shape.
#[derive(Debug, Clone)]
pub struct Area {
    /// Geocoded center of the location
    pub center: LatLng,

    /// Viewport returned by the geocoder
    pub viewport: Bounds,

    /// Optional administrative outline
    pub boundary: Option<Boundary>,

    /// True when the viewport is too small to grid (a single address or venue)
    pub point_like: bool,
}

impl Area {
    /// Builds an area from a geocoded center and optional viewport
    ///
    /// A missing viewport, or one narrower than `min_viewport_span` degrees in
    /// either axis, makes the area point-like.
    pub fn new(center: LatLng, viewport: Option<Bounds>, min_viewport_span: f64) -> Self {
        match viewport {
            Some(viewport) => Self {
                center,
                viewport,
                boundary: None,
                point_like: !viewport.spans_at_least(min_viewport_span),
            },
            None => Self {
                center,
                viewport: Bounds::from_corners(center, center),
                boundary: None,
                point_like: true,
            },
        }
    }

    /// Attaches a boundary polygon
    pub fn with_boundary(mut self, boundary: Boundary) -> Self {
        self.boundary = Some(boundary);
        self
    }

    /// Rectangle the root cell spans: the boundary's bounding box when a
    /// boundary is attached, else the viewport
    pub fn search_bounds(&self) -> Bounds {
        self.boundary
            .as_ref()
            .map(Boundary::bounding_box)
            .unwrap_or(self.viewport)
    }

    /// Filter for the attached boundary (a pass-all filter when there is none)
    pub fn boundary_filter(&self) -> BoundaryFilter {
        BoundaryFilter::new(self.boundary.clone())
    }
}

//! Boundary polygons and the spatial filter built on them
//!
//! Boundaries come from administrative outlines (GeoJSON `Polygon` or
//! `MultiPolygon`). Only exterior rings are kept; holes are ignored, so a
//! point inside an enclave still counts as inside.

use crate::area::{Bounds, LatLng};
use geo::{BoundingRect, Contains, Intersects, LineString, MultiPolygon, Point, Polygon};
use serde_json::Value;
use std::sync::Arc;

/// An area outline made of one or more exterior rings
#[derive(Debug, Clone)]
pub struct Boundary {
    shape: Arc<MultiPolygon<f64>>,
    bbox: Bounds,
}

impl Boundary {
    /// Builds a boundary from rings of lat/lng vertices
    ///
    /// Rings with fewer than three vertices are skipped. Returns `None` if no
    /// usable ring remains.
    pub fn from_rings(rings: Vec<Vec<LatLng>>) -> Option<Self> {
        let polygons: Vec<Polygon<f64>> = rings
            .into_iter()
            .filter(|ring| ring.len() >= 3)
            .map(|ring| {
                let exterior: LineString<f64> = ring.iter().map(|p| (p.lng, p.lat)).collect();
                Polygon::new(exterior, vec![])
            })
            .collect();

        if polygons.is_empty() {
            return None;
        }

        let shape = MultiPolygon::new(polygons);
        let rect = shape.bounding_rect()?;
        let bbox = Bounds {
            south: rect.min().y,
            west: rect.min().x,
            north: rect.max().y,
            east: rect.max().x,
        };

        Some(Self {
            shape: Arc::new(shape),
            bbox,
        })
    }

    /// Parses a GeoJSON geometry object (`[lng, lat]` coordinate order)
    ///
    /// Accepts `Polygon` and `MultiPolygon`; anything else yields `None`.
    pub fn from_geojson(geometry: &Value) -> Option<Self> {
        let coordinates = geometry.get("coordinates")?;
        let rings = match geometry.get("type")?.as_str()? {
            "Polygon" => vec![parse_ring(coordinates.get(0)?)?],
            "MultiPolygon" => coordinates
                .as_array()?
                .iter()
                .filter_map(|polygon| parse_ring(polygon.get(0)?))
                .collect(),
            _ => return None,
        };
        Self::from_rings(rings)
    }

    /// Bounding box of all rings
    pub fn bounding_box(&self) -> Bounds {
        self.bbox
    }

    /// Number of exterior rings
    pub fn ring_count(&self) -> usize {
        self.shape.0.len()
    }

    /// Returns true if the point lies strictly inside any ring
    pub fn contains(&self, point: LatLng) -> bool {
        let point = Point::new(point.lng, point.lat);
        self.shape.0.iter().any(|polygon| polygon.contains(&point))
    }

    /// Returns true if the rectangle touches any ring
    ///
    /// Covers edge crossings, rectangle corners inside a ring and rings lying
    /// wholly inside the rectangle. A rectangle whose center is inside a ring
    /// is also accepted, which keeps tiny cells from slipping through on
    /// simplified outlines.
    pub fn intersects(&self, bounds: &Bounds) -> bool {
        if !rects_overlap(&self.bbox, bounds) {
            return false;
        }
        let rect = bounds.to_rect();
        self.shape.0.iter().any(|polygon| polygon.intersects(&rect))
            || self.contains(bounds.center())
    }
}

fn rects_overlap(a: &Bounds, b: &Bounds) -> bool {
    a.south <= b.north && b.south <= a.north && a.west <= b.east && b.west <= a.east
}

fn parse_ring(ring: &Value) -> Option<Vec<LatLng>> {
    ring.as_array()?
        .iter()
        .map(|position| {
            let lng = position.get(0)?.as_f64()?;
            let lat = position.get(1)?.as_f64()?;
            Some(LatLng::new(lat, lng))
        })
        .collect()
}

/// Spatial filter over an optional boundary
///
/// Without a boundary every cell intersects and every point is contained, so
/// the crawl degrades to a plain bounding-box sweep.
#[derive(Debug, Clone, Default)]
pub struct BoundaryFilter {
    boundary: Option<Boundary>,
}

impl BoundaryFilter {
    pub fn new(boundary: Option<Boundary>) -> Self {
        Self { boundary }
    }

    /// A filter that accepts everything
    pub fn pass_all() -> Self {
        Self::default()
    }

    pub fn has_boundary(&self) -> bool {
        self.boundary.is_some()
    }

    /// Returns true if the cell rectangle should be searched
    pub fn intersects(&self, bounds: &Bounds) -> bool {
        match &self.boundary {
            Some(boundary) => boundary.intersects(bounds),
            None => true,
        }
    }

    /// Returns true if the point is inside the boundary
    pub fn contains_point(&self, point: LatLng) -> bool {
        match &self.boundary {
            Some(boundary) => boundary.contains(point),
            None => true,
        }
    }
}

//! Place deduplication across overlapping cells and type passes

use crate::area::BoundaryFilter;
use crate::places::SearchHit;
use std::collections::HashSet;

/// Collects unique places keyed by exact place ID
///
/// The first sighting wins: its position fixes the output order and its
/// coordinate is the one kept.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
    places: Vec<SearchHit>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a hit, returning true if its ID was new
    pub fn insert(&mut self, hit: SearchHit) -> bool {
        if !self.seen.insert(hit.place_id.clone()) {
            return false;
        }
        self.places.push(hit);
        true
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    pub fn into_places(self) -> Vec<SearchHit> {
        self.places
    }

    /// Merges result sets into unique places in first-encounter order
    pub fn merge<I, S>(result_sets: I) -> Vec<SearchHit>
    where
        I: IntoIterator<Item = S>,
        S: IntoIterator<Item = SearchHit>,
    {
        let mut dedup = Self::new();
        for hit in result_sets.into_iter().flatten() {
            dedup.insert(hit);
        }
        dedup.into_places()
    }
}

/// Keeps only places inside the boundary, returning them with the number
/// dropped
///
/// Without a boundary nothing is dropped. With one, places that carry no
/// coordinate cannot be placed and are dropped too.
pub fn filter_to_boundary(
    places: Vec<SearchHit>,
    filter: &BoundaryFilter,
) -> (Vec<SearchHit>, usize) {
    if !filter.has_boundary() {
        return (places, 0);
    }

    let before = places.len();
    let kept: Vec<SearchHit> = places
        .into_iter()
        .filter(|hit| match hit.location {
            Some(point) => filter.contains_point(point),
            None => false,
        })
        .collect();
    let dropped = before - kept.len();
    if dropped > 0 {
        tracing::debug!(dropped, kept = kept.len(), "dropped places outside boundary");
    }
    (kept, dropped)
}

//! Administrative boundary lookup against a Nominatim-compatible service
//!
//! Nominatim asks clients to stay under one request per second and to send
//! an identifying User-Agent, so calls through one client are spaced by a
//! configurable delay.

use crate::area::Boundary;
use crate::places::api::BoundarySource;
use crate::places::client::classify_status;
use crate::{ApiError, ApiResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const SERVICE: &str = "boundary";

/// Result `type` values that describe an administrative area
const ADMIN_TYPES: &[&str] = &[
    "administrative",
    "city",
    "town",
    "village",
    "municipality",
    "place",
    "state",
    "county",
];

#[derive(Debug, Deserialize)]
struct SearchEntry {
    #[serde(default)]
    class: String,
    #[serde(default, rename = "type")]
    kind: String,
    geojson: Option<Value>,
}

impl SearchEntry {
    fn is_admin(&self) -> bool {
        self.class == "boundary" || ADMIN_TYPES.contains(&self.kind.as_str())
    }

    fn boundary(&self) -> Option<Boundary> {
        self.geojson.as_ref().and_then(Boundary::from_geojson)
    }
}

/// Picks the outline to use from a list of search results
///
/// Administrative results win over any other polygon; results without a
/// usable polygon are skipped.
fn select_boundary(entries: &[SearchEntry]) -> Option<Boundary> {
    entries
        .iter()
        .filter(|e| e.is_admin())
        .find_map(SearchEntry::boundary)
        .or_else(|| entries.iter().find_map(SearchEntry::boundary))
}

pub struct NominatimClient {
    http: Client,
    search_url: String,
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl NominatimClient {
    /// `http` should carry an identifying User-Agent
    pub fn new(http: Client, search_url: impl Into<String>, min_interval: Duration) -> Self {
        Self {
            http,
            search_url: search_url.into(),
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    async fn wait_turn(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[async_trait]
impl BoundarySource for NominatimClient {
    async fn fetch_boundary(&self, location: &str) -> ApiResult<Option<Boundary>> {
        self.wait_turn().await;

        let response = self
            .http
            .get(&self.search_url)
            .query(&[
                ("q", location),
                ("format", "json"),
                ("polygon_geojson", "1"),
                ("limit", "10"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(SERVICE, status, &body));
        }

        let entries: Vec<SearchEntry> = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(format!("boundary response: {}", e)))?;

        let boundary = select_boundary(&entries);
        match &boundary {
            Some(b) => tracing::debug!(location, rings = b.ring_count(), "boundary found"),
            None => tracing::debug!(location, results = entries.len(), "no boundary polygon"),
        }
        Ok(boundary)
    }
}

//! Minimal-field search adapter
//!
//! Runs the cheap discovery phase for one cell: one query per type filter,
//! following page cursors until the API stops returning them or the page
//! budget is spent. The raw count across all pages decides whether the cell
//! hit the API cap.

use crate::config::CrawlConfig;
use crate::places::api::PlacesApi;
use crate::places::gateway::RequestGate;
use crate::places::types::{SearchHit, SearchRegion, SearchRequest, TypeFilter};
use crate::ApiResult;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of one (cell, type) query
#[derive(Debug, Clone)]
pub struct CellQuery {
    /// Which type pass produced these hits
    pub type_filter: TypeFilter,

    /// Hits across all pages, in API order
    pub hits: Vec<SearchHit>,

    /// Pages requested
    pub pages: u32,

    /// True when the raw count reached the page cap
    pub capped: bool,
}

impl CellQuery {
    /// Number of results the API returned before any dedup
    pub fn raw_count(&self) -> usize {
        self.hits.len()
    }
}

/// Settings shared by every search query of a crawl
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub text_query: String,
    pub page_size: u32,
    pub max_pages: u32,
    pub page_cap: usize,
    pub language_code: Option<String>,
    pub region_code: Option<String>,
    pub page_delay: Duration,
}

impl SearchSettings {
    /// Builds settings for a `"{keywords} in {location}"` query
    pub fn from_config(config: &CrawlConfig, page_delay: Duration) -> Self {
        Self {
            text_query: format!("{} in {}", config.keywords.trim(), config.location.trim()),
            page_size: config.page_size,
            max_pages: config.max_pages,
            page_cap: config.page_cap,
            language_code: non_empty(&config.language_code),
            region_code: non_empty(&config.region_code),
            page_delay,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Wraps the search endpoint for per-cell queries
pub struct SearchClient {
    api: Arc<dyn PlacesApi>,
    gate: RequestGate,
    settings: SearchSettings,
}

impl SearchClient {
    pub fn new(api: Arc<dyn PlacesApi>, gate: RequestGate, settings: SearchSettings) -> Self {
        Self {
            api,
            gate,
            settings,
        }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Runs one query per type filter against `region`
    ///
    /// Stops at the first failed query: a cell either yields every type
    /// pass or none.
    pub async fn search_cell(
        &self,
        region: SearchRegion,
        type_filters: &[TypeFilter],
    ) -> ApiResult<Vec<CellQuery>> {
        let mut queries = Vec::with_capacity(type_filters.len());
        for type_filter in type_filters {
            queries.push(self.search_type(region, type_filter).await?);
        }
        Ok(queries)
    }

    /// Runs a single paginated query
    pub async fn search_type(
        &self,
        region: SearchRegion,
        type_filter: &TypeFilter,
    ) -> ApiResult<CellQuery> {
        let mut request = SearchRequest {
            text_query: self.settings.text_query.clone(),
            region,
            included_type: type_filter.included_type().map(str::to_string),
            page_token: None,
            page_size: self.settings.page_size,
            language_code: self.settings.language_code.clone(),
            region_code: self.settings.region_code.clone(),
        };

        let mut hits = Vec::new();
        let mut pages = 0;

        while pages < self.settings.max_pages {
            if pages > 0 && !self.settings.page_delay.is_zero() {
                tokio::time::sleep(self.settings.page_delay).await;
            }

            let page = self
                .gate
                .call("search", || self.api.search_places(&request))
                .await?;
            pages += 1;

            tracing::debug!(
                type_filter = %type_filter,
                page = pages,
                results = page.results.len(),
                "search page received"
            );
            hits.extend(page.results);

            match page.next_page_token {
                Some(token) if !token.is_empty() => request.page_token = Some(token),
                _ => break,
            }
        }

        let capped = hits.len() >= self.settings.page_cap;
        Ok(CellQuery {
            type_filter: type_filter.clone(),
            hits,
            pages,
            capped,
        })
    }
}

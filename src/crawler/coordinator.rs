//! Crawl orchestration
//!
//! Ties the phases of one crawl together:
//! - Geocoding the location into an `Area`
//! - Optional boundary lookup (a failure degrades to a bounding-box crawl)
//! - The adaptive grid sweep
//! - Deduplication and boundary filtering
//! - One detail fetch per unique place

use crate::area::Area;
use crate::config::{validate_request, Config};
use crate::crawler::dedup::{filter_to_boundary, Deduplicator};
use crate::crawler::progress::{
    CrawlFailure, CrawlProgress, CrawlStage, FailureKind, ProgressSink, TracingProgress,
};
use crate::crawler::scheduler::{CellRecord, GridScheduler, SchedulerSettings};
use crate::places::{
    build_http_client, BoundarySource, DetailFetcher, Geocoder, GoogleMapsClient,
    NominatimClient, PlaceRecord, PlacesApi, RequestGate, SearchClient, SearchHit,
    SearchSettings, TypeFilter,
};
use crate::state::{CancellationFlag, CellState};
use crate::{ConfigError, CrawlError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of a crawl, complete or partial
#[derive(Debug)]
pub struct CrawlReport {
    /// The query text sent to the search endpoint
    pub text_query: String,

    pub area: Area,

    /// Unique places discovered, after boundary filtering, in discovery order
    pub places: Vec<SearchHit>,

    /// Detail records in the same order as `places`
    ///
    /// If the run was cancelled before the detail phase these carry only the
    /// place ID and coordinate.
    pub records: Vec<PlaceRecord>,

    pub cells: Vec<CellRecord>,
    pub failures: Vec<CrawlFailure>,

    /// Search hits before dedup
    pub raw_hits: usize,

    /// Unique places dropped for lying outside the boundary
    pub outside_boundary: usize,

    pub search_pages: u32,
    pub detail_calls: usize,
    pub cancelled: bool,
    pub budget_reached: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlReport {
    pub fn cells_in(&self, state: CellState) -> usize {
        self.cells.iter().filter(|c| c.state == state).count()
    }

    /// True if every detail was fetched and no cell failed
    pub fn is_complete(&self) -> bool {
        !self.cancelled
            && self
                .failures
                .iter()
                .all(|f| matches!(f.kind, FailureKind::Boundary | FailureKind::Hint))
    }
}

/// Runs one crawl from configuration to detail records
pub struct CrawlOrchestrator {
    config: Config,
    geocoder: Arc<dyn Geocoder>,
    places: Arc<dyn PlacesApi>,
    boundary_source: Option<Arc<dyn BoundarySource>>,
    progress: Arc<dyn ProgressSink>,
    cancel: CancellationFlag,
    gate: RequestGate,
}

impl CrawlOrchestrator {
    /// Creates an orchestrator over the given services
    ///
    /// No boundary source is attached; see `with_boundary_source`.
    pub fn new(config: Config, geocoder: Arc<dyn Geocoder>, places: Arc<dyn PlacesApi>) -> Self {
        let gate = RequestGate::from_config(&config.runtime);
        Self {
            config,
            geocoder,
            places,
            boundary_source: None,
            progress: Arc::new(TracingProgress),
            cancel: CancellationFlag::new(),
            gate,
        }
    }

    /// Builds an orchestrator backed by Google Maps Platform and Nominatim
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOrchestrator)` - Ready to run
    /// * `Err(CrawlError)` - Invalid configuration or HTTP client failure
    pub fn from_config(config: Config) -> Result<Self, CrawlError> {
        validate_request(&config)?;
        let api_key = config
            .api
            .key
            .clone()
            .ok_or(ConfigError::MissingApiKey)?;

        let http = build_http_client(
            &config.api.user_agent,
            Duration::from_secs(config.runtime.request_timeout_secs),
        )
        .map_err(|e| CrawlError::Api(e.into()))?;

        let google = Arc::new(GoogleMapsClient::new(http.clone(), api_key, &config.api));
        let boundary: Option<Arc<dyn BoundarySource>> = if config.crawl.use_boundary {
            Some(Arc::new(NominatimClient::new(
                http,
                config.api.boundary_url.clone(),
                Duration::from_millis(config.runtime.boundary_delay_ms),
            )))
        } else {
            None
        };

        let mut orchestrator = Self::new(config, google.clone(), google);
        orchestrator.boundary_source = boundary;
        Ok(orchestrator)
    }

    pub fn with_boundary_source(mut self, source: Arc<dyn BoundarySource>) -> Self {
        self.boundary_source = Some(source);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Uses `cancel` as the stop signal for this orchestrator's runs
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn stage(&self, stage: CrawlStage) {
        self.enter(CrawlProgress::at(stage));
    }

    /// Announces a stage, carrying the counters gathered so far
    fn enter(&self, progress: CrawlProgress) {
        tracing::info!(stage = %progress.stage, "crawl stage");
        self.progress.progress(&progress);
    }

    fn warn(&self, failures: &mut Vec<CrawlFailure>, failure: CrawlFailure) {
        self.progress.warning(&failure);
        failures.push(failure);
    }

    /// Geocodes the location and attaches a boundary when one is available
    async fn resolve_area(&self, failures: &mut Vec<CrawlFailure>) -> Result<Area, CrawlError> {
        let crawl = &self.config.crawl;
        let location = crawl.location.trim();
        let language = crawl.language_code.as_deref().filter(|l| !l.is_empty());

        self.stage(CrawlStage::Geocoding);
        let geocoded = match self
            .gate
            .call("geocode", || self.geocoder.geocode(location, language))
            .await
        {
            Ok(result) => result,
            Err(err) if err.is_fatal() => return Err(CrawlError::Api(err)),
            Err(err) => {
                return Err(CrawlError::Geocode {
                    location: location.to_string(),
                    reason: err.to_string(),
                })
            }
        };

        let area = Area::new(geocoded.center, geocoded.viewport, crawl.min_viewport_span);
        tracing::info!(
            location,
            resolved = geocoded.formatted_address.as_deref().unwrap_or(""),
            center = ?area.center,
            point_like = area.point_like,
            "location geocoded"
        );

        let source = match &self.boundary_source {
            Some(source) if crawl.use_boundary && !area.point_like => source,
            _ => return Ok(area),
        };

        self.stage(CrawlStage::Boundary);
        match self
            .gate
            .call("boundary", || source.fetch_boundary(location))
            .await
        {
            Ok(Some(boundary)) => {
                tracing::info!(rings = boundary.ring_count(), "using boundary polygon");
                Ok(area.with_boundary(boundary))
            }
            Ok(None) => {
                tracing::info!(location, "no boundary polygon found, using viewport");
                Ok(area)
            }
            Err(err) => {
                self.warn(
                    failures,
                    CrawlFailure::new(
                        FailureKind::Boundary,
                        location,
                        format!("boundary lookup failed, crawling bounding box: {}", err),
                    ),
                );
                Ok(area)
            }
        }
    }

    /// Runs the crawl
    ///
    /// Cancellation is not an error: the report carries whatever was gathered
    /// with `cancelled` set. Only invalid configuration, a failed geocode and
    /// fatal API errors fail the run.
    pub async fn run(&self) -> Result<CrawlReport, CrawlError> {
        validate_request(&self.config)?;

        let started_at = Utc::now();
        let crawl = &self.config.crawl;
        let concurrency = self.config.runtime.max_concurrent_requests as usize;
        let mut failures = Vec::new();

        let area = self.resolve_area(&mut failures).await?;

        let settings = SearchSettings::from_config(
            crawl,
            Duration::from_millis(self.config.runtime.page_delay_ms),
        );
        let text_query = settings.text_query.clone();
        let search = Arc::new(SearchClient::new(
            Arc::clone(&self.places),
            self.gate.clone(),
            settings,
        ));
        let scheduler = GridScheduler::new(search, SchedulerSettings::from_config(crawl, concurrency));
        let type_filters = TypeFilter::list_from(&crawl.primary_types);

        self.stage(CrawlStage::Sweeping);
        let sweep = scheduler
            .run(&area, &type_filters, &self.cancel, self.progress.as_ref())
            .await?;

        let swept = sweep.progress();
        let raw_hits = sweep.results.iter().map(|r| r.hits.len()).sum();
        failures.extend(sweep.failures);
        let places = Deduplicator::merge(sweep.results.into_iter().map(|r| r.hits));
        let (places, outside_boundary) = filter_to_boundary(places, &area.boundary_filter());
        tracing::info!(
            raw_hits,
            unique = places.len(),
            outside_boundary,
            "discovery finished"
        );

        let mut cancelled = sweep.cancelled || self.cancel.is_cancelled();
        let mut detail_calls = 0;
        let mut counters = CrawlProgress {
            unique_found: places.len(),
            details_total: places.len(),
            ..swept
        };
        let records = if cancelled {
            tracing::warn!("crawl cancelled, skipping detail fetch");
            places
                .iter()
                .map(|hit| PlaceRecord {
                    location: hit.location,
                    ..PlaceRecord::new(hit.place_id.clone())
                })
                .collect()
        } else {
            counters.stage = CrawlStage::Details;
            self.enter(counters);
            let ids: Vec<String> = places.iter().map(|p| p.place_id.clone()).collect();
            let fetcher = DetailFetcher::new(Arc::clone(&self.places), self.gate.clone(), concurrency);
            let outcome = fetcher
                .fetch_details(&ids, &self.config.attributes, &self.cancel, |done| {
                    counters.details_fetched = done;
                    self.progress.progress(&counters);
                })
                .await?;

            for (place_id, err) in outcome.failures {
                self.warn(
                    &mut failures,
                    CrawlFailure::new(FailureKind::Detail, place_id, err.to_string()),
                );
            }
            detail_calls = outcome.calls;
            cancelled |= outcome.cancelled;
            outcome.records
        };

        if places.is_empty() && failures.is_empty() && !cancelled {
            self.warn(
                &mut failures,
                CrawlFailure::new(
                    FailureKind::Hint,
                    text_query.clone(),
                    "no places found; check the keywords and that the Places API (New) is enabled for this key",
                ),
            );
        }

        counters.stage = CrawlStage::Done;
        self.enter(counters);
        let report = CrawlReport {
            text_query,
            area,
            places,
            records,
            cells: sweep.cells,
            failures,
            raw_hits,
            outside_boundary,
            search_pages: sweep.search_pages,
            detail_calls,
            cancelled,
            budget_reached: sweep.budget_reached,
            started_at,
            finished_at: Utc::now(),
        };

        tracing::info!(
            records = report.records.len(),
            detail_calls = report.detail_calls,
            failures = report.failures.len(),
            cancelled = report.cancelled,
            "crawl finished"
        );
        Ok(report)
    }
}

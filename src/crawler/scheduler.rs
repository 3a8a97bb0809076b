//! Adaptive grid scheduler
//!
//! This module drives the discovery sweep:
//! - A FIFO work queue of cells, seeded with one root cell
//! - Bounded parallel cell searches through a `JoinSet`
//! - Subdivision of capped cells into four quadrants
//! - Boundary pruning before a cell is ever queried
//! - Cooperative cancellation and the max-results budget
//!
//! The queue, the unique-ID set and the accumulated results are owned by the
//! single loop in `GridScheduler::run`. Worker tasks only perform the search
//! calls and hand their outcome back, so no lock is held across I/O. With a
//! concurrency of 1 cells are processed in strict breadth-first order.

use crate::area::{Area, BoundaryFilter, Cell};
use crate::config::CrawlConfig;
use crate::crawler::dedup::Deduplicator;
use crate::crawler::progress::{CrawlFailure, CrawlProgress, CrawlStage, FailureKind, ProgressSink};
use crate::places::{CellQuery, SearchClient, SearchHit, SearchRegion, TypeFilter};
use crate::state::{CancellationFlag, CellState};
use crate::{ApiError, ApiResult};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::task::{self, JoinSet};

/// Limits that shape the sweep
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerSettings {
    /// Deepest level a cell may be split to
    pub max_depth: u32,

    /// Cells narrower than this (degrees) are not split
    pub min_cell_span: f64,

    /// Stop once this many unique places are known
    pub max_results: Option<usize>,

    /// Cells searched at the same time
    pub concurrency: usize,

    /// Bias radius for point-like areas
    pub fallback_radius_m: f64,
}

impl SchedulerSettings {
    pub fn from_config(config: &CrawlConfig, concurrency: usize) -> Self {
        Self {
            max_depth: config.max_depth,
            min_cell_span: config.min_cell_span,
            max_results: config.max_results,
            concurrency: concurrency.max(1),
            fallback_radius_m: config.fallback_radius_m,
        }
    }
}

/// The hits of one (cell, type) query
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub cell: Cell,
    pub type_filter: TypeFilter,
    pub hits: Vec<SearchHit>,
}

/// Final state of one cell
#[derive(Debug, Clone, Serialize)]
pub struct CellRecord {
    pub cell: Cell,
    pub state: CellState,
    /// Results returned across all type passes, before dedup
    pub raw_count: usize,
}

/// Everything the sweep produced
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Result sets in arrival order; may contain the same place many times
    pub results: Vec<SearchResult>,

    /// Every cell that reached a terminal state
    pub cells: Vec<CellRecord>,

    /// Unique place IDs seen
    pub unique_found: usize,

    /// Cells that passed the boundary check and were queued
    pub cells_queued: usize,

    /// Search pages requested by successful cells
    pub search_pages: u32,

    pub failures: Vec<CrawlFailure>,

    /// Cancellation stopped the sweep early
    pub cancelled: bool,

    /// The max-results budget stopped the sweep early
    pub budget_reached: bool,
}

impl SweepReport {
    pub fn cells_in(&self, state: CellState) -> usize {
        self.cells.iter().filter(|c| c.state == state).count()
    }

    /// Sweep counters as a progress snapshot
    pub fn progress(&self) -> CrawlProgress {
        CrawlProgress {
            cells_queued: self.cells_queued,
            cells_done: self
                .cells
                .iter()
                .filter(|c| c.state != CellState::OutsideBoundary)
                .count(),
            unique_found: self.unique_found,
            ..CrawlProgress::at(CrawlStage::Sweeping)
        }
    }
}

/// Runs the adaptive subdivision sweep over an area
pub struct GridScheduler {
    search: Arc<SearchClient>,
    settings: SchedulerSettings,
}

/// Mutable sweep state owned by the coordinating loop
struct Sweep<'a> {
    report: SweepReport,
    unique: Deduplicator,
    queue: VecDeque<Cell>,
    filter: &'a BoundaryFilter,
    max_results: Option<usize>,
}

impl<'a> Sweep<'a> {
    fn new(filter: &'a BoundaryFilter, max_results: Option<usize>) -> Self {
        Self {
            report: SweepReport::default(),
            unique: Deduplicator::new(),
            queue: VecDeque::new(),
            filter,
            max_results,
        }
    }

    fn budget_reached(&self) -> bool {
        self.max_results.is_some_and(|max| self.unique.len() >= max)
    }

    /// Queues a cell if it touches the boundary, else records it as skipped
    fn push(&mut self, cell: Cell) {
        if self.filter.intersects(&cell.bounds) {
            self.queue.push_back(cell);
            self.report.cells_queued += 1;
        } else {
            tracing::trace!(depth = cell.depth, bounds = ?cell.bounds, "cell outside boundary");
            self.finish(cell, CellState::OutsideBoundary, 0);
        }
    }

    fn finish(&mut self, cell: Cell, state: CellState, raw_count: usize) {
        self.report.cells.push(CellRecord {
            cell,
            state,
            raw_count,
        });
    }

    /// Appends the hits of each query, truncating once the budget is spent
    fn accumulate(&mut self, cell: Cell, queries: Vec<CellQuery>) {
        for query in queries {
            let mut hits = Vec::with_capacity(query.hits.len());
            for hit in query.hits {
                if self.budget_reached() {
                    self.report.budget_reached = true;
                    break;
                }
                self.unique.insert(hit.clone());
                hits.push(hit);
            }
            self.report.results.push(SearchResult {
                cell,
                type_filter: query.type_filter,
                hits,
            });
        }
        self.report.unique_found = self.unique.len();
    }

    fn fail(&mut self, cell: Cell, err: &ApiError, progress: &dyn ProgressSink) {
        let failure = CrawlFailure::new(FailureKind::Cell, describe_cell(&cell), err.to_string());
        progress.warning(&failure);
        self.report.failures.push(failure);
        self.finish(cell, CellState::Failed, 0);
    }

    /// Records every cell still queued as cancelled
    fn drain_queue(&mut self) {
        while let Some(cell) = self.queue.pop_front() {
            self.finish(cell, CellState::Cancelled, 0);
        }
    }
}

impl GridScheduler {
    pub fn new(search: Arc<SearchClient>, settings: SchedulerSettings) -> Self {
        Self { search, settings }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Sweeps `area` with one query per type filter per cell
    ///
    /// Returns `Err` only for fatal errors (bad credentials); every other
    /// failure is recorded on the failed cell and the sweep continues.
    pub async fn run(
        &self,
        area: &Area,
        type_filters: &[TypeFilter],
        cancel: &CancellationFlag,
        progress: &dyn ProgressSink,
    ) -> ApiResult<SweepReport> {
        let filter = area.boundary_filter();
        let type_filters: Arc<[TypeFilter]> = Arc::from(type_filters.to_vec());
        let root = Cell::root(area.search_bounds());

        if area.point_like {
            return self.run_point(area, root, type_filters, cancel, progress).await;
        }

        let mut sweep = Sweep::new(&filter, self.settings.max_results);
        sweep.push(root);

        let mut in_flight: JoinSet<ApiResult<Vec<CellQuery>>> = JoinSet::new();
        let mut tasks: HashMap<task::Id, Cell> = HashMap::new();

        loop {
            while in_flight.len() < self.settings.concurrency {
                if cancel.is_cancelled() || sweep.budget_reached() {
                    break;
                }
                let Some(cell) = sweep.queue.pop_front() else {
                    break;
                };

                tracing::debug!(depth = cell.depth, bounds = ?cell.bounds, "searching cell");
                let search = Arc::clone(&self.search);
                let types = Arc::clone(&type_filters);
                let handle = in_flight.spawn(async move {
                    search
                        .search_cell(SearchRegion::Rectangle(cell.bounds), &types)
                        .await
                });
                tasks.insert(handle.id(), cell);
            }

            let Some(joined) = in_flight.join_next_with_id().await else {
                break;
            };

            let (task_id, result) = match joined {
                Ok((task_id, result)) => (task_id, result),
                Err(join_err) => {
                    tracing::error!(error = %join_err, "cell search task panicked");
                    let failed = ApiError::TaskFailed {
                        task: "cell search",
                        message: join_err.to_string(),
                    };
                    (join_err.id(), Err(failed))
                }
            };
            let Some(cell) = tasks.remove(&task_id) else {
                continue;
            };

            match result {
                Ok(queries) => self.handle_searched(&mut sweep, cell, queries),
                Err(err) if err.is_fatal() => {
                    tracing::error!(error = %err, "fatal error during sweep, aborting");
                    in_flight.abort_all();
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!(depth = cell.depth, bounds = ?cell.bounds, error = %err, "cell search failed");
                    sweep.fail(cell, &err, progress);
                }
            }

            progress.progress(&sweep.report.progress());
        }

        if cancel.is_cancelled() {
            sweep.report.cancelled = true;
        }
        if sweep.budget_reached() {
            sweep.report.budget_reached = true;
        }
        sweep.drain_queue();

        let report = sweep.report;
        tracing::info!(
            cells = report.cells.len(),
            subdivided = report.cells_in(CellState::Subdivided),
            unique = report.unique_found,
            pages = report.search_pages,
            failed = report.cells_in(CellState::Failed),
            "sweep finished"
        );
        Ok(report)
    }

    fn handle_searched(&self, sweep: &mut Sweep<'_>, cell: Cell, queries: Vec<CellQuery>) {
        let raw_count: usize = queries.iter().map(CellQuery::raw_count).sum();
        let capped = queries.iter().any(|q| q.capped);
        sweep.report.search_pages += queries.iter().map(|q| q.pages).sum::<u32>();
        sweep.accumulate(cell, queries);

        let state = if !capped {
            CellState::Searched
        } else if cell.depth >= self.settings.max_depth {
            CellState::DepthCapped
        } else if !cell.bounds.spans_at_least(self.settings.min_cell_span) {
            CellState::TooSmall
        } else {
            CellState::Subdivided
        };

        tracing::debug!(
            depth = cell.depth,
            raw_count,
            state = %state,
            "cell searched"
        );

        if state.is_truncated() {
            tracing::warn!(
                depth = cell.depth,
                bounds = ?cell.bounds,
                raw_count,
                "cell hit the result cap but cannot be split; some places may be missed"
            );
        }

        sweep.finish(cell, state, raw_count);
        if state == CellState::Subdivided {
            for child in cell.subdivide() {
                sweep.push(child);
            }
        }
    }

    /// A point-like area gets a single biased query and no subdivision
    async fn run_point(
        &self,
        area: &Area,
        root: Cell,
        type_filters: Arc<[TypeFilter]>,
        cancel: &CancellationFlag,
        progress: &dyn ProgressSink,
    ) -> ApiResult<SweepReport> {
        let filter = area.boundary_filter();
        let mut sweep = Sweep::new(&filter, self.settings.max_results);
        sweep.report.cells_queued = 1;

        if cancel.is_cancelled() {
            sweep.report.cancelled = true;
            sweep.finish(root, CellState::Cancelled, 0);
            progress.progress(&sweep.report.progress());
            return Ok(sweep.report);
        }

        let region = SearchRegion::Circle {
            center: area.center,
            radius_m: self.settings.fallback_radius_m,
        };
        tracing::debug!(center = ?area.center, radius_m = self.settings.fallback_radius_m, "searching point-like area");

        match self.search.search_cell(region, &type_filters).await {
            Ok(queries) => {
                let raw_count = queries.iter().map(CellQuery::raw_count).sum();
                sweep.report.search_pages += queries.iter().map(|q| q.pages).sum::<u32>();
                sweep.accumulate(root, queries);
                sweep.finish(root, CellState::Searched, raw_count);
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => sweep.fail(root, &err, progress),
        }
        sweep.report.cancelled = cancel.is_cancelled();

        progress.progress(&sweep.report.progress());
        Ok(sweep.report)
    }
}

fn describe_cell(cell: &Cell) -> String {
    let b = cell.bounds;
    format!(
        "cell d{} [{:.5},{:.5} - {:.5},{:.5}]",
        cell.depth, b.south, b.west, b.north, b.east
    )
}

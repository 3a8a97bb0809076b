//! Statistics for a finished crawl
//!
//! This module summarizes a `CrawlReport` and prints the summary to stderr,
//! keeping stdout free for place records.

use crate::crawler::{CrawlReport, FailureKind};
use crate::state::CellState;
use std::collections::HashMap;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Cells that reached a terminal state
    pub total_cells: usize,

    /// Count of cells by state
    pub cells_by_state: HashMap<CellState, usize>,

    /// Deepest subdivision level searched
    pub max_depth_reached: u32,

    /// Search pages requested
    pub search_pages: u32,

    /// Detail calls dispatched
    pub detail_calls: usize,

    /// Search hits before dedup
    pub raw_hits: usize,

    /// Unique places kept after boundary filtering
    pub unique_places: usize,

    /// Unique places dropped for lying outside the boundary
    pub outside_boundary: usize,

    /// Records written
    pub records: usize,

    /// Warnings by kind
    pub failures_by_kind: HashMap<FailureKind, usize>,

    pub cancelled: bool,

    pub duration_seconds: i64,
}

impl CrawlStatistics {
    pub fn from_report(report: &CrawlReport) -> Self {
        let mut cells_by_state = HashMap::new();
        for record in &report.cells {
            *cells_by_state.entry(record.state).or_insert(0) += 1;
        }

        let mut failures_by_kind = HashMap::new();
        for failure in &report.failures {
            *failures_by_kind.entry(failure.kind).or_insert(0) += 1;
        }

        let max_depth_reached = report
            .cells
            .iter()
            .filter(|c| c.state.is_success())
            .map(|c| c.cell.depth)
            .max()
            .unwrap_or(0);

        Self {
            total_cells: report.cells.len(),
            cells_by_state,
            max_depth_reached,
            search_pages: report.search_pages,
            detail_calls: report.detail_calls,
            raw_hits: report.raw_hits,
            unique_places: report.places.len(),
            outside_boundary: report.outside_boundary,
            records: report.records.len(),
            failures_by_kind,
            cancelled: report.cancelled,
            duration_seconds: (report.finished_at - report.started_at).num_seconds(),
        }
    }

    pub fn cells_in(&self, state: CellState) -> usize {
        self.cells_by_state.get(&state).copied().unwrap_or(0)
    }
}

/// Prints statistics to stderr in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    eprintln!("=== Crawl Statistics ===\n");

    eprintln!("Overview:");
    eprintln!("  Cells processed: {}", stats.total_cells);
    eprintln!("  Deepest level searched: {}", stats.max_depth_reached);
    eprintln!("  Search pages requested: {}", stats.search_pages);
    eprintln!("  Raw search hits: {}", stats.raw_hits);
    eprintln!("  Unique places: {}", stats.unique_places);
    if stats.outside_boundary > 0 {
        eprintln!("  Dropped outside boundary: {}", stats.outside_boundary);
    }
    eprintln!("  Detail calls: {}", stats.detail_calls);
    eprintln!("  Records written: {}", stats.records);
    eprintln!("  Duration: {}s", stats.duration_seconds);
    eprintln!();

    eprintln!("Cells by State:");
    let mut state_counts: Vec<_> = stats.cells_by_state.iter().collect();
    state_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));

    for (state, count) in state_counts {
        let percentage = if stats.total_cells > 0 {
            (*count as f64 / stats.total_cells as f64) * 100.0
        } else {
            0.0
        };
        eprintln!("  {}: {} ({:.1}%)", state, count, percentage);
    }
    eprintln!();

    if !stats.failures_by_kind.is_empty() {
        eprintln!("Warnings:");
        let mut failure_counts: Vec<_> = stats.failures_by_kind.iter().collect();
        failure_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (kind, count) in failure_counts {
            eprintln!("  {:?}: {}", kind, count);
        }
        eprintln!();
    }

    let truncated = stats.cells_in(CellState::DepthCapped) + stats.cells_in(CellState::TooSmall);
    if truncated > 0 {
        eprintln!(
            "Note: {} cell(s) hit the result cap without being split further; coverage there may be incomplete.",
            truncated
        );
    }

    if stats.cancelled {
        eprintln!("Crawl was cancelled; results are partial.");
    }
}

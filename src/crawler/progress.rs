//! Progress reporting for long-running crawls
//!
//! The engine pushes `CrawlProgress` snapshots and `CrawlFailure` warnings
//! into a `ProgressSink`. The default sink forwards everything to `tracing`.

use serde::Serialize;
use std::fmt;

/// Which phase a crawl is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlStage {
    Geocoding,
    Boundary,
    Sweeping,
    Details,
    Done,
}

impl fmt::Display for CrawlStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Geocoding => "geocoding",
            Self::Boundary => "boundary",
            Self::Sweeping => "sweeping",
            Self::Details => "details",
            Self::Done => "done",
        };
        write!(f, "{}", name)
    }
}

/// Point-in-time counters for a running crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CrawlProgress {
    pub stage: CrawlStage,
    pub cells_queued: usize,
    pub cells_done: usize,
    pub unique_found: usize,
    pub details_fetched: usize,
    pub details_total: usize,
}

impl CrawlProgress {
    pub fn at(stage: CrawlStage) -> Self {
        Self {
            stage,
            cells_queued: 0,
            cells_done: 0,
            unique_found: 0,
            details_fetched: 0,
            details_total: 0,
        }
    }
}

/// What a non-fatal failure affected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A cell's search failed after retries; its results were discarded
    Cell,
    /// One place's detail fetch failed; the record is omitted
    Detail,
    /// The boundary lookup failed; the crawl used the bounding box
    Boundary,
    /// Nothing failed, but the run looks misconfigured
    Hint,
}

/// A warning collected during a crawl
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlFailure {
    pub kind: FailureKind,
    /// Cell rectangle, place ID or location the failure is about
    pub subject: String,
    pub message: String,
}

impl CrawlFailure {
    pub fn new(kind: FailureKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for CrawlFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}: {}", self.kind, self.subject, self.message)
    }
}

/// Receiver for progress snapshots and warnings
pub trait ProgressSink: Send + Sync {
    fn progress(&self, snapshot: &CrawlProgress);

    fn warning(&self, failure: &CrawlFailure) {
        let _ = failure;
    }
}

/// Logs progress at debug level and warnings at warn level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn progress(&self, snapshot: &CrawlProgress) {
        tracing::debug!(
            stage = %snapshot.stage,
            cells_queued = snapshot.cells_queued,
            cells_done = snapshot.cells_done,
            unique_found = snapshot.unique_found,
            details_fetched = snapshot.details_fetched,
            details_total = snapshot.details_total,
            "progress"
        );
    }

    fn warning(&self, failure: &CrawlFailure) {
        tracing::warn!(kind = ?failure.kind, subject = %failure.subject, "{}", failure.message);
    }
}

impl<F> ProgressSink for F
where
    F: Fn(&CrawlProgress) + Send + Sync,
{
    fn progress(&self, snapshot: &CrawlProgress) {
        self(snapshot)
    }
}

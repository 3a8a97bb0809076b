//! Crawler module for the adaptive POI sweep
//!
//! This module contains the core crawling logic, including:
//! - The grid scheduler with adaptive subdivision
//! - Deduplication and boundary filtering of discovered places
//! - Progress reporting
//! - Overall crawl coordination

mod coordinator;
mod dedup;
mod progress;
mod scheduler;

pub use coordinator::{CrawlOrchestrator, CrawlReport};
pub use dedup::{filter_to_boundary, Deduplicator};
pub use progress::{
    CrawlFailure, CrawlProgress, CrawlStage, FailureKind, ProgressSink, TracingProgress,
};
pub use scheduler::{
    CellRecord, GridScheduler, SchedulerSettings, SearchResult, SweepReport,
};

use crate::config::Config;
use crate::CrawlError;

/// Runs a complete crawl against the live services
///
/// This is the main entry point for a one-shot crawl. It will:
/// 1. Validate the configuration
/// 2. Geocode the location and look up its boundary
/// 3. Sweep the area with minimal-field searches
/// 4. Deduplicate and filter the discovered places
/// 5. Fetch full details once per place
pub async fn crawl(config: Config) -> Result<CrawlReport, CrawlError> {
    CrawlOrchestrator::from_config(config)?.run().await
}

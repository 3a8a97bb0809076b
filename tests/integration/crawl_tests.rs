//! End-to-end crawl tests against in-memory services

use crate::support::{
    lattice_with_center, test_config, unit_square, FakeBoundary, FakeGeocoder, FakePlaces,
};
use poi_sweep::area::{Boundary, LatLng};
use poi_sweep::config::Config;
use poi_sweep::crawler::{CrawlOrchestrator, CrawlProgress, CrawlStage, FailureKind};
use poi_sweep::state::CellState;
use poi_sweep::{ConfigError, CrawlError};
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

fn orchestrator(config: Config, places: Arc<FakePlaces>) -> CrawlOrchestrator {
    CrawlOrchestrator::new(
        config,
        Arc::new(FakeGeocoder::viewport(unit_square())),
        places,
    )
}

fn ids(records: &[poi_sweep::PlaceRecord]) -> Vec<String> {
    records.iter().map(|r| r.place_id.clone()).collect()
}

#[tokio::test]
async fn test_full_crawl_finds_every_place_once() {
    let places = Arc::new(FakePlaces::new(lattice_with_center()));
    let report = orchestrator(test_config(), places.clone())
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(report.records.len(), 101);
    let unique: HashSet<_> = ids(&report.records).into_iter().collect();
    assert_eq!(unique.len(), 101, "Output must not contain duplicates");

    // Root hit the cap and was split once; no child did
    assert_eq!(report.cells.len(), 5);
    assert_eq!(report.cells[0].state, CellState::Subdivided);
    assert_eq!(report.cells_in(CellState::Searched), 4);
    assert_eq!(places.query_count(), 5);

    // No boundary, so nothing is filtered
    assert_eq!(report.outside_boundary, 0);
    assert!(report.is_complete());
    assert!(!report.cancelled);
}

#[tokio::test]
async fn test_place_seen_by_overlapping_cells_is_fetched_once() {
    let places = Arc::new(FakePlaces::new(lattice_with_center()));
    let report = orchestrator(test_config(), places.clone())
        .run()
        .await
        .expect("Crawl failed");

    // "X" sits on the corner shared by all four children
    let x_sightings: usize = report
        .cells
        .iter()
        .filter(|c| c.cell.depth == 1 && c.cell.bounds.contains(LatLng::new(0.5, 0.5)))
        .count();
    assert_eq!(x_sightings, 4);

    assert_eq!(
        report.records.iter().filter(|r| r.place_id == "X").count(),
        1
    );
    assert_eq!(places.detail_calls_for("X"), 1);
    assert_eq!(places.total_detail_calls(), 101);
    assert_eq!(report.detail_calls, 101);
    assert!(report.raw_hits > 101);
}

#[tokio::test]
async fn test_rerun_yields_same_places_in_same_order() {
    let first = orchestrator(test_config(), Arc::new(FakePlaces::new(lattice_with_center())))
        .run()
        .await
        .expect("First crawl failed");
    let second = orchestrator(test_config(), Arc::new(FakePlaces::new(lattice_with_center())))
        .run()
        .await
        .expect("Second crawl failed");

    assert_eq!(ids(&first.records), ids(&second.records));
}

#[tokio::test]
async fn test_parallel_crawl_finds_same_set() {
    let mut config = test_config();
    config.runtime.max_concurrent_requests = 4;

    let sequential = orchestrator(test_config(), Arc::new(FakePlaces::new(lattice_with_center())))
        .run()
        .await
        .expect("Sequential crawl failed");
    let parallel = orchestrator(config, Arc::new(FakePlaces::new(lattice_with_center())))
        .run()
        .await
        .expect("Parallel crawl failed");

    let a: HashSet<_> = ids(&sequential.records).into_iter().collect();
    let b: HashSet<_> = ids(&parallel.records).into_iter().collect();
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_boundary_clips_results() {
    // Triangle below the line lat + lng = 0.95
    let boundary = Boundary::from_rings(vec![vec![
        LatLng::new(0.0, 0.0),
        LatLng::new(0.0, 0.95),
        LatLng::new(0.95, 0.0),
    ]])
    .unwrap();

    let places = Arc::new(FakePlaces::new(lattice_with_center()));
    let report = orchestrator(test_config(), places)
        .with_boundary_source(Arc::new(FakeBoundary::Shape(boundary)))
        .run()
        .await
        .expect("Crawl failed");

    assert!(!report.records.is_empty());
    for record in &report.records {
        let loc = record.location.expect("Detail records carry a location");
        assert!(
            loc.lat + loc.lng < 0.95,
            "{} at {:?} lies outside the boundary",
            record.place_id,
            loc
        );
    }
    assert!(report.outside_boundary > 0);

    // Searching starts from the boundary's bounding box, not the viewport
    assert_eq!(report.cells[0].cell.bounds.north, 0.95);
}

#[tokio::test]
async fn test_boundary_failure_degrades_to_bounding_box() {
    let places = Arc::new(FakePlaces::new(lattice_with_center()));
    let report = orchestrator(test_config(), places)
        .with_boundary_source(Arc::new(FakeBoundary::Unavailable))
        .run()
        .await
        .expect("Crawl should continue without a boundary");

    assert_eq!(report.records.len(), 101);
    assert!(report.area.boundary.is_none());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind, FailureKind::Boundary);
}

#[tokio::test]
async fn test_two_types_issue_one_query_each() {
    let mut config = test_config();
    config.crawl.primary_types = vec!["restaurant".to_string(), "cafe".to_string()];

    let places = Arc::new(FakePlaces::new(lattice_with_center()));
    let report = orchestrator(config, places.clone())
        .run()
        .await
        .expect("Crawl failed");

    // Neither type reaches the cap over the whole area
    assert_eq!(places.query_count(), 2);
    assert_eq!(report.cells.len(), 1);
    assert_eq!(report.records.len(), 101);
}

#[tokio::test]
async fn test_max_results_stops_discovery() {
    let mut config = test_config();
    config.crawl.max_results = Some(30);

    let places = Arc::new(FakePlaces::new(lattice_with_center()));
    let report = orchestrator(config, places.clone())
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(report.records.len(), 30);
    assert!(report.budget_reached);
    assert_eq!(places.query_count(), 1);
    assert_eq!(places.total_detail_calls(), 30);

    // The unsearched children still show up in the cell list
    assert_eq!(report.cells.len(), 5);
    assert_eq!(report.cells_in(CellState::Cancelled), 4);
}

#[tokio::test]
async fn test_detail_progress_keeps_cell_counts() {
    let places = Arc::new(FakePlaces::new(lattice_with_center()));
    let snapshots = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&snapshots);
    let sink = move |p: &CrawlProgress| recorded.lock().unwrap().push(*p);

    orchestrator(test_config(), places)
        .with_progress(Arc::new(sink))
        .run()
        .await
        .expect("Crawl failed");

    let snapshots = snapshots.lock().unwrap();
    let late: Vec<&CrawlProgress> = snapshots
        .iter()
        .filter(|p| matches!(p.stage, CrawlStage::Details | CrawlStage::Done))
        .collect();
    assert!(late.len() > 1);
    assert!(late.iter().all(|p| p.cells_queued == 5 && p.cells_done == 5));

    let done = snapshots.last().unwrap();
    assert_eq!(done.stage, CrawlStage::Done);
    assert_eq!(done.details_fetched, 101);
    assert_eq!(done.details_total, 101);
}

#[tokio::test]
async fn test_cancellation_returns_partial_results() {
    let places = Arc::new(FakePlaces::new(lattice_with_center()));
    let orchestrator = orchestrator(test_config(), places.clone());

    let cancel = orchestrator.cancellation();
    let sink = move |p: &CrawlProgress| {
        if p.stage == CrawlStage::Sweeping && p.cells_done >= 1 {
            cancel.cancel();
        }
    };
    let report = orchestrator
        .with_progress(Arc::new(sink))
        .run()
        .await
        .expect("Cancelled crawl is not an error");

    assert!(report.cancelled);
    assert_eq!(report.cells_in(CellState::Cancelled), 4);
    assert_eq!(places.query_count(), 1);

    // Discovered places are returned without details
    assert_eq!(report.records.len(), 60);
    assert!(report.records.iter().all(|r| r.name.is_none()));
    assert_eq!(places.total_detail_calls(), 0);
}

#[tokio::test]
async fn test_detail_failure_omits_only_that_place() {
    let places = Arc::new(FakePlaces::new(lattice_with_center()).with_missing_details(&["p00", "X"]));
    let report = orchestrator(test_config(), places)
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(report.records.len(), 99);
    let details: Vec<_> = report
        .failures
        .iter()
        .filter(|f| f.kind == FailureKind::Detail)
        .map(|f| f.subject.as_str())
        .collect();
    assert_eq!(details.len(), 2);
    assert!(details.contains(&"X"));
    assert!(!report.is_complete());
}

#[tokio::test]
async fn test_geocode_miss_fails_the_run() {
    let places = Arc::new(FakePlaces::new(lattice_with_center()));
    let result = CrawlOrchestrator::new(test_config(), Arc::new(FakeGeocoder::missing()), places.clone())
        .run()
        .await;

    assert!(matches!(result, Err(CrawlError::Geocode { .. })));
    assert_eq!(places.query_count(), 0);
}

#[tokio::test]
async fn test_rejected_key_aborts_the_run() {
    let places = Arc::new(FakePlaces::new(lattice_with_center()).rejecting_key());
    let result = orchestrator(test_config(), places.clone()).run().await;

    match result {
        Err(CrawlError::Api(err)) => assert!(err.is_fatal()),
        other => panic!("Expected fatal API error, got {:?}", other.map(|r| r.records.len())),
    }
    assert_eq!(places.query_count(), 1);
    assert_eq!(places.total_detail_calls(), 0);
}

#[tokio::test]
async fn test_missing_key_rejected_before_network() {
    let mut config = test_config();
    config.api.key = None;

    let geocoder = Arc::new(FakeGeocoder::viewport(unit_square()));
    let result = CrawlOrchestrator::new(
        config,
        geocoder.clone(),
        Arc::new(FakePlaces::new(vec![])),
    )
    .run()
    .await;

    assert!(matches!(
        result,
        Err(CrawlError::Config(ConfigError::MissingApiKey))
    ));
    assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_result_adds_hint() {
    let report = orchestrator(test_config(), Arc::new(FakePlaces::new(vec![])))
        .run()
        .await
        .expect("Crawl failed");

    assert!(report.records.is_empty());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind, FailureKind::Hint);
}

#[tokio::test]
async fn test_max_depth_zero_accepts_truncated_root() {
    let mut config = test_config();
    config.crawl.max_depth = 0;

    let places = Arc::new(FakePlaces::new(lattice_with_center()));
    let report = orchestrator(config, places.clone())
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(report.cells.len(), 1);
    assert_eq!(report.cells[0].state, CellState::DepthCapped);
    assert_eq!(report.records.len(), 60);
}

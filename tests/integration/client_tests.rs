//! HTTP adapter tests against wiremock servers

use crate::support::test_config;
use poi_sweep::area::{Bounds, LatLng};
use poi_sweep::config::ApiConfig;
use poi_sweep::crawler::CrawlOrchestrator;
use poi_sweep::places::{
    build_http_client, BoundarySource, Geocoder, GoogleMapsClient, NominatimClient, PlacesApi,
    RequestGate, RetryPolicy, SearchRegion, SearchRequest,
};
use poi_sweep::{ApiError, AttributeSet};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_config(server: &MockServer) -> ApiConfig {
    ApiConfig {
        key: Some("test-key".to_string()),
        places_url: server.uri(),
        geocode_url: format!("{}/geocode/json", server.uri()),
        boundary_url: format!("{}/search", server.uri()),
        user_agent: "poi-sweep-tests/1.0".to_string(),
    }
}

fn google(server: &MockServer) -> GoogleMapsClient {
    let http = build_http_client("poi-sweep-tests/1.0", Duration::from_secs(5))
        .expect("Failed to build client");
    GoogleMapsClient::new(http, "test-key", &api_config(server))
}

fn rectangle_request() -> SearchRequest {
    SearchRequest {
        text_query: "coffee in Taipei".to_string(),
        region: SearchRegion::Rectangle(Bounds::from_corners(
            LatLng::new(25.0, 121.5),
            LatLng::new(25.1, 121.6),
        )),
        included_type: Some("cafe".to_string()),
        page_token: None,
        page_size: 20,
        language_code: Some("zh-TW".to_string()),
        region_code: None,
    }
}

#[tokio::test]
async fn test_search_sends_minimal_field_mask() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/places:searchText"))
        .and(header("X-Goog-Api-Key", "test-key"))
        .and(header(
            "X-Goog-FieldMask",
            "places.id,places.location,nextPageToken",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "places": [
                {"id": "a", "location": {"latitude": 25.05, "longitude": 121.55}},
                {"id": "b"}
            ],
            "nextPageToken": "next-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = google(&server)
        .search_places(&rectangle_request())
        .await
        .expect("Search failed");

    assert_eq!(page.results.len(), 2);
    assert_eq!(page.results[0].place_id, "a");
    assert_eq!(page.results[0].location, Some(LatLng::new(25.05, 121.55)));
    assert_eq!(page.results[1].location, None);
    assert_eq!(page.next_page_token.as_deref(), Some("next-1"));

    let requests = server.received_requests().await.expect("Recording enabled");
    let body: Value = serde_json::from_slice(&requests[0].body).expect("JSON body");
    assert_eq!(body["textQuery"], "coffee in Taipei");
    assert_eq!(body["includedType"], "cafe");
    assert_eq!(body["languageCode"], "zh-TW");
    assert_eq!(body["locationRestriction"]["rectangle"]["low"]["latitude"], 25.0);
    assert_eq!(body["locationRestriction"]["rectangle"]["high"]["longitude"], 121.6);
}

#[tokio::test]
async fn test_empty_search_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/places:searchText"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let page = google(&server)
        .search_places(&rectangle_request())
        .await
        .expect("Search failed");

    assert!(page.results.is_empty());
    assert!(page.next_page_token.is_none());
}

#[tokio::test]
async fn test_details_use_attribute_field_mask() {
    let server = MockServer::start().await;

    let attributes = AttributeSet {
        name: true,
        rating: true,
        ..AttributeSet::id_only()
    };

    Mock::given(method("GET"))
        .and(path("/places/abc"))
        .and(header("X-Goog-FieldMask", "id,displayName,rating"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "abc",
            "displayName": {"text": "Blue Bottle", "languageCode": "en"},
            "rating": 4.4
        })))
        .expect(1)
        .mount(&server)
        .await;

    let record = google(&server)
        .fetch_place_details("abc", &attributes)
        .await
        .expect("Details failed");

    assert_eq!(record.place_id, "abc");
    assert_eq!(record.name.as_deref(), Some("Blue Bottle"));
    assert_eq!(record.rating, Some(4.4));
    assert!(record.address.is_none());
}

#[tokio::test]
async fn test_missing_place_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/places/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": 404, "message": "Place not found", "status": "NOT_FOUND"}
        })))
        .mount(&server)
        .await;

    let err = google(&server)
        .fetch_place_details("gone", &AttributeSet::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
    assert!(!err.is_retriable());
}

#[tokio::test]
async fn test_rate_limit_is_retried_through_gate() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/places:searchText"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/places:searchText"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "places": [{"id": "a"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = google(&server);
    let gate = RequestGate::new(
        1,
        RetryPolicy {
            max_retries: 2,
            backoff_base: Duration::from_millis(5),
            call_timeout: Duration::from_secs(5),
        },
    );
    let request = rectangle_request();
    let page = gate
        .call("search", || client.search_places(&request))
        .await
        .expect("Retry should succeed");

    assert_eq!(page.results.len(), 1);
}

#[tokio::test]
async fn test_invalid_key_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/places:searchText"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = google(&server)
        .search_places(&rectangle_request())
        .await
        .unwrap_err();
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_geocode_returns_center_and_viewport() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geocode/json"))
        .and(query_param("address", "Taipei City"))
        .and(query_param("key", "test-key"))
        .and(query_param("language", "en"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "results": [{
                "formatted_address": "Taipei City, Taiwan",
                "geometry": {
                    "location": {"lat": 25.03, "lng": 121.56},
                    "viewport": {
                        "northeast": {"lat": 25.21, "lng": 121.67},
                        "southwest": {"lat": 24.96, "lng": 121.45}
                    }
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = google(&server)
        .geocode("Taipei City", Some("en"))
        .await
        .expect("Geocode failed");

    assert_eq!(result.center, LatLng::new(25.03, 121.56));
    let viewport = result.viewport.expect("Viewport present");
    assert_eq!(viewport.south, 24.96);
    assert_eq!(viewport.east, 121.67);
    assert_eq!(result.formatted_address.as_deref(), Some("Taipei City, Taiwan"));
}

#[tokio::test]
async fn test_geocode_zero_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geocode/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ZERO_RESULTS",
            "results": []
        })))
        .mount(&server)
        .await;

    let err = google(&server).geocode("Nowhere", None).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn test_nominatim_boundary_lookup() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Testville"))
        .and(query_param("format", "json"))
        .and(query_param("polygon_geojson", "1"))
        .and(header("User-Agent", "poi-sweep-tests/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "class": "amenity",
                "type": "townhall",
                "geojson": {"type": "Point", "coordinates": [0.5, 0.5]}
            },
            {
                "class": "boundary",
                "type": "administrative",
                "geojson": {
                    "type": "MultiPolygon",
                    "coordinates": [[[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]]
                }
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let http = build_http_client("poi-sweep-tests/1.0", Duration::from_secs(5)).unwrap();
    let client = NominatimClient::new(http, format!("{}/search", server.uri()), Duration::ZERO);
    let boundary = client
        .fetch_boundary("Testville")
        .await
        .expect("Lookup failed")
        .expect("Boundary present");

    assert!(boundary.contains(LatLng::new(0.5, 0.5)));
    assert!(!boundary.contains(LatLng::new(1.5, 0.5)));
    assert_eq!(boundary.bounding_box().north, 1.0);
}

#[tokio::test]
async fn test_nominatim_without_polygon() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let http = build_http_client("poi-sweep-tests/1.0", Duration::from_secs(5)).unwrap();
    let client = NominatimClient::new(http, format!("{}/search", server.uri()), Duration::ZERO);
    assert!(client.fetch_boundary("Testville").await.unwrap().is_none());
}

#[tokio::test]
async fn test_crawl_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geocode/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "results": [{
                "geometry": {
                    "location": {"lat": 25.05, "lng": 121.55},
                    "viewport": {
                        "northeast": {"lat": 25.1, "lng": 121.6},
                        "southwest": {"lat": 25.0, "lng": 121.5}
                    }
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/places:searchText"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "places": [
                {"id": "a", "location": {"latitude": 25.01, "longitude": 121.51}},
                {"id": "b", "location": {"latitude": 25.02, "longitude": 121.52}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    for (id, name) in [("a", "Alpha Coffee"), ("b", "Beta Roasters")] {
        Mock::given(method("GET"))
            .and(path(format!("/places/{}", id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": id,
                "displayName": {"text": name}
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let mut config = test_config();
    config.api = api_config(&server);
    config.crawl.use_boundary = false;

    let report = CrawlOrchestrator::from_config(config)
        .expect("Failed to build orchestrator")
        .run()
        .await
        .expect("Crawl failed");

    let names: Vec<_> = report
        .records
        .iter()
        .map(|r| r.name.as_deref().unwrap_or(""))
        .collect();
    assert_eq!(names, vec!["Alpha Coffee", "Beta Roasters"]);
    assert_eq!(report.search_pages, 1);
    assert_eq!(report.detail_calls, 2);
}

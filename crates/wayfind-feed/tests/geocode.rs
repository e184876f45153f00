//! Integration tests for address lookup against a local `wiremock` server.

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wayfind_feed::{FeedError, Geocoder, GeocoderConfig};

fn test_config(base: &str) -> GeocoderConfig {
    GeocoderConfig {
        base_url: base.to_string(),
        request_timeout_secs: 5,
        user_agent: "wayfind-test/0.1".to_string(),
    }
}

#[tokio::test]
async fn lookup_sends_search_query_and_returns_first_match() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("format", "json"))
        .and(query_param("limit", "1"))
        .and(query_param("q", "1000 4th Ave, Seattle"))
        .and(header("user-agent", "wayfind-test/0.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "lat": "47.6067",
                "lon": "-122.3325",
                "display_name": "Seattle Central Library, 1000 4th Ave, Seattle"
            },
            { "lat": "0", "lon": "0", "display_name": "ignored" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let geocoder = Geocoder::new(&test_config(&server.uri())).unwrap();
    let found = geocoder
        .lookup("  1000 4th Ave, Seattle ")
        .await
        .unwrap()
        .expect("a match");
    assert!((found.location.lat() - 47.6067).abs() < 1e-9);
    assert!((found.location.lng() + 122.3325).abs() < 1e-9);
    assert!(found.display_name.starts_with("Seattle Central Library"));
}

#[tokio::test]
async fn lookup_with_no_results_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let geocoder = Geocoder::new(&test_config(&server.uri())).unwrap();
    assert!(geocoder.lookup("nowhere in particular").await.unwrap().is_none());
}

#[tokio::test]
async fn blank_address_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let geocoder = Geocoder::new(&test_config(&server.uri())).unwrap();
    assert!(geocoder.lookup("   ").await.unwrap().is_none());
}

#[tokio::test]
async fn numeric_coordinates_are_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geo/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "lat": 40.7128, "lon": -74.006 }])),
        )
        .mount(&server)
        .await;

    let geocoder = Geocoder::new(&test_config(&format!("{}/geo/", server.uri()))).unwrap();
    let found = geocoder.lookup("New York").await.unwrap().unwrap();
    assert!((found.location.lat() - 40.7128).abs() < 1e-9);
    assert!(found.display_name.is_empty());
}

#[tokio::test]
async fn out_of_range_match_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "lat": "123.0", "lon": "5" }])),
        )
        .mount(&server)
        .await;

    let geocoder = Geocoder::new(&test_config(&server.uri())).unwrap();
    let err = geocoder.lookup("somewhere").await.unwrap_err();
    assert!(matches!(err, FeedError::UnexpectedShape(_)), "got {err:?}");
}

#[tokio::test]
async fn non_list_response_is_a_deserialize_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "bad" })))
        .mount(&server)
        .await;

    let geocoder = Geocoder::new(&test_config(&server.uri())).unwrap();
    let err = geocoder.lookup("somewhere").await.unwrap_err();
    assert!(matches!(err, FeedError::Deserialize { .. }), "got {err:?}");
}

#[tokio::test]
async fn throttling_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .expect(1)
        .mount(&server)
        .await;

    let geocoder = Geocoder::new(&test_config(&server.uri())).unwrap();
    let err = geocoder.lookup("somewhere").await.unwrap_err();
    assert!(matches!(err, FeedError::RateLimited { retry_after_secs: 1 }));
}

#[test]
fn non_http_base_url_is_rejected() {
    let err = Geocoder::new(&test_config("ftp://geo.example.com")).err();
    assert!(matches!(err, Some(FeedError::InvalidUrl { .. })));
}

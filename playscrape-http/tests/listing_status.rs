use playscrape_http::{Listing, ListingRequest, StorefrontClient};
use reqwest::StatusCode;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DETAILS: &str = "store/apps/details";

fn client(server: &MockServer) -> StorefrontClient {
    StorefrontClient::new(&server.uri(), DETAILS).unwrap()
}

#[tokio::test]
async fn live_listing_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/store/apps/details"))
        .and(query_param("id", "com.example.app"))
        .and(query_param("hl", "en"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let listing = client(&server)
        .listing(ListingRequest::new("com.example.app"))
        .await
        .unwrap();

    assert_eq!(listing, Listing::Live);
}

#[tokio::test]
async fn missing_listing_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let listing = client(&server)
        .listing(ListingRequest::new("com.example.missing"))
        .await
        .unwrap();

    assert_eq!(listing, Listing::Unavailable(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let listing = client(&server)
        .with_retries(2)
        .listing(ListingRequest::new("com.example.app"))
        .await
        .unwrap();

    assert_eq!(listing, Listing::Live);
}

#[tokio::test]
async fn retry_budget_exhaustion_returns_last_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let listing = client(&server)
        .with_retries(1)
        .listing(ListingRequest::new("com.example.app"))
        .await
        .unwrap();

    assert_eq!(
        listing,
        Listing::Unavailable(StatusCode::INTERNAL_SERVER_ERROR)
    );
}

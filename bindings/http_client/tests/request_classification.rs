use std::sync::Arc;
use std::time::Duration;

use gale_core::prelude::RequestError;
use gale_http_client::prelude::{HttpClientInstrumented, HttpRequest, Method};
use gale_instruments::ReportConfig;
use pretty_assertions::assert_eq;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(base_url: &str, timeout: Duration) -> HttpClientInstrumented {
    HttpClientInstrumented::new(base_url, timeout, Arc::new(ReportConfig::default().init()))
        .expect("failed to build client")
}

#[tokio::test]
async fn matching_status_is_success() {
    let server = MockServer::start().await;
    let body = serde_json::json!({ "title": "activities", "content": "now", "time": 0 });
    Mock::given(method("POST"))
        .and(path("/activities"))
        .and(header("Content-Type", "application/json"))
        .and(header("Authorization", "token-123"))
        .and(body_json(&body))
        .respond_with(ResponseTemplate::new(200).set_body_string("Activity added"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server.uri(), Duration::from_secs(5));
    let request = HttpRequest::new(
        "add_activity",
        Method::POST,
        client.url_for("/activities").unwrap(),
    )
    .with_body(body)
    .with_header("Authorization", "token-123")
    .expect_status(200);

    let response = client.execute(request).await;

    assert_eq!(response.status, Some(200));
    assert_eq!(response.error, None);
    assert_eq!(response.body.as_deref(), Some("Activity added"));
}

#[tokio::test]
async fn server_error_is_http_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client(&server.uri(), Duration::from_secs(5));
    let request = HttpRequest::new(
        "delete_activity",
        Method::DELETE,
        client.url_for("/activities/1").unwrap(),
    )
    .expect_status(200);

    let response = client.execute(request).await;

    assert_eq!(response.status, Some(500));
    assert_eq!(response.error, Some(RequestError::HttpStatus { status: 500 }));
}

#[tokio::test]
async fn unexpected_success_status_is_http_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = client(&server.uri(), Duration::from_secs(5));
    let request = HttpRequest::new("add_activity", Method::POST, client.url_for("/activity").unwrap())
        .expect_status(201);

    let response = client.execute(request).await;

    assert_eq!(response.error, Some(RequestError::HttpStatus { status: 200 }));
}

#[tokio::test]
async fn without_expected_status_any_2xx_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = client(&server.uri(), Duration::from_secs(5));
    let request = HttpRequest::new("list", Method::GET, client.url_for("/activities").unwrap());

    let response = client.execute(request).await;

    assert_eq!(response.status, Some(204));
    assert!(response.is_success());
}

#[tokio::test]
async fn refused_connection_is_network_error() {
    // Grab a free port and release it so that nothing is listening there.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let client = client(&format!("http://127.0.0.1:{port}"), Duration::from_secs(5));
    let request = HttpRequest::new("list", Method::GET, client.url_for("/activities").unwrap());

    let response = client.execute(request).await;

    assert_eq!(response.status, None);
    assert!(matches!(response.error, Some(RequestError::Network { .. })));
}

#[tokio::test]
async fn timeout_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let client = client(&server.uri(), Duration::from_millis(50));
    let request = HttpRequest::new("list", Method::GET, client.url_for("/activities").unwrap());

    let response = client.execute(request).await;

    assert_eq!(response.status, None);
    match response.error {
        Some(RequestError::Network { message }) => assert!(message.starts_with("timeout"), "{message}"),
        other => panic!("Expected a network error, got {other:?}"),
    }
}

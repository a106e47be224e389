use std::time::Duration;

use sgenv_api::{Client, Error};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
}

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn get_json_success() {
    let mock_server = MockServer::start().await;
    let body = load_fixture("rainfall.json");

    Mock::given(method("GET"))
        .and(path("/v2/real-time/api/rainfall"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(&body))
        .mount(&mock_server)
        .await;

    let client = Client::new().unwrap();
    let url = format!("{}/v2/real-time/api/rainfall", mock_server.uri());
    let value = client.get_json(&url, TIMEOUT).await.unwrap();
    assert_eq!(value["data"]["stations"][0]["id"], "S214");
}

#[tokio::test]
async fn get_json_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;

    let client = Client::new().unwrap();
    let err = client
        .get_json(&format!("{}/v2/real-time/api/pm25", mock_server.uri()), TIMEOUT)
        .await
        .unwrap_err();
    match err {
        Error::HttpStatus { status, retry_after, body } => {
            assert_eq!(status, 500);
            assert!(retry_after.is_none());
            assert_eq!(body, "Internal Server Error");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn get_json_rate_limited_keeps_retry_after() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "5"))
        .mount(&mock_server)
        .await;

    let client = Client::new().unwrap();
    let err = client
        .get_json(&format!("{}/v2/real-time/api/rainfall", mock_server.uri()), TIMEOUT)
        .await
        .unwrap_err();
    match err {
        Error::HttpStatus {
            status,
            retry_after,
            ..
        } => {
            assert_eq!(status, 429);
            assert_eq!(retry_after.as_deref(), Some("5"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn get_json_malformed_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not valid json}"))
        .mount(&mock_server)
        .await;

    let client = Client::new().unwrap();
    let err = client
        .get_json(&format!("{}/v2/real-time/api/rainfall", mock_server.uri()), TIMEOUT)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
}

#[tokio::test]
async fn get_json_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("{}")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let client = Client::new().unwrap();
    let err = client
        .get_json(
            &format!("{}/v2/real-time/api/rainfall", mock_server.uri()),
            Duration::from_millis(50),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout));
}

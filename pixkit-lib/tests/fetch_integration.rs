//! Integration tests for the HTTP token fetcher.
//!
//! These run against a local mock server; no real network access is
//! required.
//!
//! ```bash
//! cargo test -p pixkit-lib --test fetch_integration
//! ```

#![cfg(feature = "http-fetcher")]

use pixkit_lib::errors::PixError;
use pixkit_lib::fetch::{FetcherConfig, HttpTokenFetcher, RemoteTokenFetch};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_fetch_token_sends_fixed_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/qr/v2/abc"))
        .and(header("User-Agent", "pixkit-lib/1.0"))
        .and(header("Accept", "application/json, text/plain, */*"))
        .respond_with(ResponseTemplate::new(200).set_body_string("eyJh.eyJi.c2ln"))
        .mount(&mock_server)
        .await;

    let fetcher = HttpTokenFetcher::with_defaults().unwrap();
    let body = fetcher
        .fetch_token(&format!("{}/qr/v2/abc", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(body, "eyJh.eyJi.c2ln");
}

#[tokio::test]
async fn test_fetch_token_returns_json_body_verbatim() {
    // Unwrapping the token out of a JSON body is the pipeline's job; the
    // fetcher hands the body through untouched.
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/qr/v2/abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"token": "eyJh.eyJi.c2ln"})),
        )
        .mount(&mock_server)
        .await;

    let fetcher = HttpTokenFetcher::with_defaults().unwrap();
    let body = fetcher
        .fetch_token(&format!("{}/qr/v2/abc", mock_server.uri()))
        .await
        .unwrap();

    assert!(body.contains("\"token\""));
}

#[tokio::test]
async fn test_fetch_token_rejects_empty_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/qr/v2/empty"))
        .respond_with(ResponseTemplate::new(200).set_body_string("  \n"))
        .mount(&mock_server)
        .await;

    let fetcher = HttpTokenFetcher::with_defaults().unwrap();
    let err = fetcher
        .fetch_token(&format!("{}/qr/v2/empty", mock_server.uri()))
        .await
        .unwrap_err();

    match err {
        PixError::RemoteFetchFailed { detail, .. } => {
            assert!(detail.contains("empty response"), "{detail}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_token_maps_status_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/qr/v2/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let fetcher = HttpTokenFetcher::with_defaults().unwrap();
    let err = fetcher
        .fetch_token(&format!("{}/qr/v2/gone", mock_server.uri()))
        .await
        .unwrap_err();

    match err {
        PixError::RemoteFetchFailed { url, detail } => {
            assert!(url.contains("/qr/v2/gone"));
            assert!(detail.contains("HTTP 404"), "{detail}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_key_set_returns_document() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/.well-known/jwks.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "keys": [{"kid": "k1", "kty": "RSA", "n": "AQAB", "e": "AQAB"}]
        })))
        .mount(&mock_server)
        .await;

    let fetcher = HttpTokenFetcher::with_defaults().unwrap();
    let body = fetcher
        .fetch_key_set(&format!("{}/.well-known/jwks.json", mock_server.uri()))
        .await
        .unwrap();

    assert!(body.contains("\"kid\""));
}

#[tokio::test]
async fn test_custom_user_agent_is_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/keys"))
        .and(header("User-Agent", "wallet-backend/2.3"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"keys\":[]}"))
        .mount(&mock_server)
        .await;

    let config = FetcherConfig {
        user_agent: "wallet-backend/2.3".to_string(),
        ..FetcherConfig::default()
    };
    let fetcher = HttpTokenFetcher::new(config).unwrap();
    let body = fetcher
        .fetch_key_set(&format!("{}/keys", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(body, "{\"keys\":[]}");
}

#[tokio::test]
async fn test_connection_failure_is_a_fetch_failure() {
    // Nothing listens on this port.
    let fetcher = HttpTokenFetcher::with_defaults().unwrap();
    let err = fetcher
        .fetch_token("http://127.0.0.1:9/qr")
        .await
        .unwrap_err();
    assert!(matches!(err, PixError::RemoteFetchFailed { .. }));
}

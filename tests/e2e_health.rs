//! E2E tests for health check, metrics and authentication

mod common;

use common::{TEST_USER, TestServer};
use serde_json::Value;

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_cors_headers() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/health"))
        .header("Origin", "https://app.example.com")
        .send()
        .await
        .unwrap();

    // No origins configured means permissive CORS
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_404_for_unknown_routes() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/unknown/route"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_http_counters() {
    let server = TestServer::new().await;

    server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap();

    let response = server
        .client
        .get(server.url("/metrics"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body = response.text().await.unwrap();
    assert!(body.contains("socialflow_http_requests_total"));
}

#[tokio::test]
async fn test_api_requires_session() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/api/posts"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Authentication required");
}

#[tokio::test]
async fn test_api_rejects_tampered_token() {
    let server = TestServer::new().await;
    let token = server.create_test_token(TEST_USER);
    let tampered = format!("{token}x");

    let response = server
        .client
        .get(server.url("/api/posts"))
        .bearer_auth(tampered)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_api_rejects_session_older_than_max_age() {
    use socialflow::auth::{Session, create_session_token};

    let server = TestServer::new().await;
    let mut session = Session::new(TEST_USER, "user@example.com", 3600);
    session.created_at -= chrono::Duration::days(30);
    let token =
        create_session_token(&session, &server.state.config.auth.session_secret).unwrap();

    let response = server
        .client
        .get(server.url("/api/posts"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_api_accepts_session_cookie() {
    let server = TestServer::new().await;
    let token = server.create_test_token(TEST_USER);

    let response = server
        .client
        .get(server.url("/api/posts"))
        .header("Cookie", format!("session={token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["pagination"]["total"], 0);
}

//! Integration tests for health check endpoints

mod common;

use axum::http::StatusCode;
use common::TestApp;

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new();

    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_liveness_endpoint() {
    let app = TestApp::new();

    let (status, body) = app.get("/health/live").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "alive");
}

#[tokio::test]
async fn test_readiness_endpoint() {
    let app = TestApp::new();

    let (status, body) = app.get("/health/ready").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["users"]["status"], "healthy");
    assert_eq!(body["checks"]["sessions"]["status"], "healthy");
}

#[tokio::test]
async fn test_api_root() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/v1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Taskboard API v1");
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_readiness_with_postgres() {
    let app = TestApp::with_postgres().await;

    let (status, _) = app.get("/health/ready").await;

    assert_eq!(status, StatusCode::OK);
}

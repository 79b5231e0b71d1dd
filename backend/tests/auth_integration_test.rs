//! Integration tests for authentication endpoints

mod common;

use axum::http::StatusCode;
use common::{access_token, refresh_token, unique_email, TestApp, PASSWORD};
use serde_json::json;
use taskboard_backend::events::{AuthEvent, Topic};

#[tokio::test]
async fn test_sign_up_returns_tokens() {
    let app = TestApp::new();

    let tokens = app.sign_up(&unique_email()).await;

    assert!(!access_token(&tokens).is_empty());
    assert!(!refresh_token(&tokens).is_empty());
    assert_eq!(tokens["token_type"], "Bearer");
    assert_eq!(tokens["expires_in"], 900);
}

#[tokio::test]
async fn test_sign_up_duplicate_email() {
    let app = TestApp::new();
    let email = unique_email();
    app.sign_up(&email).await;

    let (status, body) = app
        .post(
            "/api/v1/auth/signup",
            json!({"email": email.to_uppercase(), "name": "Again", "password": PASSWORD}),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "EMAIL_IN_USE");
}

#[tokio::test]
async fn test_sign_up_without_password() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/api/v1/auth/signup",
            json!({"email": unique_email(), "name": "No Password"}),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "PASSWORD_REQUIRED");
}

#[tokio::test]
async fn test_sign_up_invalid_email() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/api/v1/auth/signup",
            json!({"email": "not-an-email", "name": "Bad", "password": PASSWORD}),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_sign_up_short_password() {
    let app = TestApp::new();

    let (status, _) = app
        .post(
            "/api/v1/auth/signup",
            json!({"email": unique_email(), "name": "Weak", "password": "123"}),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sign_in_and_profile() {
    let app = TestApp::new();
    app.sign_up("alice@x.com").await;

    let (status, tokens) = app.sign_in("alice@x.com", "secret123").await;
    assert_eq!(status, StatusCode::OK);

    let (status, profile) = app.get_auth("/api/v1/auth/me", access_token(&tokens)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["email"], "alice@x.com");
    assert_eq!(profile["name"], "Test User");
}

#[tokio::test]
async fn test_sign_in_wrong_password() {
    let app = TestApp::new();
    let email = unique_email();
    app.sign_up(&email).await;

    let (status, body) = app.sign_in(&email, "WrongPassword").await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_sign_in_unknown_email() {
    let app = TestApp::new();

    let (status, _) = app.sign_in(&unique_email(), PASSWORD).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_newer_sign_in_supersedes_older() {
    let app = TestApp::new();
    let email = unique_email();
    let from_sign_up = app.sign_up(&email).await;

    let (_, laptop) = app.sign_in(&email, PASSWORD).await;
    let (_, phone) = app.sign_in(&email, PASSWORD).await;

    for stale in [&from_sign_up, &laptop] {
        let (status, _) = app.get_auth("/api/v1/auth/me", access_token(stale)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let (status, _) = app.get_auth("/api/v1/auth/me", access_token(&phone)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_invalidates_session() {
    let app = TestApp::new();
    let tokens = app.sign_up(&unique_email()).await;

    let (status, _) = app.post_auth("/api/v1/auth/logout", access_token(&tokens)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get_auth("/api/v1/auth/me", access_token(&tokens)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post(
            "/api/v1/auth/refresh",
            json!({"refresh_token": refresh_token(&tokens)}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_requires_token() {
    let app = TestApp::new();

    let (status, _) = app.post("/api/v1/auth/logout", json!({})).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_keeps_session() {
    let app = TestApp::new();
    let tokens = app.sign_up(&unique_email()).await;

    let (status, refreshed) = app
        .post(
            "/api/v1/auth/refresh",
            json!({"refresh_token": refresh_token(&tokens)}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Same epoch, so both the old and the new access token are accepted
    for token in [access_token(&tokens), access_token(&refreshed)] {
        let (status, _) = app.get_auth("/api/v1/auth/me", token).await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_refresh_with_garbage() {
    let app = TestApp::new();

    let (status, _) = app
        .post("/api/v1/auth/refresh", json!({"refresh_token": "invalid.token.here"}))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_events_published_for_session_changes() {
    let app = TestApp::new();
    let mut accounts = app.events().subscribe(Topic::Account);
    let mut sessions = app.events().subscribe(Topic::Session);

    let tokens = app.sign_up(&unique_email()).await;
    app.post_auth("/api/v1/auth/logout", access_token(&tokens)).await;

    let Some(AuthEvent::SignedUp { user_id }) = accounts.try_recv() else {
        panic!("expected a sign-up event");
    };
    assert_eq!(sessions.try_recv(), Some(AuthEvent::SignedIn { user_id }));
    assert_eq!(sessions.try_recv(), Some(AuthEvent::LoggedOut { user_id }));
    assert_eq!(sessions.try_recv(), None);
}

#[tokio::test]
async fn test_sign_in_and_refresh_publish_owner() {
    let app = TestApp::new();
    let email = unique_email();
    app.sign_up(&email).await;
    let mut sessions = app.events().subscribe(Topic::Session);

    let (_, tokens) = app.sign_in(&email, PASSWORD).await;
    let (status, _) = app
        .post(
            "/api/v1/auth/refresh",
            json!({"refresh_token": refresh_token(&tokens)}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let Some(AuthEvent::SignedIn { user_id }) = sessions.try_recv() else {
        panic!("expected a sign-in event");
    };
    assert_eq!(sessions.try_recv(), Some(AuthEvent::TokensRefreshed { user_id }));

    // A failed sign-in publishes nothing
    app.sign_in(&email, "WrongPassword").await;
    assert_eq!(sessions.try_recv(), None);
}

#[tokio::test]
async fn test_sign_in_over_long_password() {
    let app = TestApp::new();
    let email = unique_email();
    app.sign_up(&email).await;

    let (status, body) = app.sign_in(&email, &"p".repeat(4096)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_postgres_sign_up_and_sign_in() {
    let app = TestApp::with_postgres().await;
    let email = unique_email();
    app.sign_up(&email).await;

    let (status, tokens) = app.sign_in(&email, PASSWORD).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get_auth("/api/v1/auth/me", access_token(&tokens)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post(
            "/api/v1/auth/signup",
            json!({"email": email, "name": "Dup", "password": PASSWORD}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

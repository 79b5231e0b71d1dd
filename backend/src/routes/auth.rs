//! Authentication routes
//!
//! Sign-up, sign-in, token refresh, logout and the current-user profile.
//! Events are published here, after the service call succeeds.

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::events::AuthEvent;
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use taskboard_shared::{AuthTokens, RefreshTokenRequest, SignInRequest, SignUpRequest, UserProfile};

/// Create auth routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(sign_up))
        .route("/signin", post(sign_in))
        .route("/refresh", post(refresh_token))
        .route("/logout", post(logout))
        .route("/me", get(get_profile))
}

/// Create an account and open its first session
///
/// POST /api/v1/auth/signup
async fn sign_up(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> ApiResult<(StatusCode, Json<AuthTokens>)> {
    let account = state.auth().sign_up(req).await?;
    state.events().publish(AuthEvent::SignedUp { user_id: account.id });

    let tokens = state.auth().sign_in(&account).await?;
    state.events().publish(AuthEvent::SignedIn { user_id: account.id });

    Ok((StatusCode::CREATED, Json(tokens)))
}

/// Login with email and password
///
/// POST /api/v1/auth/signin
async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> ApiResult<Json<AuthTokens>> {
    let (account, tokens) = state.auth().authenticate(&req.email, &req.password).await?;
    state.events().publish(AuthEvent::SignedIn { user_id: account.id });
    Ok(Json(tokens))
}

/// Exchange a refresh token for a fresh token pair
///
/// POST /api/v1/auth/refresh
async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> ApiResult<Json<AuthTokens>> {
    let (user_id, tokens) = state.auth().refresh(&req.refresh_token).await?;
    state.events().publish(AuthEvent::TokensRefreshed { user_id });
    Ok(Json(tokens))
}

/// End the caller's session
///
/// POST /api/v1/auth/logout
async fn logout(State(state): State<AppState>, auth_user: AuthUser) -> ApiResult<StatusCode> {
    state.auth().logout(auth_user.user_id).await?;
    state.events().publish(AuthEvent::LoggedOut {
        user_id: auth_user.user_id,
    });
    Ok(StatusCode::NO_CONTENT)
}

/// Get current user profile (requires authentication)
///
/// GET /api/v1/auth/me
async fn get_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Json<UserProfile>> {
    let profile = state.auth().profile(auth_user.user_id).await?;
    Ok(Json(profile))
}

//! Request and response types of the authentication API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token pair handed out by sign-up, sign-in and refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Sign-up request
///
/// `password` is optional on the wire so a missing password can be answered
/// with a dedicated error instead of a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

/// Sign-in request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Refresh request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Profile of the authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_up_request_without_password_deserializes() {
        let req: SignUpRequest =
            serde_json::from_str(r#"{"email":"a@x.com","name":"Alice"}"#).unwrap();
        assert!(req.password.is_none());
        assert!(!req.is_admin);
    }
}

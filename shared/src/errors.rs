//! Error types shared between the backend and its clients

use thiserror::Error;

/// Failures of the authentication and session subsystem.
///
/// Guard failures (`InvalidToken`, `ExpiredToken`, `SessionSuperseded`) are
/// kept apart here for logging and metrics, but adapters must surface them as
/// one indistinguishable "unauthorized" answer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Email already in use")]
    EmailInUse,

    #[error("Password is required")]
    PasswordRequired,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    ExpiredToken,

    #[error("Session superseded")]
    SessionSuperseded,

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// True for every failure an authenticated-route guard can produce.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::InvalidToken
                | AuthError::ExpiredToken
                | AuthError::SessionSuperseded
        )
    }

    /// Short machine-readable label, safe to use as a metrics label.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::EmailInUse => "email_in_use",
            AuthError::PasswordRequired => "password_required",
            AuthError::Validation(_) => "validation",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::InvalidToken => "invalid_token",
            AuthError::ExpiredToken => "expired_token",
            AuthError::SessionSuperseded => "session_superseded",
            AuthError::ServiceUnavailable(_) => "service_unavailable",
            AuthError::Internal(_) => "internal",
        }
    }
}

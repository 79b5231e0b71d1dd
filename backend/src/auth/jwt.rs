//! JWT token generation and validation
//!
//! Access and refresh tokens carry the same identity claims but are signed
//! with different secrets and expire after different lifetimes. Keys are
//! pre-computed once and shared through `Arc`.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use taskboard_shared::AuthError;
use uuid::Uuid;

/// Identity carried by both tokens of one login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenIdentity {
    pub email: String,
    /// Subject (user ID)
    pub sub: Uuid,
    pub admin: bool,
    /// Session epoch the token was minted under
    pub time: String,
}

/// Token kind, recorded in the claims so one can't stand in for the other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(flatten)]
    pub identity: TokenIdentity,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub token_type: TokenType,
}

/// Pre-computed HS256 key pair for one secret
#[derive(Clone)]
pub struct JwtKeys {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
        }
    }
}

/// Token issuer and validator
#[derive(Clone)]
pub struct JwtService {
    access_keys: JwtKeys,
    refresh_keys: JwtKeys,
    access_token_expiry_secs: i64,
    refresh_token_expiry_secs: i64,
}

impl JwtService {
    /// Build the service from both secrets and lifetimes.
    ///
    /// Call once at startup; the secrets must be non-empty and distinct.
    pub fn new(
        access_secret: &str,
        access_token_expiry_secs: i64,
        refresh_secret: &str,
        refresh_token_expiry_secs: i64,
    ) -> Result<Self> {
        if access_secret.is_empty() || refresh_secret.is_empty() {
            anyhow::bail!("JWT secrets must not be empty");
        }
        if access_secret == refresh_secret {
            anyhow::bail!("Access and refresh tokens must use different secrets");
        }
        if access_token_expiry_secs <= 0 || refresh_token_expiry_secs <= 0 {
            anyhow::bail!("Token lifetimes must be positive");
        }
        Ok(Self {
            access_keys: JwtKeys::new(access_secret),
            refresh_keys: JwtKeys::new(refresh_secret),
            access_token_expiry_secs,
            refresh_token_expiry_secs,
        })
    }

    #[inline]
    pub fn generate_access_token(&self, identity: &TokenIdentity) -> Result<String> {
        self.generate_token_at(identity, TokenType::Access, Utc::now())
    }

    #[inline]
    pub fn generate_refresh_token(&self, identity: &TokenIdentity) -> Result<String> {
        self.generate_token_at(identity, TokenType::Refresh, Utc::now())
    }

    fn keys(&self, token_type: TokenType) -> (&JwtKeys, i64) {
        match token_type {
            TokenType::Access => (&self.access_keys, self.access_token_expiry_secs),
            TokenType::Refresh => (&self.refresh_keys, self.refresh_token_expiry_secs),
        }
    }

    fn generate_token_at(
        &self,
        identity: &TokenIdentity,
        token_type: TokenType,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let (keys, expiry_secs) = self.keys(token_type);
        let claims = Claims {
            identity: identity.clone(),
            exp: (now + Duration::seconds(expiry_secs)).timestamp(),
            iat: now.timestamp(),
            token_type,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| anyhow::anyhow!("Failed to generate {:?} token: {}", token_type, e))
    }

    fn validate(&self, token: &str, token_type: TokenType) -> Result<Claims, AuthError> {
        let (keys, _) = self.keys(token_type);
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &keys.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken,
            })?;

        if claims.token_type != token_type {
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }

    /// Verify signature, expiry and kind of an access token
    #[inline]
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.validate(token, TokenType::Access)
    }

    /// Verify signature, expiry and kind of a refresh token
    #[inline]
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.validate(token, TokenType::Refresh)
    }

    #[inline]
    pub fn access_token_expiry_secs(&self) -> i64 {
        self.access_token_expiry_secs
    }

    #[inline]
    pub fn refresh_token_expiry_secs(&self) -> i64 {
        self.refresh_token_expiry_secs
    }
}

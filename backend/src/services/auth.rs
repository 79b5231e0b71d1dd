//! Authentication orchestration
//!
//! Ties the credential hasher, token issuer, session registry and user store
//! together. Per user the session moves between "logged out" and
//! "logged in under epoch T"; each sign-in replaces T and logout removes it.
//!
//! Nothing in here logs passwords, hashes or raw tokens.

use std::sync::Arc;

use taskboard_shared::validation::{
    normalize_email, validate_name, validate_password, MAX_PASSWORD_LEN,
};
use taskboard_shared::{AuthError, AuthTokens, SignUpRequest, UserProfile};
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::ValidateEmail;

use crate::auth::{Claims, JwtService, PasswordService, TokenIdentity, DUMMY_HASH};
use crate::repositories::{NewUser, UserAccount, UserStore};
use crate::session::SessionRegistry;
use crate::store::{with_retry, RetryPolicy};

/// Authentication service
///
/// Cheap to clone; all collaborators are shared.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: SessionRegistry,
    jwt: JwtService,
    retry: RetryPolicy,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: SessionRegistry,
        jwt: JwtService,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            users,
            sessions,
            jwt,
            retry,
        }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.users
    }

    /// Create an account. Does not log the user in.
    ///
    /// # Performance
    /// Password hashing is offloaded to the blocking thread pool.
    pub async fn sign_up(&self, req: SignUpRequest) -> Result<UserAccount, AuthError> {
        let password = match req.password {
            Some(p) if !p.is_empty() => p,
            _ => return Err(AuthError::PasswordRequired),
        };
        let email = normalize_email(&req.email);
        if !email.validate_email() {
            return Err(AuthError::Validation("Invalid email format".to_string()));
        }
        validate_password(&password).map_err(AuthError::Validation)?;
        validate_name(&req.name).map_err(AuthError::Validation)?;

        let users = &self.users;
        let email_ref = email.as_str();
        if with_retry(&self.retry, "user_find_by_email", move || {
            users.find_by_email(email_ref)
        })
        .await?
        .is_some()
        {
            metrics::counter!("auth_sign_up_total", "outcome" => "email_in_use").increment(1);
            return Err(AuthError::EmailInUse);
        }

        let password_hash = PasswordService::hash_async(password)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        // Not retried: a lost reply to a committed insert would turn into a
        // bogus duplicate on the second attempt.
        let record = self
            .users
            .create(NewUser {
                email,
                name: req.name.trim().to_string(),
                password_hash,
                is_admin: req.is_admin,
            })
            .await
            .map_err(AuthError::from)?;

        metrics::counter!("auth_sign_up_total", "outcome" => "created").increment(1);
        info!(user_id = %record.id, "User signed up");
        Ok(record.into())
    }

    /// Start a new session for an already-verified user and mint its tokens.
    ///
    /// Every token issued to this user before now stops validating.
    pub async fn sign_in(&self, user: &UserAccount) -> Result<AuthTokens, AuthError> {
        let epoch = self.sessions.stamp_login(user.id).await?;
        let identity = TokenIdentity {
            email: user.email.clone(),
            sub: user.id,
            admin: user.is_admin,
            time: epoch,
        };

        let tokens = self.issue_tokens(&identity)?;
        metrics::counter!("auth_sign_in_total", "outcome" => "success").increment(1);
        info!(user_id = %user.id, "User signed in");
        Ok(tokens)
    }

    /// Check a password for the account registered under `email`.
    ///
    /// Unknown email, wrong password and over-long candidates all yield
    /// `None`, and all of them pay for one key derivation.
    pub async fn validate_user(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserAccount>, AuthError> {
        if password.len() > MAX_PASSWORD_LEN {
            PasswordService::verify_async(DUMMY_HASH.to_string(), String::new()).await;
            return Ok(credentials_rejected());
        }

        let email = normalize_email(email);
        let users = &self.users;
        let email_ref = email.as_str();
        let record = with_retry(&self.retry, "user_find_by_email", move || {
            users.find_by_email(email_ref)
        })
        .await?;

        let stored_hash = record
            .as_ref()
            .map_or_else(|| DUMMY_HASH.to_string(), |r| r.password_hash.clone());
        let valid = PasswordService::verify_async(stored_hash, password.to_string()).await;

        match record {
            Some(record) if valid => Ok(Some(record.into())),
            _ => Ok(credentials_rejected()),
        }
    }

    /// `validate_user` followed by `sign_in`
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(UserAccount, AuthTokens), AuthError> {
        let user = self
            .validate_user(email, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let tokens = self.sign_in(&user).await?;
        Ok((user, tokens))
    }

    /// Validate an access token against the current session epoch.
    ///
    /// This is the check every authenticated route goes through.
    pub async fn validate_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.jwt.validate_access_token(token).map_err(rejected)?;
        self.ensure_current(&claims).await?;
        Ok(claims)
    }

    /// Validate a refresh token against the current session epoch.
    ///
    /// Held to the same epoch match as access tokens, so a newer login
    /// elsewhere also retires refresh tokens from older logins.
    pub async fn validate_refresh_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.jwt.validate_refresh_token(token).map_err(rejected)?;
        self.ensure_current(&claims).await?;
        Ok(claims)
    }

    /// Re-mint both tokens from a valid refresh token, keeping the epoch.
    ///
    /// The epoch is not re-stamped and its key keeps the expiry set at
    /// sign-in, so a session lasts at most one refresh-token lifetime from
    /// its login however often it is refreshed. Returns the token owner.
    pub async fn refresh(&self, refresh_token: &str) -> Result<(Uuid, AuthTokens), AuthError> {
        let claims = self.validate_refresh_token(refresh_token).await?;
        let tokens = self.issue_tokens(&claims.identity)?;
        debug!(user_id = %claims.identity.sub, "Tokens refreshed");
        Ok((claims.identity.sub, tokens))
    }

    /// End the user's session; all outstanding tokens stop validating.
    pub async fn logout(&self, user_id: Uuid) -> Result<(), AuthError> {
        self.sessions.clear_login(user_id).await?;
        info!(user_id = %user_id, "User logged out");
        Ok(())
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<UserProfile, AuthError> {
        let users = &self.users;
        let record = with_retry(&self.retry, "user_find_by_id", move || {
            users.find_by_id(user_id)
        })
        .await?
        // A valid token for a vanished account is as good as no token
        .ok_or(AuthError::InvalidToken)?;

        Ok(UserAccount::from(record).into())
    }

    async fn ensure_current(&self, claims: &Claims) -> Result<(), AuthError> {
        let current = self.sessions.current_epoch(claims.identity.sub).await?;
        if current.as_deref() != Some(claims.identity.time.as_str()) {
            warn!(user_id = %claims.identity.sub, "Token from a superseded session");
            return Err(rejected(AuthError::SessionSuperseded));
        }
        Ok(())
    }

    fn issue_tokens(&self, identity: &TokenIdentity) -> Result<AuthTokens, AuthError> {
        let access_token = self
            .jwt
            .generate_access_token(identity)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let refresh_token = self
            .jwt
            .generate_refresh_token(identity)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        Ok(AuthTokens {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.access_token_expiry_secs(),
        })
    }
}

fn credentials_rejected() -> Option<UserAccount> {
    metrics::counter!("auth_sign_in_total", "outcome" => "rejected").increment(1);
    debug!("Credential check failed");
    None
}

/// Count a token rejection and pass the error through
fn rejected(err: AuthError) -> AuthError {
    metrics::counter!("auth_token_rejected_total", "reason" => err.reason()).increment(1);
    err
}

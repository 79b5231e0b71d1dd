//! Application state management
//!
//! Shared resources handed to every request handler through Axum's state
//! extraction. Everything is built once at startup and cheap to clone.

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusHandle;
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::JwtService;
use crate::config::AppConfig;
use crate::events::EventBus;
use crate::repositories::UserStore;
use crate::services::AuthService;
use crate::session::{SessionRegistry, SessionStore};
use crate::store::RetryPolicy;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: AuthService,
    pub events: EventBus,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Wire the auth core on top of the given stores.
    ///
    /// Pre-computes both JWT key pairs from the configured secrets.
    pub fn new(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        session_store: Arc<dyn SessionStore>,
    ) -> Result<Self> {
        let retry = RetryPolicy::from(&config.retry);

        let jwt = JwtService::new(
            config.jwt.access_secret.expose_secret(),
            config.jwt.access_token_expiry_secs,
            config.jwt.refresh_secret.expose_secret(),
            config.jwt.refresh_token_expiry_secs,
        )?;

        // An epoch never needs to outlive the longest-lived token minted under it
        let session_ttl = Duration::from_secs(config.jwt.refresh_token_expiry_secs.max(1) as u64);
        let sessions = SessionRegistry::new(
            session_store,
            &config.session.key_prefix,
            session_ttl,
            retry,
        );

        Ok(Self {
            config: Arc::new(config),
            auth: AuthService::new(users, sessions, jwt, retry),
            events: EventBus::default(),
            metrics: None,
        })
    }

    /// Attach the Prometheus handle rendered by `/metrics`
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    #[inline]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[inline]
    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    #[inline]
    pub fn events(&self) -> &EventBus {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::InMemoryUserStore;
    use crate::session::InMemorySessionStore;
    use secrecy::Secret;

    #[test]
    fn test_state_builds_from_default_config() {
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(InMemoryUserStore::new()),
            Arc::new(InMemorySessionStore::new()),
        )
        .unwrap();

        let _cloned = state.clone();
        assert_eq!(state.auth().jwt().access_token_expiry_secs(), 900);
        assert!(state.metrics.is_none());
    }

    #[test]
    fn test_identical_secrets_refused() {
        let mut config = AppConfig::default();
        config.jwt.refresh_secret = Secret::new("development-access-secret-change-me".to_string());

        let result = AppState::new(
            config,
            Arc::new(InMemoryUserStore::new()),
            Arc::new(InMemorySessionStore::new()),
        );
        assert!(result.is_err());
    }
}

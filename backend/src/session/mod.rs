//! Session registry
//!
//! Records, per user, the timestamp of the most recent login (the session
//! epoch). Every token embeds the epoch it was minted under, so overwriting
//! or deleting the epoch invalidates all tokens issued before. The latest
//! login always wins; there is at most one live session per user.

mod memory;
mod redis_store;

pub use memory::InMemorySessionStore;
pub use redis_store::RedisSessionStore;

use async_trait::async_trait;
use chrono::{SecondsFormat, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::store::{with_retry, RetryPolicy, StoreError};

/// String key-value store holding session epochs
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Write `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn del(&self, key: &str) -> Result<(), StoreError>;

    /// Cheap liveness probe for readiness checks
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Per-user session epochs on top of a [`SessionStore`]
#[derive(Clone)]
pub struct SessionRegistry {
    store: Arc<dyn SessionStore>,
    key_prefix: Arc<str>,
    ttl: Duration,
    retry: RetryPolicy,
    last_epoch_micros: Arc<AtomicI64>,
}

impl SessionRegistry {
    /// `ttl` bounds how long an epoch survives without a logout; it should
    /// be at least the refresh-token lifetime.
    pub fn new(
        store: Arc<dyn SessionStore>,
        key_prefix: &str,
        ttl: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            key_prefix: Arc::from(key_prefix),
            ttl,
            retry,
            last_epoch_micros: Arc::new(AtomicI64::new(0)),
        }
    }

    fn key(&self, user_id: Uuid) -> String {
        format!("{}:{}", self.key_prefix, user_id)
    }

    /// Next epoch timestamp, strictly later than any this registry handed out
    fn next_epoch(&self) -> String {
        let now = Utc::now().timestamp_micros();
        let previous = self
            .last_epoch_micros
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        let micros = now.max(previous + 1);

        Utc.timestamp_opt(
            micros.div_euclid(1_000_000),
            (micros.rem_euclid(1_000_000) * 1_000) as u32,
        )
        .single()
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Record a new login for `user_id`, superseding every earlier token.
    ///
    /// Returns the epoch to embed in the tokens of this login.
    pub async fn stamp_login(&self, user_id: Uuid) -> Result<String, StoreError> {
        let key = self.key(user_id);
        let epoch = self.next_epoch();
        let (store, ttl) = (&self.store, self.ttl);
        let (key_ref, epoch_ref) = (key.as_str(), epoch.as_str());

        with_retry(&self.retry, "session_set", move || {
            store.set(key_ref, epoch_ref, ttl)
        })
        .await?;

        debug!(user_id = %user_id, "Session epoch stamped");
        Ok(epoch)
    }

    /// Current epoch for `user_id`, `None` when logged out
    pub async fn current_epoch(&self, user_id: Uuid) -> Result<Option<String>, StoreError> {
        let key = self.key(user_id);
        let store = &self.store;
        let key_ref = key.as_str();

        with_retry(&self.retry, "session_get", move || store.get(key_ref)).await
    }

    /// Forget the epoch for `user_id`, invalidating all of its tokens
    pub async fn clear_login(&self, user_id: Uuid) -> Result<(), StoreError> {
        let key = self.key(user_id);
        let store = &self.store;
        let key_ref = key.as_str();

        with_retry(&self.retry, "session_del", move || store.del(key_ref)).await?;

        debug!(user_id = %user_id, "Session epoch cleared");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }
}

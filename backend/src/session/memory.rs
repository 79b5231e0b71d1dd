//! Process-local session store

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::SessionStore;
use crate::store::StoreError;

/// In-memory [`SessionStore`] with per-key expiry.
///
/// Suitable for tests and single-process development setups only.
#[derive(Default)]
pub struct InMemorySessionStore {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = Instant::now() + ttl;
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some((value, expires_at)) if *expires_at > Instant::now() => {
                    return Ok(Some(value.clone()))
                }
                Some(_) => {}
            }
        }

        // Expired: drop it unless it was refreshed in the meantime
        let mut entries = self.entries.write().await;
        if matches!(entries.get(key), Some((_, expires_at)) if *expires_at <= Instant::now()) {
            entries.remove(key);
        }
        Ok(entries.get(key).map(|(value, _)| value.clone()))
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

//! Redis-backed session store

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError};
use std::time::Duration;
use tracing::info;

use super::SessionStore;
use crate::store::StoreError;

/// [`SessionStore`] on a shared Redis connection manager.
///
/// The manager reconnects on its own; calls that hit a broken connection
/// come back as transient errors and are retried by the registry.
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: ConnectionManager,
}

impl RedisSessionStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Open a connection manager for `url`
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| anyhow::anyhow!("Invalid Redis URL: {}", e))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to Redis: {}", e))?;
        info!("Redis connection established");
        Ok(Self::new(conn))
    }
}

fn classify(err: RedisError) -> StoreError {
    if is_transient(&err) {
        StoreError::Transient(err.to_string())
    } else {
        StoreError::Unavailable(err.to_string())
    }
}

fn is_transient(err: &RedisError) -> bool {
    err.is_io_error()
        || err.is_connection_refusal()
        || err.is_connection_dropped()
        || err.is_timeout()
        || matches!(
            err.kind(),
            redis::ErrorKind::TryAgain | redis::ErrorKind::BusyLoadingError
        )
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(classify)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(classify)
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.del::<_, i64>(key).await.map(|_| ()).map_err(classify)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(classify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_transient() {
        let err = RedisError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert!(matches!(classify(err), StoreError::Transient(_)));
    }

    #[test]
    fn type_errors_are_not_transient() {
        let err = RedisError::from((redis::ErrorKind::TypeError, "wrong type"));
        assert!(matches!(classify(err), StoreError::Unavailable(_)));
    }

    #[tokio::test]
    #[ignore = "requires redis"]
    async fn round_trip_against_redis() {
        let url = std::env::var("TEST_REDIS_URL")
            .unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let store = RedisSessionStore::connect(&url).await.unwrap();
        let key = format!("test:{}", uuid::Uuid::new_v4());

        store.set(&key, "epoch", Duration::from_secs(30)).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap().as_deref(), Some("epoch"));
        store.del(&key).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap(), None);
    }
}

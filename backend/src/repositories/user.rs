//! User credential records and their stores

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use taskboard_shared::UserProfile;
use uuid::Uuid;

use crate::store::StoreError;

/// User record as stored, including the password hash
#[derive(Clone, sqlx::FromRow)]
pub struct CredentialRecord {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

// The hash stays out of logs
impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("is_admin", &self.is_admin)
            .finish_non_exhaustive()
    }
}

/// A user with the password hash stripped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<CredentialRecord> for UserAccount {
    fn from(record: CredentialRecord) -> Self {
        Self {
            id: record.id,
            email: record.email,
            name: record.name,
            is_admin: record.is_admin,
            created_at: record.created_at,
        }
    }
}

impl From<UserAccount> for UserProfile {
    fn from(account: UserAccount) -> Self {
        Self {
            id: account.id.to_string(),
            email: account.email,
            name: account.name,
            is_admin: account.is_admin,
            created_at: account.created_at,
        }
    }
}

/// Input for creating a user; the password is already hashed
#[derive(Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub is_admin: bool,
}

/// Keyed store of user credential records
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<CredentialRecord>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CredentialRecord>, StoreError>;

    /// Insert a user; an existing email yields [`StoreError::Duplicate`]
    async fn create(&self, user: NewUser) -> Result<CredentialRecord, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Postgres user repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map sqlx errors onto the store taxonomy
pub(crate) fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::Duplicate(db.constraint().unwrap_or("unique").to_string());
        }
    }
    match err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => StoreError::Transient(err.to_string()),
        sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => {
            StoreError::Unavailable(err.to_string())
        }
        other => StoreError::Other(other.into()),
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<CredentialRecord>, StoreError> {
        sqlx::query_as::<_, CredentialRecord>(
            r#"
            SELECT id, email, name, password_hash, is_admin, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CredentialRecord>, StoreError> {
        sqlx::query_as::<_, CredentialRecord>(
            r#"
            SELECT id, email, name, password_hash, is_admin, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn create(&self, user: NewUser) -> Result<CredentialRecord, StoreError> {
        sqlx::query_as::<_, CredentialRecord>(
            r#"
            INSERT INTO users (email, name, password_hash, is_admin)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, name, password_hash, is_admin, created_at
            "#,
        )
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        crate::db::health_check(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

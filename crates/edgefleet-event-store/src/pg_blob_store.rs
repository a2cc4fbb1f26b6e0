//! `PostgreSQL` implementation of the `ConfigBlobStore` trait.

use async_trait::async_trait;
use sqlx::PgPool;

use edgefleet_core::blob::ConfigBlobStore;
use edgefleet_core::error::DomainError;

use crate::pg_event_repository::infrastructure;

/// PostgreSQL-backed configuration body store.
#[derive(Debug, Clone)]
pub struct PgConfigBlobStore {
    pool: PgPool,
}

impl PgConfigBlobStore {
    /// Creates a new `PgConfigBlobStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConfigBlobStore for PgConfigBlobStore {
    async fn put(&self, hash: &str, body: &str) -> Result<bool, DomainError> {
        let result = sqlx::query(
            "INSERT INTO config_blobs (config_hash, body) VALUES ($1, $2) \
             ON CONFLICT (config_hash) DO NOTHING",
        )
        .bind(hash)
        .bind(body)
        .execute(&self.pool)
        .await
        .map_err(|e| infrastructure("blob write failed", &e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn get(&self, hash: &str) -> Result<Option<String>, DomainError> {
        sqlx::query_scalar("SELECT body FROM config_blobs WHERE config_hash = $1")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| infrastructure("blob load failed", &e))
    }
}

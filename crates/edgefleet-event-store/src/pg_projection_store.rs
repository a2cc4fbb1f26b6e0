//! `PostgreSQL` implementation of the `ProjectionStore` trait.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use edgefleet_core::error::DomainError;
use edgefleet_core::event::AggregateType;
use edgefleet_core::projection::{ProjectionFilter, ProjectionRow, ProjectionStore};

use crate::pg_event_repository::infrastructure;

const UPSERT: &str = "INSERT INTO projections \
        (aggregate_type, aggregate_id, state, owner_id, version, document, updated_at) \
     VALUES ($1, $2, $3, $4, $5, $6, $7) \
     ON CONFLICT (aggregate_type, aggregate_id) DO UPDATE SET \
        state = EXCLUDED.state, \
        owner_id = EXCLUDED.owner_id, \
        version = EXCLUDED.version, \
        document = EXCLUDED.document, \
        updated_at = EXCLUDED.updated_at";

/// PostgreSQL-backed read model.
#[derive(Debug, Clone)]
pub struct PgProjectionStore {
    pool: PgPool,
}

impl PgProjectionStore {
    /// Creates a new `PgProjectionStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn write(&self, sql: &str, row: &ProjectionRow) -> Result<(), DomainError> {
        sqlx::query(sql)
            .bind(row.aggregate_type.as_str())
            .bind(&row.aggregate_id)
            .bind(&row.state)
            .bind(&row.owner_id)
            .bind(row.version)
            .bind(&row.document)
            .bind(row.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| infrastructure("projection upsert failed", &e))?;
        Ok(())
    }
}

fn decode(row: &PgRow) -> Result<ProjectionRow, DomainError> {
    let map = |e: sqlx::Error| infrastructure("projection decode failed", &e);
    let aggregate_type: String = row.try_get("aggregate_type").map_err(map)?;
    Ok(ProjectionRow {
        aggregate_id: row.try_get("aggregate_id").map_err(map)?,
        aggregate_type: aggregate_type.parse()?,
        state: row.try_get("state").map_err(map)?,
        owner_id: row.try_get("owner_id").map_err(map)?,
        version: row.try_get("version").map_err(map)?,
        document: row.try_get("document").map_err(map)?,
        updated_at: row.try_get("updated_at").map_err(map)?,
    })
}

#[async_trait]
impl ProjectionStore for PgProjectionStore {
    async fn upsert(&self, row: &ProjectionRow) -> Result<(), DomainError> {
        // A late writer carrying an older version leaves the row untouched.
        let sql = format!("{UPSERT} WHERE projections.version <= EXCLUDED.version");
        self.write(&sql, row).await
    }

    async fn replace(&self, row: &ProjectionRow) -> Result<(), DomainError> {
        self.write(UPSERT, row).await
    }

    async fn get(
        &self,
        aggregate_type: AggregateType,
        aggregate_id: &str,
    ) -> Result<Option<ProjectionRow>, DomainError> {
        let row = sqlx::query(
            "SELECT aggregate_type, aggregate_id, state, owner_id, version, document, updated_at \
             FROM projections WHERE aggregate_type = $1 AND aggregate_id = $2",
        )
        .bind(aggregate_type.as_str())
        .bind(aggregate_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| infrastructure("projection load failed", &e))?;
        row.as_ref().map(decode).transpose()
    }

    async fn list(
        &self,
        aggregate_type: AggregateType,
        filter: &ProjectionFilter,
    ) -> Result<Vec<ProjectionRow>, DomainError> {
        let rows = sqlx::query(
            "SELECT aggregate_type, aggregate_id, state, owner_id, version, document, updated_at \
             FROM projections \
             WHERE aggregate_type = $1 \
               AND ($2::TEXT IS NULL OR state = $2) \
               AND ($3::TEXT IS NULL OR owner_id = $3) \
             ORDER BY updated_at DESC, aggregate_id ASC",
        )
        .bind(aggregate_type.as_str())
        .bind(&filter.state)
        .bind(&filter.owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| infrastructure("projection list failed", &e))?;
        rows.iter().map(decode).collect()
    }
}

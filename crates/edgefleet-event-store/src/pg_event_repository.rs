//! `PostgreSQL` implementation of the `EventRepository` trait.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use edgefleet_core::error::DomainError;
use edgefleet_core::event::AggregateType;
use edgefleet_core::repository::{EventRepository, StoredEvent, check_batch_versions};

/// PostgreSQL-backed event repository.
#[derive(Debug, Clone)]
pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    /// Creates a new `PgEventRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn infrastructure(context: &str, err: &sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("{context}: {err}"))
}

async fn max_version(
    executor: impl sqlx::PgExecutor<'_>,
    aggregate_id: &str,
    aggregate_type: AggregateType,
) -> Result<i64, DomainError> {
    let version: Option<i64> = sqlx::query_scalar(
        "SELECT MAX(version) FROM domain_events WHERE aggregate_type = $1 AND aggregate_id = $2",
    )
    .bind(aggregate_type.as_str())
    .bind(aggregate_id)
    .fetch_one(executor)
    .await
    .map_err(|e| infrastructure("version lookup failed", &e))?;
    Ok(version.unwrap_or(-1))
}

fn decode(row: &PgRow) -> Result<StoredEvent, DomainError> {
    let map = |e: sqlx::Error| infrastructure("event decode failed", &e);
    let aggregate_type: String = row.try_get("aggregate_type").map_err(map)?;
    Ok(StoredEvent {
        event_id: row.try_get("event_id").map_err(map)?,
        aggregate_id: row.try_get("aggregate_id").map_err(map)?,
        aggregate_type: aggregate_type.parse()?,
        event_type: row.try_get("event_type").map_err(map)?,
        payload: row.try_get("payload").map_err(map)?,
        version: row.try_get("version").map_err(map)?,
        correlation_id: row.try_get("correlation_id").map_err(map)?,
        causation_id: row.try_get("causation_id").map_err(map)?,
        occurred_at: row.try_get("occurred_at").map_err(map)?,
    })
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn load_events(
        &self,
        aggregate_id: &str,
        aggregate_type: AggregateType,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let rows = sqlx::query(
            "SELECT event_id, aggregate_id, aggregate_type, event_type, payload, version, \
                    correlation_id, causation_id, occurred_at \
             FROM domain_events \
             WHERE aggregate_type = $1 AND aggregate_id = $2 \
             ORDER BY version ASC",
        )
        .bind(aggregate_type.as_str())
        .bind(aggregate_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| infrastructure("event load failed", &e))?;

        rows.iter().map(decode).collect()
    }

    async fn append_events(
        &self,
        aggregate_id: &str,
        aggregate_type: AggregateType,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }
        check_batch_versions(aggregate_id, expected_version, events)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| infrastructure("transaction start failed", &e))?;

        let actual = max_version(&mut *tx, aggregate_id, aggregate_type).await?;
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id: aggregate_id.to_owned(),
                expected: expected_version,
                actual,
            });
        }

        for event in events {
            let inserted = sqlx::query(
                "INSERT INTO domain_events \
                    (event_id, aggregate_id, aggregate_type, event_type, payload, version, \
                     correlation_id, causation_id, occurred_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(event.event_id)
            .bind(aggregate_id)
            .bind(aggregate_type.as_str())
            .bind(&event.event_type)
            .bind(&event.payload)
            .bind(event.version)
            .bind(event.correlation_id)
            .bind(event.causation_id)
            .bind(event.occurred_at)
            .execute(&mut *tx)
            .await;

            match inserted {
                Ok(_) => {}
                // A concurrent writer committed the same version first.
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    return Err(DomainError::ConcurrencyConflict {
                        aggregate_id: aggregate_id.to_owned(),
                        expected: expected_version,
                        actual: event.version,
                    });
                }
                Err(e) => return Err(infrastructure("event append failed", &e)),
            }
        }

        tx.commit()
            .await
            .map_err(|e| infrastructure("transaction commit failed", &e))?;

        tracing::debug!(
            aggregate_id,
            aggregate_type = aggregate_type.as_str(),
            count = events.len(),
            "appended events"
        );
        Ok(())
    }

    async fn current_version(
        &self,
        aggregate_id: &str,
        aggregate_type: AggregateType,
    ) -> Result<i64, DomainError> {
        max_version(&self.pool, aggregate_id, aggregate_type).await
    }
}

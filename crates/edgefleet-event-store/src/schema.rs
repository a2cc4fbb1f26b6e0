//! Event store database schema.
//!
//! The DDL lives in the workspace `migrations/` directory so that
//! `#[sqlx::test]` and the server apply the same schema.

use edgefleet_core::error::DomainError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Append-only event log.
pub const EVENTS_TABLE: &str = "domain_events";

/// One row per aggregate holding its latest projected status.
pub const PROJECTIONS_TABLE: &str = "projections";

/// Content-addressed configuration bodies.
pub const CONFIG_BLOBS_TABLE: &str = "config_blobs";

/// Opens a connection pool against `database_url`.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the database is unreachable.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, DomainError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| DomainError::Infrastructure(format!("database connection failed: {e}")))
}

/// Applies all pending migrations.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DomainError> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| DomainError::Infrastructure(format!("migration failed: {e}")))?;
    tracing::info!("database migrations applied");
    Ok(())
}

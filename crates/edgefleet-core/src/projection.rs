//! Read model abstraction.
//!
//! A projection row is the latest snapshot of one aggregate. Rows are a cache
//! of the event log: they are overwritten after every applied event and can
//! always be rebuilt by replaying the stream.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::event::AggregateType;

/// One denormalized read model row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRow {
    /// Aggregate identifier.
    pub aggregate_id: String,
    /// Kind of aggregate the row projects.
    pub aggregate_type: AggregateType,
    /// Current state name, used for filtering.
    pub state: String,
    /// Owning aggregate, e.g. the gateway of a configuration update.
    pub owner_id: Option<String>,
    /// Version of the last event folded into this row.
    pub version: i64,
    /// Full projected status document.
    pub document: serde_json::Value,
    /// When the row was last written.
    pub updated_at: DateTime<Utc>,
}

/// Filter for listing projection rows.
#[derive(Debug, Clone, Default)]
pub struct ProjectionFilter {
    /// Only rows in this state.
    pub state: Option<String>,
    /// Only rows owned by this aggregate.
    pub owner_id: Option<String>,
}

impl ProjectionFilter {
    /// Returns `true` if `row` passes the filter.
    #[must_use]
    pub fn matches(&self, row: &ProjectionRow) -> bool {
        self.state.as_ref().is_none_or(|s| *s == row.state)
            && self
                .owner_id
                .as_ref()
                .is_none_or(|o| row.owner_id.as_ref() == Some(o))
    }
}

/// Store for row-per-aggregate projections.
#[async_trait]
pub trait ProjectionStore: Send + Sync {
    /// Inserts or replaces the row for `(row.aggregate_type, row.aggregate_id)`.
    ///
    /// A row older than the stored one (lower `version`) is discarded, so a
    /// slow writer never moves the read model back behind the event log.
    async fn upsert(&self, row: &ProjectionRow) -> Result<(), DomainError>;

    /// Writes the row unconditionally. Used when rebuilding from the event log.
    async fn replace(&self, row: &ProjectionRow) -> Result<(), DomainError>;

    /// Fetches a single row.
    async fn get(
        &self,
        aggregate_type: AggregateType,
        aggregate_id: &str,
    ) -> Result<Option<ProjectionRow>, DomainError>;

    /// Lists rows of one aggregate type, most recently updated first.
    async fn list(
        &self,
        aggregate_type: AggregateType,
        filter: &ProjectionFilter,
    ) -> Result<Vec<ProjectionRow>, DomainError>;
}

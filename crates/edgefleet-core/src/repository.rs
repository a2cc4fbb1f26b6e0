//! Event repository abstraction.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DomainError;
use crate::event::AggregateType;

/// Stored representation of a domain event.
#[derive(Debug, Clone)]
pub struct StoredEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate this event belongs to.
    pub aggregate_id: String,
    /// Kind of aggregate this event belongs to.
    pub aggregate_type: AggregateType,
    /// Event type name for deserialization routing.
    pub event_type: String,
    /// Serialized event payload.
    pub payload: serde_json::Value,
    /// Version within the aggregate stream, starting at 0.
    pub version: i64,
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Causation ID linking to the causing event/command.
    pub causation_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: chrono::DateTime<chrono::Utc>,
}

/// Repository trait for loading and appending domain events.
///
/// Streams are keyed by `(aggregate_id, aggregate_type)`. Versions inside a
/// stream are gap-free and start at 0; events are never updated or removed.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Load all events for a given aggregate, ordered by version.
    async fn load_events(
        &self,
        aggregate_id: &str,
        aggregate_type: AggregateType,
    ) -> Result<Vec<StoredEvent>, DomainError>;

    /// Append new events to an aggregate stream with optimistic concurrency.
    ///
    /// `expected_version` is the last known version (-1 for a new stream).
    /// The events must carry versions `expected_version + 1`, `+ 2`, ...
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConcurrencyConflict` if the stream moved on or
    /// the batch does not continue it without gaps.
    async fn append_events(
        &self,
        aggregate_id: &str,
        aggregate_type: AggregateType,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError>;

    /// Returns the current version of a stream, or -1 if it has no events.
    async fn current_version(
        &self,
        aggregate_id: &str,
        aggregate_type: AggregateType,
    ) -> Result<i64, DomainError> {
        let events = self.load_events(aggregate_id, aggregate_type).await?;
        Ok(events.last().map_or(-1, |e| e.version))
    }
}

#[async_trait]
impl<R: EventRepository + ?Sized> EventRepository for Arc<R> {
    async fn load_events(
        &self,
        aggregate_id: &str,
        aggregate_type: AggregateType,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        (**self).load_events(aggregate_id, aggregate_type).await
    }

    async fn append_events(
        &self,
        aggregate_id: &str,
        aggregate_type: AggregateType,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        (**self)
            .append_events(aggregate_id, aggregate_type, expected_version, events)
            .await
    }

    async fn current_version(
        &self,
        aggregate_id: &str,
        aggregate_type: AggregateType,
    ) -> Result<i64, DomainError> {
        (**self).current_version(aggregate_id, aggregate_type).await
    }
}

/// Checks that `events` continue a stream at `expected_version` without gaps.
///
/// Shared by repository implementations before they touch storage.
///
/// # Errors
///
/// Returns `DomainError::ConcurrencyConflict` naming the first version that
/// does not line up.
pub fn check_batch_versions(
    aggregate_id: &str,
    expected_version: i64,
    events: &[StoredEvent],
) -> Result<(), DomainError> {
    let mut next = expected_version + 1;
    for event in events {
        if event.version != next {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id: aggregate_id.to_owned(),
                expected: next,
                actual: event.version,
            });
        }
        next += 1;
    }
    Ok(())
}

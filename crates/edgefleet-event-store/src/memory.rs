//! In-process implementation of every storage port.
//!
//! `InMemoryEventStore` keeps the event log, the read model and the blob
//! table behind mutexes. It enforces the same version rules as the
//! `PostgreSQL` adapters, so handlers behave identically against either.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use edgefleet_core::blob::ConfigBlobStore;
use edgefleet_core::error::DomainError;
use edgefleet_core::event::AggregateType;
use edgefleet_core::projection::{ProjectionFilter, ProjectionRow, ProjectionStore};
use edgefleet_core::repository::{EventRepository, StoredEvent, check_batch_versions};

type StreamKey = (AggregateType, String);

/// Event log, read model and blob store held in memory.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: Mutex<HashMap<StreamKey, Vec<StoredEvent>>>,
    projections: Mutex<HashMap<StreamKey, ProjectionRow>>,
    blobs: Mutex<HashMap<String, String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, DomainError> {
    mutex
        .lock()
        .map_err(|_| DomainError::Infrastructure("in-memory store lock poisoned".to_owned()))
}

impl InMemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lists every stream key currently holding events.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the store lock is poisoned.
    pub fn stream_ids(
        &self,
        aggregate_type: AggregateType,
    ) -> Result<Vec<String>, DomainError> {
        let streams = lock(&self.streams)?;
        let mut ids: Vec<String> = streams
            .keys()
            .filter(|(kind, _)| *kind == aggregate_type)
            .map(|(_, id)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl EventRepository for InMemoryEventStore {
    async fn load_events(
        &self,
        aggregate_id: &str,
        aggregate_type: AggregateType,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let streams = lock(&self.streams)?;
        Ok(streams
            .get(&(aggregate_type, aggregate_id.to_owned()))
            .cloned()
            .unwrap_or_default())
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

        let mut streams = lock(&self.streams)?;
        let stream = streams
            .entry((aggregate_type, aggregate_id.to_owned()))
            .or_default();
        let actual = stream.last().map_or(-1, |e| e.version);
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id: aggregate_id.to_owned(),
                expected: expected_version,
                actual,
            });
        }
        stream.extend_from_slice(events);
        Ok(())
    }
}

#[async_trait]
impl ProjectionStore for InMemoryEventStore {
    async fn upsert(&self, row: &ProjectionRow) -> Result<(), DomainError> {
        let mut projections = lock(&self.projections)?;
        let key = (row.aggregate_type, row.aggregate_id.clone());
        if projections
            .get(&key)
            .is_some_and(|stored| stored.version > row.version)
        {
            return Ok(());
        }
        projections.insert(key, row.clone());
        Ok(())
    }

    async fn replace(&self, row: &ProjectionRow) -> Result<(), DomainError> {
        let mut projections = lock(&self.projections)?;
        projections.insert((row.aggregate_type, row.aggregate_id.clone()), row.clone());
        Ok(())
    }

    async fn get(
        &self,
        aggregate_type: AggregateType,
        aggregate_id: &str,
    ) -> Result<Option<ProjectionRow>, DomainError> {
        let projections = lock(&self.projections)?;
        Ok(projections
            .get(&(aggregate_type, aggregate_id.to_owned()))
            .cloned())
    }

    async fn list(
        &self,
        aggregate_type: AggregateType,
        filter: &ProjectionFilter,
    ) -> Result<Vec<ProjectionRow>, DomainError> {
        let projections = lock(&self.projections)?;
        let mut rows: Vec<ProjectionRow> = projections
            .values()
            .filter(|row| row.aggregate_type == aggregate_type && filter.matches(row))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.aggregate_id.cmp(&b.aggregate_id))
        });
        Ok(rows)
    }
}

#[async_trait]
impl ConfigBlobStore for InMemoryEventStore {
    async fn put(&self, hash: &str, body: &str) -> Result<bool, DomainError> {
        let mut blobs = lock(&self.blobs)?;
        if blobs.contains_key(hash) {
            return Ok(false);
        }
        blobs.insert(hash.to_owned(), body.to_owned());
        Ok(true)
    }

    async fn get(&self, hash: &str) -> Result<Option<String>, DomainError> {
        let blobs = lock(&self.blobs)?;
        Ok(blobs.get(hash).cloned())
    }
}

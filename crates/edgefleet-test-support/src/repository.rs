//! Test repositories — mock `EventRepository` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use edgefleet_core::error::DomainError;
use edgefleet_core::event::AggregateType;
use edgefleet_core::repository::{EventRepository, StoredEvent};

/// One recorded `append_events` call.
pub type AppendCall = (String, AggregateType, i64, Vec<StoredEvent>);

/// An event repository that records all `append_events` calls. Returns the
/// configured result from `load_events` on every call and always succeeds on
/// `append_events`.
#[derive(Debug)]
pub struct RecordingEventRepository {
    load_result: Mutex<Vec<StoredEvent>>,
    appended: Mutex<Vec<AppendCall>>,
}

impl RecordingEventRepository {
    /// Create a new recording repository that will return `load_result` from
    /// every `load_events` call.
    ///
    /// # Panics
    ///
    /// Panics if `load_result` is an `Err`; use `FailingEventRepository` for
    /// error scenarios.
    #[must_use]
    pub fn new(load_result: Result<Vec<StoredEvent>, DomainError>) -> Self {
        Self {
            load_result: Mutex::new(load_result.expect(
                "RecordingEventRepository::new does not accept Err; use FailingEventRepository",
            )),
            appended: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all append calls.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn appended_events(&self) -> Vec<AppendCall> {
        self.appended.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventRepository for RecordingEventRepository {
    async fn load_events(
        &self,
        _aggregate_id: &str,
        _aggregate_type: AggregateType,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self.load_result.lock().unwrap().clone())
    }

    async fn append_events(
        &self,
        aggregate_id: &str,
        aggregate_type: AggregateType,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        self.appended.lock().unwrap().push((
            aggregate_id.to_owned(),
            aggregate_type,
            expected_version,
            events.to_vec(),
        ));
        Ok(())
    }
}

/// An event repository that always returns an empty event list and silently
/// accepts appends. Useful for testing "aggregate not found" scenarios and
/// creation commands.
#[derive(Debug)]
pub struct EmptyEventRepository;

#[async_trait]
impl EventRepository for EmptyEventRepository {
    async fn load_events(
        &self,
        _aggregate_id: &str,
        _aggregate_type: AggregateType,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(vec![])
    }

    async fn append_events(
        &self,
        _aggregate_id: &str,
        _aggregate_type: AggregateType,
        _expected_version: i64,
        _events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        Ok(())
    }
}

/// An event repository that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventRepository;

#[async_trait]
impl EventRepository for FailingEventRepository {
    async fn load_events(
        &self,
        _aggregate_id: &str,
        _aggregate_type: AggregateType,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn append_events(
        &self,
        _aggregate_id: &str,
        _aggregate_type: AggregateType,
        _expected_version: i64,
        _events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}

/// Wraps a repository and rejects the first `conflicts` appends with a
/// concurrency conflict, as if another writer got there first.
#[derive(Debug)]
pub struct ConflictingEventRepository<R> {
    inner: R,
    remaining: Mutex<usize>,
    attempts: Mutex<usize>,
}

impl<R> ConflictingEventRepository<R> {
    /// Wraps `inner`, failing its next `conflicts` appends.
    #[must_use]
    pub fn new(inner: R, conflicts: usize) -> Self {
        Self {
            inner,
            remaining: Mutex::new(conflicts),
            attempts: Mutex::new(0),
        }
    }

    /// Number of `append_events` calls seen, including rejected ones.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn append_attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }

    /// Returns the wrapped repository.
    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait]
impl<R: EventRepository> EventRepository for ConflictingEventRepository<R> {
    async fn load_events(
        &self,
        aggregate_id: &str,
        aggregate_type: AggregateType,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        self.inner.load_events(aggregate_id, aggregate_type).await
    }

    async fn append_events(
        &self,
        aggregate_id: &str,
        aggregate_type: AggregateType,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        *self.attempts.lock().unwrap() += 1;
        let reject = {
            let mut remaining = self.remaining.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                true
            } else {
                false
            }
        };
        if reject {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id: aggregate_id.to_owned(),
                expected: expected_version,
                actual: expected_version + 1,
            });
        }
        self.inner
            .append_events(aggregate_id, aggregate_type, expected_version, events)
            .await
    }
}

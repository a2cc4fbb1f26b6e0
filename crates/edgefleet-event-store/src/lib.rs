//! Edgefleet Event Store — storage adapters for the core ports.
//!
//! `pg_*` modules back the event log, the read model and the configuration
//! blobs with `PostgreSQL`. The `memory` module provides a single in-process
//! store implementing all three ports, used by tests and by the API when no
//! database is configured.

pub mod memory;
pub mod pg_blob_store;
pub mod pg_event_repository;
pub mod pg_projection_store;
pub mod schema;

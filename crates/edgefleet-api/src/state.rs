//! Shared application state.

use std::sync::Arc;

use edgefleet_core::clock::Clock;
use edgefleet_core::container::ContainerManager;
use edgefleet_event_store::memory::InMemoryEventStore;
use edgefleet_event_store::pg_blob_store::PgConfigBlobStore;
use edgefleet_event_store::pg_event_repository::PgEventRepository;
use edgefleet_event_store::pg_projection_store::PgProjectionStore;
use edgefleet_worker::config::WorkerConfig;
use edgefleet_worker::dispatcher::Dispatcher;
use sqlx::PgPool;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Processes every command and device message.
    pub dispatcher: Arc<Dispatcher>,
    /// Name of the storage backend, reported by `/health`.
    pub backend: &'static str,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>, backend: &'static str) -> Self {
        Self {
            dispatcher,
            backend,
        }
    }

    /// State backed by PostgreSQL.
    #[must_use]
    pub fn postgres(
        pool: PgPool,
        clock: Arc<dyn Clock>,
        containers: Arc<dyn ContainerManager>,
        config: WorkerConfig,
    ) -> Self {
        let dispatcher = Dispatcher::new(
            Arc::new(PgEventRepository::new(pool.clone())),
            Arc::new(PgProjectionStore::new(pool.clone())),
            Arc::new(PgConfigBlobStore::new(pool)),
            containers,
            clock,
            config,
        );
        Self::new(Arc::new(dispatcher), "postgres")
    }

    /// State backed by process memory; everything is lost on exit.
    #[must_use]
    pub fn in_memory(
        clock: Arc<dyn Clock>,
        containers: Arc<dyn ContainerManager>,
        config: WorkerConfig,
    ) -> Self {
        let store = Arc::new(InMemoryEventStore::new());
        let dispatcher = Dispatcher::new(
            store.clone(),
            store.clone(),
            store,
            containers,
            clock,
            config,
        );
        Self::new(Arc::new(dispatcher), "memory")
    }
}

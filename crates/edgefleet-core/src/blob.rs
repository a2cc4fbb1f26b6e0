//! Content-addressed blob storage for configuration bodies.

use async_trait::async_trait;

use crate::error::DomainError;

/// Immutable store of configuration bodies keyed by content hash.
///
/// A body is written once per hash and never overwritten; any number of
/// configuration updates may reference the same hash.
#[async_trait]
pub trait ConfigBlobStore: Send + Sync {
    /// Stores `body` under `hash` unless the hash is already present.
    ///
    /// Returns `true` if a new blob was written.
    async fn put(&self, hash: &str, body: &str) -> Result<bool, DomainError>;

    /// Fetches the body stored under `hash`.
    async fn get(&self, hash: &str) -> Result<Option<String>, DomainError>;
}

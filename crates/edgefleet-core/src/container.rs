//! Container lifecycle port.
//!
//! Each gateway runs inside a container managed outside this service. The
//! worker starts it when a gateway is created and stops it when the gateway
//! is deleted; failures are reported but never undo the domain change.

use async_trait::async_trait;
use thiserror::Error;

/// Error reported by a container manager.
#[derive(Debug, Error)]
#[error("container operation failed for gateway {gateway_id}: {message}")]
pub struct ContainerError {
    /// The gateway whose container failed.
    pub gateway_id: String,
    /// Description of the failure.
    pub message: String,
}

/// Starts and stops the container backing a gateway.
#[async_trait]
pub trait ContainerManager: Send + Sync {
    /// Starts the gateway's container.
    async fn start(&self, gateway_id: &str) -> Result<(), ContainerError>;

    /// Stops the gateway's container.
    async fn stop(&self, gateway_id: &str) -> Result<(), ContainerError>;
}

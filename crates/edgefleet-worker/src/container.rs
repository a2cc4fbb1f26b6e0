//! Default container manager.

use async_trait::async_trait;
use edgefleet_core::container::{ContainerError, ContainerManager};
use tracing::info;

/// Container manager that only logs the requested operation.
///
/// Used when no container runtime is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopContainerManager;

#[async_trait]
impl ContainerManager for NoopContainerManager {
    async fn start(&self, gateway_id: &str) -> Result<(), ContainerError> {
        info!(gateway_id, "container start requested");
        Ok(())
    }

    async fn stop(&self, gateway_id: &str) -> Result<(), ContainerError> {
        info!(gateway_id, "container stop requested");
        Ok(())
    }
}

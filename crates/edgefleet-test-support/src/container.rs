//! Test container managers — mock `ContainerManager` implementations.

use std::sync::Mutex;

use async_trait::async_trait;
use edgefleet_core::container::{ContainerError, ContainerManager};

/// A container manager that records every start and stop request.
#[derive(Debug, Default)]
pub struct RecordingContainerManager {
    started: Mutex<Vec<String>>,
    stopped: Mutex<Vec<String>>,
}

impl RecordingContainerManager {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway IDs whose containers were started, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    /// Gateway IDs whose containers were stopped, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn stopped(&self) -> Vec<String> {
        self.stopped.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContainerManager for RecordingContainerManager {
    async fn start(&self, gateway_id: &str) -> Result<(), ContainerError> {
        self.started.lock().unwrap().push(gateway_id.to_owned());
        Ok(())
    }

    async fn stop(&self, gateway_id: &str) -> Result<(), ContainerError> {
        self.stopped.lock().unwrap().push(gateway_id.to_owned());
        Ok(())
    }
}

/// A container manager whose every call fails.
#[derive(Debug)]
pub struct FailingContainerManager;

#[async_trait]
impl ContainerManager for FailingContainerManager {
    async fn start(&self, gateway_id: &str) -> Result<(), ContainerError> {
        Err(ContainerError {
            gateway_id: gateway_id.to_owned(),
            message: "docker daemon unavailable".to_owned(),
        })
    }

    async fn stop(&self, gateway_id: &str) -> Result<(), ContainerError> {
        Err(ContainerError {
            gateway_id: gateway_id.to_owned(),
            message: "docker daemon unavailable".to_owned(),
        })
    }
}

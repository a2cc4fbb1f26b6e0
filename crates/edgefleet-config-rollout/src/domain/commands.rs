//! Commands for the Configuration Rollout context.

use edgefleet_core::command::Command;
use uuid::Uuid;

/// Command to store a configuration body for a gateway.
#[derive(Debug, Clone)]
pub struct CreateConfigUpdate {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Identifier of the new update.
    pub update_id: String,
    /// The target gateway.
    pub gateway_id: String,
    /// YAML body.
    pub yaml_config: String,
    /// Hash claimed by the sender, checked against the body.
    pub config_hash: Option<String>,
}

impl Command for CreateConfigUpdate {
    fn command_type(&self) -> &'static str {
        "config.create"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// A step in the rollout reported by the message bus.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigStep {
    /// The gateway was notified.
    Publish,
    /// The gateway requested the body.
    Request,
    /// The body was sent.
    Send,
    /// The gateway acknowledged the body.
    Deliver {
        /// Acknowledgement body as received.
        details: serde_json::Value,
    },
    /// The rollout failed.
    Fail {
        /// What went wrong.
        error: String,
    },
}

/// Command to record rollout progress of an update.
#[derive(Debug, Clone)]
pub struct RecordConfigProgress {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The update identifier.
    pub update_id: String,
    /// What happened.
    pub step: ConfigStep,
}

impl Command for RecordConfigProgress {
    fn command_type(&self) -> &'static str {
        "config.record_progress"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

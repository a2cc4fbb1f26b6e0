//! Inbound message model.
//!
//! Every command and message-bus event reaches the dispatcher as one
//! `InboundMessage`, tagged by `type` on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A command or device event to process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Register a gateway.
    CreateGateway {
        /// Identifier; generated when absent.
        #[serde(default)]
        gateway_id: Option<String>,
        /// Display name.
        name: String,
        /// Physical location.
        location: String,
    },
    /// Delete a registered gateway.
    DeleteGateway {
        /// The gateway identifier.
        gateway_id: String,
        /// Why the gateway is deleted.
        #[serde(default)]
        reason: Option<String>,
    },
    /// Mark a gateway connected.
    ConnectGateway {
        /// The gateway identifier.
        gateway_id: String,
    },
    /// Heartbeat published by a device.
    MqttHeartbeat {
        /// The gateway identifier.
        gateway_id: String,
        /// `{uptime?, health?}`
        #[serde(default)]
        payload: serde_json::Value,
    },
    /// Status report published by a device.
    MqttStatus {
        /// The gateway identifier.
        gateway_id: String,
        /// `{status, certificate_info?}`
        #[serde(default)]
        payload: serde_json::Value,
    },
    /// Acknowledgement published by a device.
    MqttAcknowledge {
        /// The gateway identifier.
        gateway_id: String,
        /// Acknowledgement body.
        #[serde(default)]
        payload: serde_json::Value,
    },
    /// Deletion request received over the bus.
    MqttDelete {
        /// The gateway identifier.
        gateway_id: String,
        /// `{reason?}`
        #[serde(default)]
        payload: serde_json::Value,
    },
    /// Store a configuration for a gateway.
    ConfigUpdate {
        /// The target gateway.
        gateway_id: String,
        /// YAML body.
        yaml_config: String,
        /// Hash claimed by the sender.
        #[serde(default)]
        config_hash: Option<String>,
        /// Identifier; generated when absent.
        #[serde(default)]
        update_id: Option<String>,
    },
    /// Rollout progress reported on a configuration topic.
    MqttConfigEvent {
        /// Topic the event arrived on.
        topic: String,
        /// Event body; `update_id` and `gateway_id` here win over the topic.
        #[serde(default)]
        payload: serde_json::Value,
    },
    /// Produced by the heartbeat monitor for a silent gateway.
    HeartbeatTimeout {
        /// The gateway identifier.
        gateway_id: String,
        /// Cutoff the scan used; a gateway seen since stays connected.
        stale_before: DateTime<Utc>,
    },
}

impl InboundMessage {
    /// Returns the wire tag of this message.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateGateway { .. } => "create_gateway",
            Self::DeleteGateway { .. } => "delete_gateway",
            Self::ConnectGateway { .. } => "connect_gateway",
            Self::MqttHeartbeat { .. } => "mqtt_heartbeat",
            Self::MqttStatus { .. } => "mqtt_status",
            Self::MqttAcknowledge { .. } => "mqtt_acknowledge",
            Self::MqttDelete { .. } => "mqtt_delete",
            Self::ConfigUpdate { .. } => "config_update",
            Self::MqttConfigEvent { .. } => "mqtt_config_event",
            Self::HeartbeatTimeout { .. } => "heartbeat_timeout",
        }
    }

    /// Returns `true` for messages only the service itself may produce.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::HeartbeatTimeout { .. })
    }
}

//! Domain events for the Configuration Rollout context.

use chrono::{DateTime, Utc};
use edgefleet_core::event::{DomainEvent, EventMetadata};
use serde::{Deserialize, Serialize};

/// Emitted when a configuration body is stored for a gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigCreated {
    /// The update identifier.
    pub update_id: String,
    /// The target gateway.
    pub gateway_id: String,
    /// SHA-256 of the YAML body.
    pub config_hash: String,
    /// When the update was stored.
    pub timestamp: DateTime<Utc>,
}

/// Emitted when the gateway has been notified that an update is available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigPublished {
    /// The update identifier.
    pub update_id: String,
    /// When the notification went out.
    pub timestamp: DateTime<Utc>,
}

/// Emitted when the gateway asks for the configuration body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigRequested {
    /// The update identifier.
    pub update_id: String,
    /// When the request arrived.
    pub timestamp: DateTime<Utc>,
}

/// Emitted when the configuration body has been sent to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSent {
    /// The update identifier.
    pub update_id: String,
    /// When the body was sent.
    pub timestamp: DateTime<Utc>,
}

/// Emitted when the gateway acknowledges the configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDelivered {
    /// The update identifier.
    pub update_id: String,
    /// Acknowledgement body as received.
    #[serde(default)]
    pub details: serde_json::Value,
    /// When the acknowledgement arrived.
    pub timestamp: DateTime<Utc>,
}

/// Emitted when the rollout fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFailed {
    /// The update identifier.
    pub update_id: String,
    /// What went wrong.
    pub error: String,
    /// When the failure was observed.
    pub timestamp: DateTime<Utc>,
}

/// Event type identifier for [`ConfigCreated`].
pub const CONFIG_CREATED_EVENT_TYPE: &str = "config.created";

/// Event type identifier for [`ConfigPublished`].
pub const CONFIG_PUBLISHED_EVENT_TYPE: &str = "config.published";

/// Event type identifier for [`ConfigRequested`].
pub const CONFIG_REQUESTED_EVENT_TYPE: &str = "config.requested";

/// Event type identifier for [`ConfigSent`].
pub const CONFIG_SENT_EVENT_TYPE: &str = "config.sent";

/// Event type identifier for [`ConfigDelivered`].
pub const CONFIG_DELIVERED_EVENT_TYPE: &str = "config.delivered";

/// Event type identifier for [`ConfigFailed`].
pub const CONFIG_FAILED_EVENT_TYPE: &str = "config.failed";

/// Event payload variants for the Configuration Rollout context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConfigEventKind {
    /// A configuration body has been stored.
    ConfigCreated(ConfigCreated),
    /// The gateway has been notified.
    ConfigPublished(ConfigPublished),
    /// The gateway requested the body.
    ConfigRequested(ConfigRequested),
    /// The body has been sent.
    ConfigSent(ConfigSent),
    /// The gateway acknowledged the body.
    ConfigDelivered(ConfigDelivered),
    /// The rollout failed.
    ConfigFailed(ConfigFailed),
}

impl ConfigEventKind {
    /// Returns the event type name of this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ConfigCreated(_) => CONFIG_CREATED_EVENT_TYPE,
            Self::ConfigPublished(_) => CONFIG_PUBLISHED_EVENT_TYPE,
            Self::ConfigRequested(_) => CONFIG_REQUESTED_EVENT_TYPE,
            Self::ConfigSent(_) => CONFIG_SENT_EVENT_TYPE,
            Self::ConfigDelivered(_) => CONFIG_DELIVERED_EVENT_TYPE,
            Self::ConfigFailed(_) => CONFIG_FAILED_EVENT_TYPE,
        }
    }
}

/// Domain event envelope for the Configuration Rollout context.
#[derive(Debug, Clone)]
pub struct ConfigEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: ConfigEventKind,
}

impl DomainEvent for ConfigEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("ConfigEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}

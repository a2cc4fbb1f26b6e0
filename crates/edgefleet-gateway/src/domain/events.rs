//! Domain events for the Gateway Lifecycle context.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use edgefleet_core::error::DomainError;
use edgefleet_core::event::{DomainEvent, EventMetadata};
use serde::{Deserialize, Serialize};

/// Installation status of a gateway's device certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateStatus {
    /// No certificate has been installed yet.
    NotInstalled,
    /// A certificate is installed on the device.
    Installed,
    /// The certificate was removed from the device.
    Removed,
}

/// Certificate details reported by a gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateInfo {
    /// Installation status.
    pub status: CertificateStatus,
    /// Identifier of the certificate, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_id: Option<String>,
    /// Expiry of the certificate, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CertificateInfo {
    /// Certificate info of a freshly registered gateway.
    #[must_use]
    pub fn not_installed() -> Self {
        Self {
            status: CertificateStatus::NotInstalled,
            certificate_id: None,
            expires_at: None,
        }
    }

    /// Returns `true` if the certificate is installed.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.status == CertificateStatus::Installed
    }
}

impl Default for CertificateInfo {
    fn default() -> Self {
        Self::not_installed()
    }
}

/// Status string reported by a gateway over the message bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportedStatus {
    /// The device reports itself online.
    Online,
    /// The device reports itself offline.
    Offline,
    /// The device certificate was removed.
    CertificateRemoved,
    /// A device certificate was installed.
    CertificateInstalled,
}

impl ReportedStatus {
    /// Returns the wire name of this status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::CertificateRemoved => "certificate_removed",
            Self::CertificateInstalled => "certificate_installed",
        }
    }
}

impl fmt::Display for ReportedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportedStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "online" => Ok(Self::Online),
            "offline" => Ok(Self::Offline),
            "certificate_removed" => Ok(Self::CertificateRemoved),
            "certificate_installed" | "certificates_installed" => {
                Ok(Self::CertificateInstalled)
            }
            other => Err(DomainError::Validation(format!(
                "unknown gateway status: {other}"
            ))),
        }
    }
}

/// The change carried by a `GatewayUpdated` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "update_type", rename_all = "snake_case")]
pub enum GatewayUpdate {
    /// Periodic liveness signal.
    Heartbeat {
        /// Device uptime in seconds.
        #[serde(default)]
        uptime: Option<u64>,
        /// Free-form health report.
        #[serde(default)]
        health: Option<serde_json::Value>,
    },
    /// Status report from the device.
    Status {
        /// The reported status.
        status: ReportedStatus,
        /// Certificate details sent along with the status.
        #[serde(default)]
        certificate_info: Option<CertificateInfo>,
    },
    /// Acknowledgement of a message sent to the device.
    Acknowledge {
        /// Acknowledgement body as received.
        #[serde(default)]
        details: serde_json::Value,
    },
}

impl GatewayUpdate {
    /// Short name used in logs and ignore reasons.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Heartbeat { .. } => "gateway.updated.heartbeat",
            Self::Status { .. } => "gateway.updated.status",
            Self::Acknowledge { .. } => "gateway.updated.acknowledge",
        }
    }
}

/// Emitted when a gateway is registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayCreated {
    /// The gateway identifier.
    pub gateway_id: String,
    /// Display name.
    pub name: String,
    /// Physical location.
    pub location: String,
    /// When the gateway was registered.
    pub timestamp: DateTime<Utc>,
}

/// Emitted when a gateway connects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConnected {
    /// The gateway identifier.
    pub gateway_id: String,
    /// When the connection was observed.
    pub timestamp: DateTime<Utc>,
}

/// Emitted when a gateway goes offline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayDisconnected {
    /// The gateway identifier.
    pub gateway_id: String,
    /// Why the gateway is considered offline.
    #[serde(default)]
    pub reason: Option<String>,
    /// Set for timeouts: the disconnect only applies when the gateway was
    /// last seen strictly before this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale_before: Option<DateTime<Utc>>,
    /// When the disconnection was observed.
    pub timestamp: DateTime<Utc>,
}

/// Emitted when a gateway reports a heartbeat, status or acknowledgement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayUpdated {
    /// The gateway identifier.
    pub gateway_id: String,
    /// What the gateway reported.
    pub update: GatewayUpdate,
    /// When the report was received.
    pub timestamp: DateTime<Utc>,
}

/// Emitted when a gateway is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayDeleted {
    /// The gateway identifier.
    pub gateway_id: String,
    /// Why the gateway was deleted.
    #[serde(default)]
    pub reason: Option<String>,
    /// When the gateway was deleted.
    pub timestamp: DateTime<Utc>,
}

/// Event type identifier for [`GatewayCreated`].
pub const GATEWAY_CREATED_EVENT_TYPE: &str = "gateway.created";

/// Event type identifier for [`GatewayConnected`].
pub const GATEWAY_CONNECTED_EVENT_TYPE: &str = "gateway.connected";

/// Event type identifier for [`GatewayDisconnected`].
pub const GATEWAY_DISCONNECTED_EVENT_TYPE: &str = "gateway.disconnected";

/// Event type identifier for [`GatewayUpdated`].
pub const GATEWAY_UPDATED_EVENT_TYPE: &str = "gateway.updated";

/// Event type identifier for [`GatewayDeleted`].
pub const GATEWAY_DELETED_EVENT_TYPE: &str = "gateway.deleted";

/// Event payload variants for the Gateway Lifecycle context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GatewayEventKind {
    /// A gateway has been registered.
    GatewayCreated(GatewayCreated),
    /// A gateway has connected.
    GatewayConnected(GatewayConnected),
    /// A gateway has disconnected.
    GatewayDisconnected(GatewayDisconnected),
    /// A gateway has reported an update.
    GatewayUpdated(GatewayUpdated),
    /// A gateway has been deleted.
    GatewayDeleted(GatewayDeleted),
}

impl GatewayEventKind {
    /// Returns the event type name of this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::GatewayCreated(_) => GATEWAY_CREATED_EVENT_TYPE,
            Self::GatewayConnected(_) => GATEWAY_CONNECTED_EVENT_TYPE,
            Self::GatewayDisconnected(_) => GATEWAY_DISCONNECTED_EVENT_TYPE,
            Self::GatewayUpdated(_) => GATEWAY_UPDATED_EVENT_TYPE,
            Self::GatewayDeleted(_) => GATEWAY_DELETED_EVENT_TYPE,
        }
    }
}

/// Domain event envelope for the Gateway Lifecycle context.
#[derive(Debug, Clone)]
pub struct GatewayEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: GatewayEventKind,
}

impl DomainEvent for GatewayEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("GatewayEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}

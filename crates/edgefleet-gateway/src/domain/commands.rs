//! Commands for the Gateway Lifecycle context.

use chrono::{DateTime, Utc};
use edgefleet_core::command::Command;
use uuid::Uuid;

use super::events::GatewayUpdate;

/// Command to register a gateway.
#[derive(Debug, Clone)]
pub struct RegisterGateway {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The gateway identifier.
    pub gateway_id: String,
    /// Display name.
    pub name: String,
    /// Physical location.
    pub location: String,
}

impl Command for RegisterGateway {
    fn command_type(&self) -> &'static str {
        "gateway.register"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to mark a gateway connected.
#[derive(Debug, Clone)]
pub struct ConnectGateway {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The gateway identifier.
    pub gateway_id: String,
}

impl Command for ConnectGateway {
    fn command_type(&self) -> &'static str {
        "gateway.connect"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to mark a gateway disconnected.
#[derive(Debug, Clone)]
pub struct DisconnectGateway {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The gateway identifier.
    pub gateway_id: String,
    /// Why the gateway is considered offline.
    pub reason: Option<String>,
    /// Timeout cutoff; a gateway seen at or after it stays connected.
    pub stale_before: Option<DateTime<Utc>>,
}

impl Command for DisconnectGateway {
    fn command_type(&self) -> &'static str {
        "gateway.disconnect"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to record a heartbeat, status report or acknowledgement.
#[derive(Debug, Clone)]
pub struct RecordGatewayUpdate {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The gateway identifier.
    pub gateway_id: String,
    /// What the gateway reported.
    pub update: GatewayUpdate,
}

impl Command for RecordGatewayUpdate {
    fn command_type(&self) -> &'static str {
        "gateway.record_update"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to delete a gateway.
#[derive(Debug, Clone)]
pub struct DeleteGateway {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The gateway identifier.
    pub gateway_id: String,
    /// Why the gateway is deleted.
    pub reason: Option<String>,
}

impl Command for DeleteGateway {
    fn command_type(&self) -> &'static str {
        "gateway.delete"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

//! Read model projection for gateways.
//!
//! `GatewayView` is the canonical projected status of a gateway. It is
//! computed from the aggregate without I/O and written to the projection
//! store after every event.

use chrono::{DateTime, Utc};
use edgefleet_core::aggregate::AggregateRoot;
use edgefleet_core::error::DomainError;
use edgefleet_core::event::AggregateType;
use edgefleet_core::projection::{ProjectionRow, ProjectionStore};
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::{Gateway, GatewayErrorMarker, GatewayStatus};
use crate::domain::events::CertificateInfo;

/// Projected status of a gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayView {
    /// The gateway identifier.
    pub gateway_id: String,
    /// Display name.
    pub name: String,
    /// Physical location.
    pub location: String,
    /// Lifecycle state.
    pub status: GatewayStatus,
    /// Time of the last applied change.
    pub last_updated: Option<DateTime<Utc>>,
    /// Time of the last heartbeat.
    pub last_heartbeat: Option<DateTime<Utc>>,
    /// Time of the last acknowledgement.
    pub last_acknowledged_at: Option<DateTime<Utc>>,
    /// Reported uptime in seconds.
    pub uptime: Option<u64>,
    /// Last reported health document.
    pub health: Option<serde_json::Value>,
    /// Error marker while offline.
    pub error: Option<GatewayErrorMarker>,
    /// Certificate details.
    pub certificate_info: CertificateInfo,
    /// Registration time.
    pub created_at: Option<DateTime<Utc>>,
    /// Last connection time.
    pub connected_at: Option<DateTime<Utc>>,
    /// Last disconnection time.
    pub disconnected_at: Option<DateTime<Utc>>,
    /// Deletion time.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Version of the last applied event.
    pub version: i64,
}

impl From<&Gateway> for GatewayView {
    fn from(gateway: &Gateway) -> Self {
        Self {
            gateway_id: gateway.id.clone(),
            name: gateway.name.clone(),
            location: gateway.location.clone(),
            status: gateway.status,
            last_updated: gateway.last_updated,
            last_heartbeat: gateway.last_heartbeat,
            last_acknowledged_at: gateway.last_acknowledged_at,
            uptime: gateway.uptime,
            health: gateway.health.clone(),
            error: gateway.error.clone(),
            certificate_info: gateway.certificate_info.clone(),
            created_at: gateway.created_at,
            connected_at: gateway.connected_at,
            disconnected_at: gateway.disconnected_at,
            deleted_at: gateway.deleted_at,
            version: gateway.version(),
        }
    }
}

impl GatewayView {
    /// Converts the view into a projection row.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the view cannot be serialized.
    pub fn to_row(&self, now: DateTime<Utc>) -> Result<ProjectionRow, DomainError> {
        let document = serde_json::to_value(self)
            .map_err(|e| DomainError::Infrastructure(format!("view serialization failed: {e}")))?;
        Ok(ProjectionRow {
            aggregate_id: self.gateway_id.clone(),
            aggregate_type: AggregateType::Gateway,
            state: self.status.as_str().to_owned(),
            owner_id: None,
            version: self.version,
            document,
            updated_at: now,
        })
    }

    /// Reads a view back out of a projection row.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the stored document is malformed.
    pub fn from_row(row: &ProjectionRow) -> Result<Self, DomainError> {
        serde_json::from_value(row.document.clone()).map_err(|e| {
            DomainError::Infrastructure(format!(
                "gateway projection {} is malformed: {e}",
                row.aggregate_id
            ))
        })
    }
}

/// Overwrites the read model row of a gateway with `view`.
///
/// # Errors
///
/// Returns `DomainError` if serialization or the store write fails.
pub async fn upsert_gateway(
    store: &dyn ProjectionStore,
    view: &GatewayView,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    store.upsert(&view.to_row(now)?).await
}

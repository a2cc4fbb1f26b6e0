//! Query handlers for the Gateway Lifecycle context.
//!
//! Status queries are served from the read model. History and rebuild
//! queries go to the event log, which is the system of record.

use chrono::{DateTime, Utc};
use edgefleet_core::clock::Clock;
use edgefleet_core::error::DomainError;
use edgefleet_core::event::AggregateType;
use edgefleet_core::projection::{ProjectionFilter, ProjectionStore};
use edgefleet_core::repository::EventRepository;
use serde::Serialize;
use uuid::Uuid;

use crate::application::command_handlers;
use crate::application::projection::GatewayView;
use crate::domain::aggregates::GatewayStatus;

/// Read-only view of one stored gateway event.
#[derive(Debug, Serialize)]
pub struct GatewayEventView {
    /// Event identifier.
    pub event_id: Uuid,
    /// Event type name.
    pub event_type: String,
    /// Version within the gateway stream.
    pub version: i64,
    /// Event payload.
    pub payload: serde_json::Value,
    /// When the event was recorded.
    pub occurred_at: DateTime<Utc>,
}

/// Retrieves the projected status of a gateway from the read model.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no row exists for the ID.
pub async fn get_gateway(
    gateway_id: &str,
    projections: &dyn ProjectionStore,
) -> Result<GatewayView, DomainError> {
    let row = projections
        .get(AggregateType::Gateway, gateway_id)
        .await?
        .ok_or_else(|| DomainError::AggregateNotFound(gateway_id.to_owned()))?;
    GatewayView::from_row(&row)
}

/// Lists gateways from the read model, optionally filtered by state.
///
/// # Errors
///
/// Returns `DomainError` if the store read fails or a row is malformed.
pub async fn list_gateways(
    status: Option<GatewayStatus>,
    projections: &dyn ProjectionStore,
) -> Result<Vec<GatewayView>, DomainError> {
    let filter = ProjectionFilter {
        state: status.map(|s| s.as_str().to_owned()),
        owner_id: None,
    };
    projections
        .list(AggregateType::Gateway, &filter)
        .await?
        .iter()
        .map(GatewayView::from_row)
        .collect()
}

/// Returns the full event history of a gateway.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID.
pub async fn get_gateway_history(
    gateway_id: &str,
    repo: &dyn EventRepository,
) -> Result<Vec<GatewayEventView>, DomainError> {
    let stored_events = repo.load_events(gateway_id, AggregateType::Gateway).await?;
    if stored_events.is_empty() {
        return Err(DomainError::AggregateNotFound(gateway_id.to_owned()));
    }
    Ok(stored_events
        .into_iter()
        .map(|e| GatewayEventView {
            event_id: e.event_id,
            event_type: e.event_type,
            version: e.version,
            payload: e.payload,
            occurred_at: e.occurred_at,
        })
        .collect())
}

/// Projects a gateway by replaying its event log, bypassing the read model.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID.
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub async fn replay_gateway(
    gateway_id: &str,
    repo: &dyn EventRepository,
) -> Result<GatewayView, DomainError> {
    let stored_events = repo.load_events(gateway_id, AggregateType::Gateway).await?;
    if stored_events.is_empty() {
        return Err(DomainError::AggregateNotFound(gateway_id.to_owned()));
    }
    let gateway = command_handlers::reconstitute(gateway_id, &stored_events)?;
    Ok(GatewayView::from(&gateway))
}

/// Rebuilds the read model row of a gateway from its event log.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID,
/// or `DomainError` if the store write fails.
pub async fn rebuild_gateway_projection(
    gateway_id: &str,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    projections: &dyn ProjectionStore,
) -> Result<GatewayView, DomainError> {
    let view = replay_gateway(gateway_id, repo).await?;
    projections.replace(&view.to_row(clock.now())?).await?;
    Ok(view)
}

//! Command handlers for the Gateway Lifecycle context.
//!
//! This module contains application-level command handler functions that
//! orchestrate domain logic: load aggregate, record the event, persist it,
//! apply it, and refresh the read model.

use edgefleet_core::aggregate::{AggregateRoot, TransitionResult};
use edgefleet_core::clock::Clock;
use edgefleet_core::command::Command;
use edgefleet_core::error::DomainError;
use edgefleet_core::event::{AggregateType, DomainEvent, EventMetadata};
use edgefleet_core::projection::ProjectionStore;
use edgefleet_core::repository::{EventRepository, StoredEvent};
use tracing::{debug, warn};

use crate::application::projection::{GatewayView, upsert_gateway};
use crate::domain::aggregates::Gateway;
use crate::domain::commands::{
    ConnectGateway, DeleteGateway, DisconnectGateway, RecordGatewayUpdate, RegisterGateway,
};
use crate::domain::events::{GatewayEvent, GatewayEventKind};

/// Result of a successfully handled command.
#[derive(Debug)]
pub struct GatewayCommandResult {
    /// Projected status after the command.
    pub view: GatewayView,
    /// The stored events produced and persisted.
    pub stored_events: Vec<StoredEvent>,
    /// How each persisted event affected the gateway.
    pub transitions: Vec<TransitionResult>,
}

fn to_stored_event(event: &GatewayEvent) -> StoredEvent {
    let meta = event.metadata();
    StoredEvent {
        event_id: meta.event_id,
        aggregate_id: meta.aggregate_id.clone(),
        aggregate_type: meta.aggregate_type,
        event_type: event.event_type().to_owned(),
        payload: event.to_payload(),
        version: meta.version,
        correlation_id: meta.correlation_id,
        causation_id: meta.causation_id,
        occurred_at: meta.occurred_at,
    }
}

/// Reconstitutes a `Gateway` by replaying its stored events in order.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub fn reconstitute(gateway_id: &str, existing_events: &[StoredEvent]) -> Result<Gateway, DomainError> {
    let mut gateway = Gateway::new(gateway_id);
    for stored in existing_events {
        let kind: GatewayEventKind =
            serde_json::from_value(stored.payload.clone()).map_err(|e| {
                DomainError::Infrastructure(format!("event deserialization failed: {e}"))
            })?;
        let event = GatewayEvent {
            metadata: EventMetadata {
                event_id: stored.event_id,
                event_type: stored.event_type.clone(),
                aggregate_id: stored.aggregate_id.clone(),
                aggregate_type: stored.aggregate_type,
                version: stored.version,
                correlation_id: stored.correlation_id,
                causation_id: stored.causation_id,
                occurred_at: stored.occurred_at,
            },
            kind,
        };
        gateway.apply(&event);
    }
    Ok(gateway)
}

/// Loads and replays a gateway.
async fn load(gateway_id: &str, repo: &dyn EventRepository) -> Result<Gateway, DomainError> {
    let existing_events = repo.load_events(gateway_id, AggregateType::Gateway).await?;
    reconstitute(gateway_id, &existing_events)
}

/// Loads a gateway that must already exist.
async fn load_existing(gateway_id: &str, repo: &dyn EventRepository) -> Result<Gateway, DomainError> {
    let gateway = load(gateway_id, repo).await?;
    if !gateway.exists() {
        return Err(DomainError::AggregateNotFound(gateway_id.to_owned()));
    }
    Ok(gateway)
}

/// Persists the gateway's uncommitted events, applies them and refreshes
/// the read model.
async fn commit(
    mut gateway: Gateway,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    projections: &dyn ProjectionStore,
) -> Result<GatewayCommandResult, DomainError> {
    let pending = gateway.uncommitted_events().to_vec();
    let stored_events: Vec<StoredEvent> = pending.iter().map(to_stored_event).collect();

    repo.append_events(
        &gateway.id,
        AggregateType::Gateway,
        gateway.version(),
        &stored_events,
    )
    .await?;
    gateway.clear_uncommitted_events();

    let transitions: Vec<TransitionResult> = pending
        .iter()
        .map(|event| {
            let from = gateway.status();
            let result = gateway.apply(event);
            match &result {
                TransitionResult::Applied => debug!(
                    gateway_id = %gateway.id,
                    event_type = event.event_type(),
                    from = from.as_str(),
                    to = gateway.status().as_str(),
                    "applied gateway event"
                ),
                TransitionResult::Ignored(reason) => warn!(
                    gateway_id = %gateway.id,
                    event_type = event.event_type(),
                    state = from.as_str(),
                    %reason,
                    "gateway event ignored"
                ),
            }
            result
        })
        .collect();

    let view = GatewayView::from(&gateway);
    upsert_gateway(projections, &view, clock.now()).await?;

    Ok(GatewayCommandResult {
        view,
        stored_events,
        transitions,
    })
}

fn require_non_blank(value: &str, field: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn log_command(command: &impl Command) {
    debug!(
        command_type = command.command_type(),
        correlation_id = %command.correlation_id(),
        "handling command"
    );
}

/// Handles the `RegisterGateway` command: records a `GatewayCreated` event.
///
/// Registering an existing gateway appends an event that is ignored on
/// replay, so retries are safe.
///
/// # Errors
///
/// Returns `DomainError::Validation` for blank fields, or `DomainError` if
/// event persistence fails.
pub async fn handle_register_gateway(
    command: &RegisterGateway,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    projections: &dyn ProjectionStore,
) -> Result<GatewayCommandResult, DomainError> {
    log_command(command);
    require_non_blank(&command.gateway_id, "gateway_id")?;
    require_non_blank(&command.name, "name")?;
    require_non_blank(&command.location, "location")?;

    let mut gateway = load(&command.gateway_id, repo).await?;
    gateway.register(
        command.name.trim().to_owned(),
        command.location.trim().to_owned(),
        command.correlation_id,
        clock,
    );
    commit(gateway, clock, repo, projections).await
}

/// Handles the `ConnectGateway` command: records a `GatewayConnected` event.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the gateway does not exist, or
/// `DomainError` if event persistence fails.
pub async fn handle_connect_gateway(
    command: &ConnectGateway,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    projections: &dyn ProjectionStore,
) -> Result<GatewayCommandResult, DomainError> {
    log_command(command);
    let mut gateway = load_existing(&command.gateway_id, repo).await?;
    gateway.connect(command.correlation_id, clock);
    commit(gateway, clock, repo, projections).await
}

/// Handles the `DisconnectGateway` command: records a `GatewayDisconnected` event.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the gateway does not exist, or
/// `DomainError` if event persistence fails.
pub async fn handle_disconnect_gateway(
    command: &DisconnectGateway,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    projections: &dyn ProjectionStore,
) -> Result<GatewayCommandResult, DomainError> {
    log_command(command);
    let mut gateway = load_existing(&command.gateway_id, repo).await?;
    gateway.disconnect(
        command.reason.clone(),
        command.stale_before,
        command.correlation_id,
        clock,
    );
    commit(gateway, clock, repo, projections).await
}

/// Handles the `RecordGatewayUpdate` command: records a `GatewayUpdated` event.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the gateway does not exist, or
/// `DomainError` if event persistence fails.
pub async fn handle_record_gateway_update(
    command: &RecordGatewayUpdate,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    projections: &dyn ProjectionStore,
) -> Result<GatewayCommandResult, DomainError> {
    log_command(command);
    let mut gateway = load_existing(&command.gateway_id, repo).await?;
    gateway.report(command.update.clone(), command.correlation_id, clock);
    commit(gateway, clock, repo, projections).await
}

/// Handles the `DeleteGateway` command: records a `GatewayDeleted` event.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the gateway does not exist, or
/// `DomainError` if event persistence fails.
pub async fn handle_delete_gateway(
    command: &DeleteGateway,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    projections: &dyn ProjectionStore,
) -> Result<GatewayCommandResult, DomainError> {
    log_command(command);
    let mut gateway = load_existing(&command.gateway_id, repo).await?;
    gateway.delete(command.reason.clone(), command.correlation_id, clock);
    commit(gateway, clock, repo, projections).await
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use edgefleet_core::aggregate::{IgnoreReason, TransitionResult};
    use edgefleet_core::error::DomainError;
    use edgefleet_core::event::AggregateType;
    use edgefleet_core::projection::ProjectionStore;
    use edgefleet_core::repository::EventRepository;
    use edgefleet_event_store::memory::InMemoryEventStore;
    use edgefleet_test_support::{FailingEventRepository, FixedClock, RecordingEventRepository};
    use uuid::Uuid;

    use super::*;
    use crate::domain::aggregates::GatewayStatus;
    use crate::domain::events::{CertificateStatus, GatewayUpdate, ReportedStatus};

    fn fixed_clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    fn register(gateway_id: &str) -> RegisterGateway {
        RegisterGateway {
            correlation_id: Uuid::new_v4(),
            gateway_id: gateway_id.to_owned(),
            name: "A".to_owned(),
            location: "Room1".to_owned(),
        }
    }

    fn update(gateway_id: &str, update: GatewayUpdate) -> RecordGatewayUpdate {
        RecordGatewayUpdate {
            correlation_id: Uuid::new_v4(),
            gateway_id: gateway_id.to_owned(),
            update,
        }
    }

    #[tokio::test]
    async fn test_handle_register_gateway_persists_created_event_at_version_zero() {
        // Arrange
        let clock = fixed_clock();
        let repo = RecordingEventRepository::new(Ok(Vec::new()));
        let store = InMemoryEventStore::new();
        let command = register("gw-1");

        // Act
        let result = handle_register_gateway(&command, &clock, &repo, &store)
            .await
            .unwrap();

        // Assert
        let appended = repo.appended_events();
        assert_eq!(appended.len(), 1);
        let (agg_id, agg_type, expected_version, events) = &appended[0];
        assert_eq!(agg_id, "gw-1");
        assert_eq!(*agg_type, AggregateType::Gateway);
        assert_eq!(*expected_version, -1);
        assert_eq!(events.len(), 1);

        let stored = &events[0];
        assert_eq!(stored.event_type, "gateway.created");
        assert_eq!(stored.version, 0);
        assert_eq!(stored.correlation_id, command.correlation_id);
        assert_eq!(stored.occurred_at, clock.0);
        assert_eq!(stored.payload["GatewayCreated"]["name"], "A");

        assert_eq!(result.view.status, GatewayStatus::Created);
        assert_eq!(result.transitions, vec![TransitionResult::Applied]);

        let row = store
            .get(AggregateType::Gateway, "gw-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.state, "created");
        assert_eq!(row.version, 0);
    }

    #[tokio::test]
    async fn test_handle_register_gateway_rejects_blank_name() {
        let store = InMemoryEventStore::new();
        let mut command = register("gw-1");
        command.name = "  ".to_owned();

        let result = handle_register_gateway(&command, &fixed_clock(), &store, &store).await;

        match result {
            Err(DomainError::Validation(msg)) => assert_eq!(msg, "name must not be empty"),
            other => panic!("expected Validation, got {other:?}"),
        }
        assert_eq!(
            store
                .current_version("gw-1", AggregateType::Gateway)
                .await
                .unwrap(),
            -1
        );
    }

    #[tokio::test]
    async fn test_register_twice_appends_ignored_event() {
        let store = InMemoryEventStore::new();
        handle_register_gateway(&register("gw-1"), &fixed_clock(), &store, &store)
            .await
            .unwrap();

        let result = handle_register_gateway(&register("gw-1"), &fixed_clock(), &store, &store)
            .await
            .unwrap();

        assert_eq!(
            result.transitions,
            vec![TransitionResult::Ignored(IgnoreReason::AlreadyCreated)]
        );
        assert_eq!(result.view.version, 1);
        assert_eq!(result.view.status, GatewayStatus::Created);
    }

    #[tokio::test]
    async fn test_commands_on_unknown_gateway_return_not_found() {
        let store = InMemoryEventStore::new();
        let clock = fixed_clock();

        let delete = DeleteGateway {
            correlation_id: Uuid::new_v4(),
            gateway_id: "ghost".to_owned(),
            reason: None,
        };
        let connect = ConnectGateway {
            correlation_id: Uuid::new_v4(),
            gateway_id: "ghost".to_owned(),
        };

        for result in [
            handle_delete_gateway(&delete, &clock, &store, &store).await,
            handle_connect_gateway(&connect, &clock, &store, &store).await,
        ] {
            match result {
                Err(DomainError::AggregateNotFound(id)) => assert_eq!(id, "ghost"),
                other => panic!("expected AggregateNotFound, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_create_then_heartbeat_stays_created_without_certificate() {
        let store = InMemoryEventStore::new();
        let clock = fixed_clock();
        handle_register_gateway(&register("gw-1"), &clock, &store, &store)
            .await
            .unwrap();

        let heartbeat = update(
            "gw-1",
            GatewayUpdate::Heartbeat {
                uptime: Some(5),
                health: None,
            },
        );
        let result = handle_record_gateway_update(&heartbeat, &clock, &store, &store)
            .await
            .unwrap();

        assert_eq!(result.view.status, GatewayStatus::Created);
        assert_eq!(result.view.last_heartbeat, Some(clock.0));
        assert_eq!(result.view.version, 1);
    }

    #[tokio::test]
    async fn test_full_lifecycle_through_handlers() {
        let store = InMemoryEventStore::new();
        let clock = fixed_clock();
        handle_register_gateway(&register("gw-1"), &clock, &store, &store)
            .await
            .unwrap();

        let install = update(
            "gw-1",
            GatewayUpdate::Status {
                status: ReportedStatus::CertificateInstalled,
                certificate_info: None,
            },
        );
        handle_record_gateway_update(&install, &clock, &store, &store)
            .await
            .unwrap();

        let connect = ConnectGateway {
            correlation_id: Uuid::new_v4(),
            gateway_id: "gw-1".to_owned(),
        };
        let connected = handle_connect_gateway(&connect, &clock, &store, &store)
            .await
            .unwrap();
        assert_eq!(connected.view.status, GatewayStatus::Connected);
        assert_eq!(
            connected.view.certificate_info.status,
            CertificateStatus::Installed
        );

        let delete = DeleteGateway {
            correlation_id: Uuid::new_v4(),
            gateway_id: "gw-1".to_owned(),
            reason: Some("decommissioned".to_owned()),
        };
        let deleted = handle_delete_gateway(&delete, &clock, &store, &store)
            .await
            .unwrap();
        assert_eq!(deleted.view.status, GatewayStatus::Deleted);

        // Deleting again is accepted and leaves the gateway deleted.
        let again = handle_delete_gateway(&delete, &clock, &store, &store)
            .await
            .unwrap();
        assert_eq!(again.view.status, GatewayStatus::Deleted);
        assert!(!again.transitions[0].is_applied());
        assert_eq!(again.view.version, 4);
    }

    #[tokio::test]
    async fn test_handler_surfaces_repository_failure() {
        let store = InMemoryEventStore::new();

        let result =
            handle_register_gateway(&register("gw-1"), &fixed_clock(), &FailingEventRepository, &store)
                .await;

        match result {
            Err(DomainError::Infrastructure(msg)) => assert_eq!(msg, "connection refused"),
            other => panic!("expected Infrastructure, got {other:?}"),
        }
        assert!(
            store
                .get(AggregateType::Gateway, "gw-1")
                .await
                .unwrap()
                .is_none()
        );
    }
}

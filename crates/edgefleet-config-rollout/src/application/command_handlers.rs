//! Command handlers for the Configuration Rollout context.

use edgefleet_core::aggregate::{AggregateRoot, TransitionResult};
use edgefleet_core::blob::ConfigBlobStore;
use edgefleet_core::clock::Clock;
use edgefleet_core::command::Command;
use edgefleet_core::error::DomainError;
use edgefleet_core::event::{AggregateType, DomainEvent, EventMetadata};
use edgefleet_core::projection::ProjectionStore;
use edgefleet_core::repository::{EventRepository, StoredEvent};
use tracing::{debug, info, warn};

use crate::application::projection::{ConfigUpdateView, upsert_config_update};
use crate::domain::aggregates::ConfigUpdate;
use crate::domain::commands::{ConfigStep, CreateConfigUpdate, RecordConfigProgress};
use crate::domain::content;
use crate::domain::events::{ConfigEvent, ConfigEventKind};

/// Result of a successfully handled command.
#[derive(Debug)]
pub struct ConfigCommandResult {
    /// Projected status after the command.
    pub view: ConfigUpdateView,
    /// The stored events produced and persisted.
    pub stored_events: Vec<StoredEvent>,
    /// How each persisted event affected the update.
    pub transitions: Vec<TransitionResult>,
}

fn to_stored_event(event: &ConfigEvent) -> StoredEvent {
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

/// Reconstitutes a `ConfigUpdate` by replaying its stored events in order.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub fn reconstitute(
    update_id: &str,
    existing_events: &[StoredEvent],
) -> Result<ConfigUpdate, DomainError> {
    let mut update = ConfigUpdate::new(update_id);
    for stored in existing_events {
        let kind: ConfigEventKind =
            serde_json::from_value(stored.payload.clone()).map_err(|e| {
                DomainError::Infrastructure(format!("event deserialization failed: {e}"))
            })?;
        let event = ConfigEvent {
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
        update.apply(&event);
    }
    Ok(update)
}

async fn load(update_id: &str, repo: &dyn EventRepository) -> Result<ConfigUpdate, DomainError> {
    let existing_events = repo
        .load_events(update_id, AggregateType::ConfigUpdate)
        .await?;
    reconstitute(update_id, &existing_events)
}

async fn commit(
    mut update: ConfigUpdate,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    projections: &dyn ProjectionStore,
) -> Result<ConfigCommandResult, DomainError> {
    let pending = update.uncommitted_events().to_vec();
    let stored_events: Vec<StoredEvent> = pending.iter().map(to_stored_event).collect();

    repo.append_events(
        &update.id,
        AggregateType::ConfigUpdate,
        update.version(),
        &stored_events,
    )
    .await?;
    update.clear_uncommitted_events();

    let transitions: Vec<TransitionResult> = pending
        .iter()
        .map(|event| {
            let from = update.state();
            let result = update.apply(event);
            match &result {
                TransitionResult::Applied => debug!(
                    update_id = %update.id,
                    event_type = event.event_type(),
                    from = from.as_str(),
                    to = update.state().as_str(),
                    "applied config event"
                ),
                TransitionResult::Ignored(reason) => warn!(
                    update_id = %update.id,
                    event_type = event.event_type(),
                    state = from.as_str(),
                    %reason,
                    "config event ignored"
                ),
            }
            result
        })
        .collect();

    let view = ConfigUpdateView::from(&update);
    upsert_config_update(projections, &view, clock.now()).await?;

    Ok(ConfigCommandResult {
        view,
        stored_events,
        transitions,
    })
}

fn log_command(command: &impl Command) {
    debug!(
        command_type = command.command_type(),
        correlation_id = %command.correlation_id(),
        "handling command"
    );
}

/// Handles the `CreateConfigUpdate` command: stores the YAML body under its
/// content hash and records a `ConfigCreated` event.
///
/// The caller is responsible for checking that the target gateway exists.
///
/// # Errors
///
/// Returns `DomainError::Validation` for blank IDs, invalid YAML or a hash
/// mismatch, or `DomainError` if storage fails.
pub async fn handle_create_config_update(
    command: &CreateConfigUpdate,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    projections: &dyn ProjectionStore,
    blobs: &dyn ConfigBlobStore,
) -> Result<ConfigCommandResult, DomainError> {
    log_command(command);
    if command.update_id.trim().is_empty() {
        return Err(DomainError::Validation(
            "update_id must not be empty".to_owned(),
        ));
    }
    if command.gateway_id.trim().is_empty() {
        return Err(DomainError::Validation(
            "gateway_id must not be empty".to_owned(),
        ));
    }
    let config_hash = content::address(&command.yaml_config, command.config_hash.as_deref())?;

    let mut update = load(&command.update_id, repo).await?;
    // A repeated create is recorded as ignored and must not leave a body behind.
    if !update.exists() && blobs.put(&config_hash, &command.yaml_config).await? {
        info!(%config_hash, "stored new configuration body");
    }
    update.create(
        command.gateway_id.trim().to_owned(),
        config_hash,
        command.correlation_id,
        clock,
    );
    commit(update, clock, repo, projections).await
}

/// Handles the `RecordConfigProgress` command: records the event matching
/// the reported step.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the update does not exist, or
/// `DomainError` if event persistence fails.
pub async fn handle_record_config_progress(
    command: &RecordConfigProgress,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    projections: &dyn ProjectionStore,
) -> Result<ConfigCommandResult, DomainError> {
    log_command(command);
    let mut update = load(&command.update_id, repo).await?;
    if !update.exists() {
        return Err(DomainError::AggregateNotFound(command.update_id.clone()));
    }
    match &command.step {
        ConfigStep::Publish => update.publish(command.correlation_id, clock),
        ConfigStep::Request => update.request(command.correlation_id, clock),
        ConfigStep::Send => update.send(command.correlation_id, clock),
        ConfigStep::Deliver { details } => {
            update.deliver(details.clone(), command.correlation_id, clock);
        }
        ConfigStep::Fail { error } => update.fail(error.clone(), command.correlation_id, clock),
    }
    commit(update, clock, repo, projections).await
}

//! Query handlers for the Configuration Rollout context.

use edgefleet_core::blob::ConfigBlobStore;
use edgefleet_core::clock::Clock;
use edgefleet_core::error::DomainError;
use edgefleet_core::event::AggregateType;
use edgefleet_core::projection::{ProjectionFilter, ProjectionStore};
use edgefleet_core::repository::EventRepository;

use crate::application::command_handlers;
use crate::application::projection::ConfigUpdateView;
use crate::domain::aggregates::ConfigState;

/// Retrieves the projected status of an update.
///
/// With `include_config` the YAML body is fetched from the blob store.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no row exists for the ID, or
/// `DomainError::Infrastructure` if the referenced body is missing.
pub async fn get_config_update(
    update_id: &str,
    include_config: bool,
    projections: &dyn ProjectionStore,
    blobs: &dyn ConfigBlobStore,
) -> Result<ConfigUpdateView, DomainError> {
    let row = projections
        .get(AggregateType::ConfigUpdate, update_id)
        .await?
        .ok_or_else(|| DomainError::AggregateNotFound(update_id.to_owned()))?;
    let mut view = ConfigUpdateView::from_row(&row)?;
    if include_config {
        let body = blobs.get(&view.config_hash).await?.ok_or_else(|| {
            DomainError::Infrastructure(format!(
                "configuration body {} is missing",
                view.config_hash
            ))
        })?;
        view.yaml_config = Some(body);
    }
    Ok(view)
}

/// Lists updates, most recently changed first.
///
/// # Errors
///
/// Returns `DomainError` if the store read fails or a row is malformed.
pub async fn list_config_updates(
    gateway_id: Option<&str>,
    state: Option<ConfigState>,
    projections: &dyn ProjectionStore,
) -> Result<Vec<ConfigUpdateView>, DomainError> {
    let filter = ProjectionFilter {
        state: state.map(|s| s.as_str().to_owned()),
        owner_id: gateway_id.map(str::to_owned),
    };
    projections
        .list(AggregateType::ConfigUpdate, &filter)
        .await?
        .iter()
        .map(ConfigUpdateView::from_row)
        .collect()
}

/// Returns the gateway's most recently changed update that is still in
/// flight, if any.
///
/// # Errors
///
/// Returns `DomainError` if the store read fails or a row is malformed.
pub async fn latest_active_update(
    gateway_id: &str,
    projections: &dyn ProjectionStore,
) -> Result<Option<ConfigUpdateView>, DomainError> {
    let updates = list_config_updates(Some(gateway_id), None, projections).await?;
    Ok(updates.into_iter().find(|u| !u.state.is_terminal()))
}

/// Projects an update by replaying its event log.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID.
pub async fn replay_config_update(
    update_id: &str,
    repo: &dyn EventRepository,
) -> Result<ConfigUpdateView, DomainError> {
    let stored_events = repo
        .load_events(update_id, AggregateType::ConfigUpdate)
        .await?;
    if stored_events.is_empty() {
        return Err(DomainError::AggregateNotFound(update_id.to_owned()));
    }
    let update = command_handlers::reconstitute(update_id, &stored_events)?;
    Ok(ConfigUpdateView::from(&update))
}

/// Rebuilds the read model row of an update from its event log.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID,
/// or `DomainError` if the store write fails.
pub async fn rebuild_config_projection(
    update_id: &str,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    projections: &dyn ProjectionStore,
) -> Result<ConfigUpdateView, DomainError> {
    let view = replay_config_update(update_id, repo).await?;
    projections.replace(&view.to_row(clock.now())?).await?;
    Ok(view)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use edgefleet_event_store::memory::InMemoryEventStore;
    use edgefleet_test_support::ManualClock;
    use uuid::Uuid;

    use super::*;
    use crate::application::command_handlers::{
        handle_create_config_update, handle_record_config_progress,
    };
    use crate::domain::commands::{ConfigStep, CreateConfigUpdate, RecordConfigProgress};

    const YAML: &str = "interval: 10\n";

    async fn create(store: &InMemoryEventStore, clock: &ManualClock, update_id: &str) {
        let command = CreateConfigUpdate {
            correlation_id: Uuid::new_v4(),
            update_id: update_id.to_owned(),
            gateway_id: "gw-1".to_owned(),
            yaml_config: YAML.to_owned(),
            config_hash: None,
        };
        handle_create_config_update(&command, clock, store, store, store)
            .await
            .unwrap();
        clock.advance(Duration::seconds(1));
    }

    async fn step(store: &InMemoryEventStore, clock: &ManualClock, update_id: &str, step: ConfigStep) {
        let command = RecordConfigProgress {
            correlation_id: Uuid::new_v4(),
            update_id: update_id.to_owned(),
            step,
        };
        handle_record_config_progress(&command, clock, store, store)
            .await
            .unwrap();
        clock.advance(Duration::seconds(1));
    }

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_get_includes_yaml_only_on_request() {
        let store = InMemoryEventStore::new();
        let clock = clock();
        create(&store, &clock, "cu-1").await;

        let without = get_config_update("cu-1", false, &store, &store)
            .await
            .unwrap();
        let with = get_config_update("cu-1", true, &store, &store)
            .await
            .unwrap();

        assert_eq!(without.yaml_config, None);
        assert_eq!(with.yaml_config.as_deref(), Some(YAML));
        assert_eq!(with.state, ConfigState::Stored);
    }

    #[tokio::test]
    async fn test_get_unknown_update_is_not_found() {
        let store = InMemoryEventStore::new();

        let result = get_config_update("cu-9", false, &store, &store).await;

        assert!(matches!(result, Err(DomainError::AggregateNotFound(_))));
    }

    #[tokio::test]
    async fn test_latest_active_update_skips_terminal_updates() {
        let store = InMemoryEventStore::new();
        let clock = clock();
        create(&store, &clock, "cu-old").await;
        create(&store, &clock, "cu-new").await;
        step(&store, &clock, "cu-old", ConfigStep::Publish).await;
        step(
            &store,
            &clock,
            "cu-new",
            ConfigStep::Fail {
                error: "rejected".to_owned(),
            },
        )
        .await;

        let active = latest_active_update("gw-1", &store).await.unwrap().unwrap();
        let none = latest_active_update("gw-2", &store).await.unwrap();

        assert_eq!(active.update_id, "cu-old");
        assert_eq!(active.state, ConfigState::WaitingForRequest);
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_list_filters_by_gateway_and_state() {
        let store = InMemoryEventStore::new();
        let clock = clock();
        create(&store, &clock, "cu-1").await;
        create(&store, &clock, "cu-2").await;
        step(&store, &clock, "cu-2", ConfigStep::Publish).await;

        let stored = list_config_updates(Some("gw-1"), Some(ConfigState::Stored), &store)
            .await
            .unwrap();
        let all = list_config_updates(None, None, &store).await.unwrap();

        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].update_id, "cu-1");
        assert_eq!(all[0].update_id, "cu-2");
    }

    #[tokio::test]
    async fn test_rebuild_matches_incremental_projection() {
        let store = InMemoryEventStore::new();
        let clock = clock();
        create(&store, &clock, "cu-1").await;
        step(&store, &clock, "cu-1", ConfigStep::Publish).await;
        step(&store, &clock, "cu-1", ConfigStep::Request).await;

        let projected = get_config_update("cu-1", false, &store, &store)
            .await
            .unwrap();
        let rebuilt = rebuild_config_projection("cu-1", &clock, &store, &store)
            .await
            .unwrap();

        assert_eq!(rebuilt, projected);
        assert_eq!(rebuilt.state, ConfigState::Notifying);
    }
}

//! Aggregate roots for the Configuration Rollout context.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use edgefleet_core::aggregate::{AggregateRoot, IgnoreReason, TransitionResult};
use edgefleet_core::clock::Clock;
use edgefleet_core::error::DomainError;
use edgefleet_core::event::{AggregateType, EventMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::{
    ConfigCreated, ConfigDelivered, ConfigEvent, ConfigEventKind, ConfigFailed, ConfigPublished,
    ConfigRequested, ConfigSent,
};

/// Configuration rollout state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigState {
    /// Nothing stored yet.
    Idle,
    /// Body stored, gateway not yet notified.
    Stored,
    /// Gateway notified, waiting for it to ask for the body.
    WaitingForRequest,
    /// Gateway asked, body being prepared.
    Notifying,
    /// Body sent, waiting for the acknowledgement.
    WaitingForAck,
    /// Acknowledged by the gateway; terminal.
    Completed,
    /// Rollout failed; terminal.
    Failed,
}

impl ConfigState {
    /// Returns the storage name of this state.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Stored => "stored",
            Self::WaitingForRequest => "waiting_for_request",
            Self::Notifying => "notifying",
            Self::WaitingForAck => "waiting_for_ack",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` for `completed` and `failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl FromStr for ConfigState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::Idle,
            Self::Stored,
            Self::WaitingForRequest,
            Self::Notifying,
            Self::WaitingForAck,
            Self::Completed,
            Self::Failed,
        ]
        .into_iter()
        .find(|state| state.as_str() == s)
        .ok_or_else(|| DomainError::Validation(format!("unknown config state: {s}")))
    }
}

/// Delivery progress as reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Stored, not yet announced.
    Pending,
    /// Gateway notified.
    Notified,
    /// Gateway requested the body.
    Requested,
    /// Body sent.
    Sent,
    /// Gateway acknowledged.
    Delivered,
    /// Rollout failed.
    Failed,
}

/// The aggregate root for a configuration update.
#[derive(Debug)]
pub struct ConfigUpdate {
    /// Aggregate identifier.
    pub id: String,
    pub(crate) version: i64,
    pub(crate) state: ConfigState,
    pub(crate) gateway_id: String,
    pub(crate) config_hash: String,
    pub(crate) delivery_status: Option<DeliveryStatus>,
    pub(crate) error: Option<String>,
    pub(crate) created_at: Option<DateTime<Utc>>,
    pub(crate) published_at: Option<DateTime<Utc>>,
    pub(crate) requested_at: Option<DateTime<Utc>>,
    pub(crate) sent_at: Option<DateTime<Utc>>,
    pub(crate) completed_at: Option<DateTime<Utc>>,
    pub(crate) failed_at: Option<DateTime<Utc>>,
    pub(crate) last_updated: Option<DateTime<Utc>>,
    uncommitted_events: Vec<ConfigEvent>,
}

impl ConfigUpdate {
    /// Creates an empty update in the `idle` state.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: -1,
            state: ConfigState::Idle,
            gateway_id: String::new(),
            config_hash: String::new(),
            delivery_status: None,
            error: None,
            created_at: None,
            published_at: None,
            requested_at: None,
            sent_at: None,
            completed_at: None,
            failed_at: None,
            last_updated: None,
            uncommitted_events: Vec::new(),
        }
    }

    /// Returns the current rollout state.
    #[must_use]
    pub fn state(&self) -> ConfigState {
        self.state
    }

    /// Returns the target gateway.
    #[must_use]
    pub fn gateway_id(&self) -> &str {
        &self.gateway_id
    }

    /// Returns `true` once any event has been applied.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.version >= 0
    }

    #[allow(clippy::cast_possible_wrap)]
    fn next_version(&self) -> i64 {
        self.version + self.uncommitted_events.len() as i64 + 1
    }

    fn record(&mut self, kind: ConfigEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        let event = ConfigEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: kind.event_type().to_owned(),
                aggregate_id: self.id.clone(),
                aggregate_type: AggregateType::ConfigUpdate,
                version: self.next_version(),
                correlation_id,
                causation_id: correlation_id,
                occurred_at: clock.now(),
            },
            kind,
        };
        self.uncommitted_events.push(event);
    }

    /// Records a `ConfigCreated` event.
    pub fn create(
        &mut self,
        gateway_id: String,
        config_hash: String,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) {
        let kind = ConfigEventKind::ConfigCreated(ConfigCreated {
            update_id: self.id.clone(),
            gateway_id,
            config_hash,
            timestamp: clock.now(),
        });
        self.record(kind, correlation_id, clock);
    }

    /// Records a `ConfigPublished` event.
    pub fn publish(&mut self, correlation_id: Uuid, clock: &dyn Clock) {
        let kind = ConfigEventKind::ConfigPublished(ConfigPublished {
            update_id: self.id.clone(),
            timestamp: clock.now(),
        });
        self.record(kind, correlation_id, clock);
    }

    /// Records a `ConfigRequested` event.
    pub fn request(&mut self, correlation_id: Uuid, clock: &dyn Clock) {
        let kind = ConfigEventKind::ConfigRequested(ConfigRequested {
            update_id: self.id.clone(),
            timestamp: clock.now(),
        });
        self.record(kind, correlation_id, clock);
    }

    /// Records a `ConfigSent` event.
    pub fn send(&mut self, correlation_id: Uuid, clock: &dyn Clock) {
        let kind = ConfigEventKind::ConfigSent(ConfigSent {
            update_id: self.id.clone(),
            timestamp: clock.now(),
        });
        self.record(kind, correlation_id, clock);
    }

    /// Records a `ConfigDelivered` event.
    pub fn deliver(&mut self, details: serde_json::Value, correlation_id: Uuid, clock: &dyn Clock) {
        let kind = ConfigEventKind::ConfigDelivered(ConfigDelivered {
            update_id: self.id.clone(),
            details,
            timestamp: clock.now(),
        });
        self.record(kind, correlation_id, clock);
    }

    /// Records a `ConfigFailed` event.
    pub fn fail(&mut self, error: String, correlation_id: Uuid, clock: &dyn Clock) {
        let kind = ConfigEventKind::ConfigFailed(ConfigFailed {
            update_id: self.id.clone(),
            error,
            timestamp: clock.now(),
        });
        self.record(kind, correlation_id, clock);
    }

    /// Moves `from` to `to` if the update is currently in `from`.
    fn advance(
        &mut self,
        from: ConfigState,
        to: ConfigState,
        event: &'static str,
    ) -> Result<(), TransitionResult> {
        if self.state.is_terminal() {
            return Err(TransitionResult::Ignored(IgnoreReason::TerminalState {
                state: self.state.as_str(),
            }));
        }
        if self.state != from {
            return Err(TransitionResult::Ignored(IgnoreReason::InvalidTransition {
                state: self.state.as_str(),
                event,
            }));
        }
        self.state = to;
        Ok(())
    }

    fn transition(&mut self, kind: &ConfigEventKind) -> TransitionResult {
        let event = kind.event_type();
        let outcome = match kind {
            ConfigEventKind::ConfigCreated(payload) => {
                if self.exists() {
                    return TransitionResult::Ignored(IgnoreReason::AlreadyCreated);
                }
                self.advance(ConfigState::Idle, ConfigState::Stored, event)
                    .map(|()| {
                        self.gateway_id.clone_from(&payload.gateway_id);
                        self.config_hash.clone_from(&payload.config_hash);
                        self.created_at = Some(payload.timestamp);
                        self.delivery_status = Some(DeliveryStatus::Pending);
                        payload.timestamp
                    })
            }
            ConfigEventKind::ConfigPublished(payload) => self
                .advance(ConfigState::Stored, ConfigState::WaitingForRequest, event)
                .map(|()| {
                    self.published_at = Some(payload.timestamp);
                    self.delivery_status = Some(DeliveryStatus::Notified);
                    payload.timestamp
                }),
            ConfigEventKind::ConfigRequested(payload) => self
                .advance(ConfigState::WaitingForRequest, ConfigState::Notifying, event)
                .map(|()| {
                    self.requested_at = Some(payload.timestamp);
                    self.delivery_status = Some(DeliveryStatus::Requested);
                    payload.timestamp
                }),
            ConfigEventKind::ConfigSent(payload) => self
                .advance(ConfigState::Notifying, ConfigState::WaitingForAck, event)
                .map(|()| {
                    self.sent_at = Some(payload.timestamp);
                    self.delivery_status = Some(DeliveryStatus::Sent);
                    payload.timestamp
                }),
            ConfigEventKind::ConfigDelivered(payload) => self
                .advance(ConfigState::WaitingForAck, ConfigState::Completed, event)
                .map(|()| {
                    self.completed_at = Some(payload.timestamp);
                    self.delivery_status = Some(DeliveryStatus::Delivered);
                    payload.timestamp
                }),
            ConfigEventKind::ConfigFailed(payload) => self.apply_failure(payload, event),
        };

        match outcome {
            Ok(at) => {
                self.last_updated = Some(at);
                TransitionResult::Applied
            }
            Err(ignored) => ignored,
        }
    }

    fn apply_failure(
        &mut self,
        payload: &ConfigFailed,
        event: &'static str,
    ) -> Result<DateTime<Utc>, TransitionResult> {
        match self.state {
            ConfigState::Completed | ConfigState::Failed => {
                Err(TransitionResult::Ignored(IgnoreReason::TerminalState {
                    state: self.state.as_str(),
                }))
            }
            ConfigState::Idle => Err(TransitionResult::Ignored(
                IgnoreReason::InvalidTransition {
                    state: self.state.as_str(),
                    event,
                },
            )),
            _ => {
                self.state = ConfigState::Failed;
                self.failed_at = Some(payload.timestamp);
                self.error = Some(payload.error.clone());
                self.delivery_status = Some(DeliveryStatus::Failed);
                Ok(payload.timestamp)
            }
        }
    }
}

impl AggregateRoot for ConfigUpdate {
    type Event = ConfigEvent;

    const AGGREGATE_TYPE: AggregateType = AggregateType::ConfigUpdate;

    fn aggregate_id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) -> TransitionResult {
        let result = self.transition(&event.kind);
        self.version = event.metadata.version;
        result
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use edgefleet_core::event::DomainEvent;
    use edgefleet_test_support::FixedClock;

    #[test]
    fn test_state_parses_its_storage_name() {
        assert_eq!(
            "waiting_for_ack".parse::<ConfigState>().unwrap(),
            ConfigState::WaitingForAck
        );
        assert!(matches!(
            "pending".parse::<ConfigState>(),
            Err(DomainError::Validation(_))
        ));
    }

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    fn event(version: i64, kind: ConfigEventKind) -> ConfigEvent {
        ConfigEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: kind.event_type().to_owned(),
                aggregate_id: "cu-1".to_owned(),
                aggregate_type: AggregateType::ConfigUpdate,
                version,
                correlation_id: Uuid::new_v4(),
                causation_id: Uuid::new_v4(),
                occurred_at: Utc::now(),
            },
            kind,
        }
    }

    fn created() -> ConfigEventKind {
        ConfigEventKind::ConfigCreated(ConfigCreated {
            update_id: "cu-1".to_owned(),
            gateway_id: "gw-1".to_owned(),
            config_hash: "abc".to_owned(),
            timestamp: at(0),
        })
    }

    fn published(seconds: i64) -> ConfigEventKind {
        ConfigEventKind::ConfigPublished(ConfigPublished {
            update_id: "cu-1".to_owned(),
            timestamp: at(seconds),
        })
    }

    fn requested(seconds: i64) -> ConfigEventKind {
        ConfigEventKind::ConfigRequested(ConfigRequested {
            update_id: "cu-1".to_owned(),
            timestamp: at(seconds),
        })
    }

    fn sent(seconds: i64) -> ConfigEventKind {
        ConfigEventKind::ConfigSent(ConfigSent {
            update_id: "cu-1".to_owned(),
            timestamp: at(seconds),
        })
    }

    fn delivered(seconds: i64) -> ConfigEventKind {
        ConfigEventKind::ConfigDelivered(ConfigDelivered {
            update_id: "cu-1".to_owned(),
            details: serde_json::json!({"status": "ok"}),
            timestamp: at(seconds),
        })
    }

    fn failed(seconds: i64) -> ConfigEventKind {
        ConfigEventKind::ConfigFailed(ConfigFailed {
            update_id: "cu-1".to_owned(),
            error: "timeout".to_owned(),
            timestamp: at(seconds),
        })
    }

    fn replay(kinds: Vec<ConfigEventKind>) -> (ConfigUpdate, Vec<TransitionResult>) {
        let mut update = ConfigUpdate::new("cu-1");
        let results = kinds
            .into_iter()
            .enumerate()
            .map(|(i, kind)| update.apply(&event(i64::try_from(i).unwrap(), kind)))
            .collect();
        (update, results)
    }

    #[test]
    fn test_create_records_event_with_hash() {
        let mut update = ConfigUpdate::new("cu-1");
        let clock = FixedClock(at(0));

        update.create("gw-1".to_owned(), "abc".to_owned(), Uuid::new_v4(), &clock);
        update.publish(Uuid::new_v4(), &clock);

        let events = update.uncommitted_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type(), "config.created");
        assert_eq!(events[0].metadata().version, 0);
        assert_eq!(events[1].metadata().version, 1);
    }

    #[test]
    fn test_happy_path_reaches_completed() {
        let (update, results) = replay(vec![
            created(),
            published(1),
            requested(2),
            sent(3),
            delivered(4),
        ]);

        assert!(results.iter().all(TransitionResult::is_applied));
        assert_eq!(update.state(), ConfigState::Completed);
        assert_eq!(update.delivery_status, Some(DeliveryStatus::Delivered));
        assert_eq!(update.gateway_id(), "gw-1");
        assert_eq!(update.config_hash, "abc");
        assert_eq!(update.published_at, Some(at(1)));
        assert_eq!(update.requested_at, Some(at(2)));
        assert_eq!(update.sent_at, Some(at(3)));
        assert_eq!(update.completed_at, Some(at(4)));
        assert_eq!(update.last_updated, Some(at(4)));
        assert_eq!(update.version(), 4);
    }

    #[test]
    fn test_failure_while_waiting_for_ack() {
        let (update, results) = replay(vec![
            created(),
            published(1),
            requested(2),
            sent(3),
            failed(4),
        ]);

        assert_eq!(results[4], TransitionResult::Applied);
        assert_eq!(update.state(), ConfigState::Failed);
        assert_eq!(update.error.as_deref(), Some("timeout"));
        assert_eq!(update.failed_at, Some(at(4)));
        assert_eq!(update.delivery_status, Some(DeliveryStatus::Failed));
    }

    #[test]
    fn test_failure_from_idle_is_ignored() {
        let (update, results) = replay(vec![failed(0)]);

        assert_eq!(
            results[0],
            TransitionResult::Ignored(IgnoreReason::InvalidTransition {
                state: "idle",
                event: "config.failed",
            })
        );
        assert_eq!(update.state(), ConfigState::Idle);
        assert_eq!(update.version(), 0);
    }

    #[test]
    fn test_out_of_order_step_is_ignored() {
        let (update, results) = replay(vec![created(), sent(1)]);

        assert_eq!(
            results[1],
            TransitionResult::Ignored(IgnoreReason::InvalidTransition {
                state: "stored",
                event: "config.sent",
            })
        );
        assert_eq!(update.state(), ConfigState::Stored);
        assert_eq!(update.sent_at, None);
    }

    #[test]
    fn test_terminal_states_ignore_further_events() {
        let (completed, results) = replay(vec![
            created(),
            published(1),
            requested(2),
            sent(3),
            delivered(4),
            failed(5),
        ]);
        assert_eq!(
            results[5],
            TransitionResult::Ignored(IgnoreReason::TerminalState { state: "completed" })
        );
        assert_eq!(completed.state(), ConfigState::Completed);

        let (failed_update, results) = replay(vec![created(), failed(1), failed(2), published(3)]);
        assert!(!results[2].is_applied());
        assert!(!results[3].is_applied());
        assert_eq!(failed_update.state(), ConfigState::Failed);
        assert_eq!(failed_update.failed_at, Some(at(1)));
        assert_eq!(failed_update.version(), 3);
    }

    #[test]
    fn test_second_created_event_is_ignored() {
        let (update, results) = replay(vec![created(), created()]);

        assert_eq!(
            results[1],
            TransitionResult::Ignored(IgnoreReason::AlreadyCreated)
        );
        assert_eq!(update.state(), ConfigState::Stored);
    }
}

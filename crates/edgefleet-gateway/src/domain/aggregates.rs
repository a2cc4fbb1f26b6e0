//! Aggregate roots for the Gateway Lifecycle context.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use edgefleet_core::aggregate::{AggregateRoot, IgnoreReason, TransitionResult};
use edgefleet_core::clock::Clock;
use edgefleet_core::error::DomainError;
use edgefleet_core::event::{AggregateType, EventMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::{
    CertificateInfo, CertificateStatus, GatewayConnected, GatewayCreated, GatewayDeleted,
    GatewayDisconnected, GatewayEvent, GatewayEventKind, GatewayUpdate, GatewayUpdated,
    ReportedStatus,
};

/// Error marker status set when a gateway is reported or detected offline.
pub const REPORTED_OFFLINE: &str = "reported offline";

/// Error marker status set when a gateway's certificate is removed.
pub const CERTIFICATE_REMOVED: &str = "certificate removed";

/// Gateway lifecycle state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayStatus {
    /// Registered, never connected.
    Created,
    /// Connected with an installed certificate.
    Connected,
    /// Previously connected, currently offline.
    Disconnected,
    /// Deleted; terminal.
    Deleted,
}

impl GatewayStatus {
    /// Returns the storage name of this state.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Deleted => "deleted",
        }
    }
}

impl FromStr for GatewayStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "connected" => Ok(Self::Connected),
            "disconnected" => Ok(Self::Disconnected),
            "deleted" => Ok(Self::Deleted),
            other => Err(DomainError::Validation(format!(
                "unknown gateway state: {other}"
            ))),
        }
    }
}

/// Error marker attached to an offline gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayErrorMarker {
    /// Short marker, e.g. `"reported offline"`.
    pub status: String,
    /// Optional detail, e.g. `"missed heartbeats"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// The aggregate root for a gateway.
#[derive(Debug)]
pub struct Gateway {
    /// Aggregate identifier.
    pub id: String,
    /// Version of the last applied event (-1 before any).
    pub(crate) version: i64,
    pub(crate) status: GatewayStatus,
    pub(crate) name: String,
    pub(crate) location: String,
    pub(crate) last_updated: Option<DateTime<Utc>>,
    pub(crate) last_heartbeat: Option<DateTime<Utc>>,
    pub(crate) last_acknowledged_at: Option<DateTime<Utc>>,
    pub(crate) uptime: Option<u64>,
    pub(crate) health: Option<serde_json::Value>,
    pub(crate) error: Option<GatewayErrorMarker>,
    pub(crate) certificate_info: CertificateInfo,
    pub(crate) created_at: Option<DateTime<Utc>>,
    pub(crate) connected_at: Option<DateTime<Utc>>,
    pub(crate) disconnected_at: Option<DateTime<Utc>>,
    pub(crate) deleted_at: Option<DateTime<Utc>>,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<GatewayEvent>,
}

impl Gateway {
    /// Creates an empty gateway in the implicit `created` state.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: -1,
            status: GatewayStatus::Created,
            name: String::new(),
            location: String::new(),
            last_updated: None,
            last_heartbeat: None,
            last_acknowledged_at: None,
            uptime: None,
            health: None,
            error: None,
            certificate_info: CertificateInfo::not_installed(),
            created_at: None,
            connected_at: None,
            disconnected_at: None,
            deleted_at: None,
            uncommitted_events: Vec::new(),
        }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn status(&self) -> GatewayStatus {
        self.status
    }

    /// Returns `true` once any event has been applied.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.version >= 0
    }

    /// Returns the next version for a new event.
    #[allow(clippy::cast_possible_wrap)]
    fn next_version(&self) -> i64 {
        self.version + self.uncommitted_events.len() as i64 + 1
    }

    fn record(&mut self, kind: GatewayEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        let event = GatewayEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: kind.event_type().to_owned(),
                aggregate_id: self.id.clone(),
                aggregate_type: AggregateType::Gateway,
                version: self.next_version(),
                correlation_id,
                causation_id: correlation_id,
                occurred_at: clock.now(),
            },
            kind,
        };
        self.uncommitted_events.push(event);
    }

    /// Records a `GatewayCreated` event.
    pub fn register(&mut self, name: String, location: String, correlation_id: Uuid, clock: &dyn Clock) {
        let kind = GatewayEventKind::GatewayCreated(GatewayCreated {
            gateway_id: self.id.clone(),
            name,
            location,
            timestamp: clock.now(),
        });
        self.record(kind, correlation_id, clock);
    }

    /// Records a `GatewayConnected` event.
    pub fn connect(&mut self, correlation_id: Uuid, clock: &dyn Clock) {
        let kind = GatewayEventKind::GatewayConnected(GatewayConnected {
            gateway_id: self.id.clone(),
            timestamp: clock.now(),
        });
        self.record(kind, correlation_id, clock);
    }

    /// Records a `GatewayDisconnected` event.
    ///
    /// With `stale_before` set the event only disconnects a gateway last
    /// seen strictly before that instant.
    pub fn disconnect(
        &mut self,
        reason: Option<String>,
        stale_before: Option<DateTime<Utc>>,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) {
        let kind = GatewayEventKind::GatewayDisconnected(GatewayDisconnected {
            gateway_id: self.id.clone(),
            reason,
            stale_before,
            timestamp: clock.now(),
        });
        self.record(kind, correlation_id, clock);
    }

    /// Records a `GatewayUpdated` event carrying a heartbeat, status or acknowledgement.
    pub fn report(&mut self, update: GatewayUpdate, correlation_id: Uuid, clock: &dyn Clock) {
        let kind = GatewayEventKind::GatewayUpdated(GatewayUpdated {
            gateway_id: self.id.clone(),
            update,
            timestamp: clock.now(),
        });
        self.record(kind, correlation_id, clock);
    }

    /// Records a `GatewayDeleted` event.
    pub fn delete(&mut self, reason: Option<String>, correlation_id: Uuid, clock: &dyn Clock) {
        let kind = GatewayEventKind::GatewayDeleted(GatewayDeleted {
            gateway_id: self.id.clone(),
            reason,
            timestamp: clock.now(),
        });
        self.record(kind, correlation_id, clock);
    }

    /// Latest heartbeat, or the connection time when none arrived since.
    fn last_seen(&self) -> Option<DateTime<Utc>> {
        match (self.last_heartbeat, self.connected_at) {
            (Some(heartbeat), Some(connected)) => Some(heartbeat.max(connected)),
            (heartbeat, connected) => heartbeat.or(connected),
        }
    }

    fn invalid(&self, event: &'static str) -> TransitionResult {
        TransitionResult::Ignored(IgnoreReason::InvalidTransition {
            state: self.status.as_str(),
            event,
        })
    }

    fn mark_connected(&mut self, at: DateTime<Utc>) {
        self.status = GatewayStatus::Connected;
        self.connected_at = Some(at);
        self.error = None;
        self.last_updated = Some(at);
    }

    fn mark_disconnected(&mut self, at: DateTime<Utc>, marker: GatewayErrorMarker) {
        self.status = GatewayStatus::Disconnected;
        self.disconnected_at = Some(at);
        self.error = Some(marker);
        self.last_updated = Some(at);
    }

    fn transition(&mut self, kind: &GatewayEventKind) -> TransitionResult {
        if self.status == GatewayStatus::Deleted {
            return TransitionResult::Ignored(IgnoreReason::TerminalState {
                state: GatewayStatus::Deleted.as_str(),
            });
        }

        match kind {
            GatewayEventKind::GatewayCreated(payload) => {
                if self.exists() {
                    return TransitionResult::Ignored(IgnoreReason::AlreadyCreated);
                }
                self.name.clone_from(&payload.name);
                self.location.clone_from(&payload.location);
                self.created_at = Some(payload.timestamp);
                self.last_updated = Some(payload.timestamp);
                TransitionResult::Applied
            }
            GatewayEventKind::GatewayConnected(payload) => match self.status {
                GatewayStatus::Created | GatewayStatus::Disconnected => {
                    if !self.certificate_info.is_installed() {
                        return TransitionResult::Ignored(IgnoreReason::CertificateNotInstalled);
                    }
                    self.mark_connected(payload.timestamp);
                    TransitionResult::Applied
                }
                _ => self.invalid(kind.event_type()),
            },
            GatewayEventKind::GatewayDisconnected(payload) => {
                if self.status != GatewayStatus::Connected {
                    return self.invalid(kind.event_type());
                }
                if let Some(cutoff) = payload.stale_before
                    && self.last_seen().is_some_and(|seen| seen >= cutoff)
                {
                    return TransitionResult::Ignored(IgnoreReason::RecentlySeen);
                }
                self.mark_disconnected(
                    payload.timestamp,
                    GatewayErrorMarker {
                        status: REPORTED_OFFLINE.to_owned(),
                        reason: payload.reason.clone(),
                    },
                );
                TransitionResult::Applied
            }
            GatewayEventKind::GatewayUpdated(payload) => {
                self.apply_update(&payload.update, payload.timestamp)
            }
            GatewayEventKind::GatewayDeleted(payload) => {
                self.status = GatewayStatus::Deleted;
                self.deleted_at = Some(payload.timestamp);
                self.last_updated = Some(payload.timestamp);
                TransitionResult::Applied
            }
        }
    }

    fn apply_update(&mut self, update: &GatewayUpdate, at: DateTime<Utc>) -> TransitionResult {
        match update {
            GatewayUpdate::Heartbeat { uptime, health } => {
                self.last_heartbeat = Some(at);
                self.last_updated = Some(at);
                if uptime.is_some() {
                    self.uptime = *uptime;
                }
                if health.is_some() {
                    self.health.clone_from(health);
                }
                // Heartbeats from an offline gateway bring it back.
                if self.status == GatewayStatus::Disconnected && self.certificate_info.is_installed()
                {
                    self.mark_connected(at);
                }
                TransitionResult::Applied
            }
            GatewayUpdate::Status {
                status,
                certificate_info,
            } => self.apply_status(*status, certificate_info.as_ref(), at, update.label()),
            GatewayUpdate::Acknowledge { .. } => {
                self.last_acknowledged_at = Some(at);
                self.last_updated = Some(at);
                TransitionResult::Applied
            }
        }
    }

    fn apply_status(
        &mut self,
        status: ReportedStatus,
        certificate_info: Option<&CertificateInfo>,
        at: DateTime<Utc>,
        label: &'static str,
    ) -> TransitionResult {
        match status {
            ReportedStatus::Online => {
                if self.status == GatewayStatus::Connected {
                    return self.invalid(label);
                }
                let certificate = certificate_info.unwrap_or(&self.certificate_info);
                if !certificate.is_installed() {
                    return TransitionResult::Ignored(IgnoreReason::CertificateNotInstalled);
                }
                self.certificate_info = certificate.clone();
                self.mark_connected(at);
            }
            ReportedStatus::Offline => {
                if self.status != GatewayStatus::Connected {
                    return self.invalid(label);
                }
                if let Some(info) = certificate_info {
                    self.certificate_info = info.clone();
                }
                self.mark_disconnected(
                    at,
                    GatewayErrorMarker {
                        status: REPORTED_OFFLINE.to_owned(),
                        reason: None,
                    },
                );
            }
            ReportedStatus::CertificateRemoved => {
                self.certificate_info = certificate_info.cloned().unwrap_or_default();
                self.certificate_info.status = CertificateStatus::Removed;
                if self.status == GatewayStatus::Connected {
                    self.mark_disconnected(
                        at,
                        GatewayErrorMarker {
                            status: CERTIFICATE_REMOVED.to_owned(),
                            reason: None,
                        },
                    );
                } else {
                    self.last_updated = Some(at);
                }
            }
            ReportedStatus::CertificateInstalled => {
                self.certificate_info = certificate_info.cloned().unwrap_or_default();
                self.certificate_info.status = CertificateStatus::Installed;
                self.last_updated = Some(at);
            }
        }
        TransitionResult::Applied
    }
}

impl AggregateRoot for Gateway {
    type Event = GatewayEvent;

    const AGGREGATE_TYPE: AggregateType = AggregateType::Gateway;

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

    fn fixed_clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    #[test]
    fn test_status_parses_its_storage_name() {
        for status in [
            GatewayStatus::Created,
            GatewayStatus::Connected,
            GatewayStatus::Disconnected,
            GatewayStatus::Deleted,
        ] {
            assert_eq!(status.as_str().parse::<GatewayStatus>().unwrap(), status);
        }
        assert!(matches!(
            "online".parse::<GatewayStatus>(),
            Err(DomainError::Validation(_))
        ));
    }

    fn event(version: i64, kind: GatewayEventKind) -> GatewayEvent {
        GatewayEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: kind.event_type().to_owned(),
                aggregate_id: "gw-1".to_owned(),
                aggregate_type: AggregateType::Gateway,
                version,
                correlation_id: Uuid::new_v4(),
                causation_id: Uuid::new_v4(),
                occurred_at: Utc::now(),
            },
            kind,
        }
    }

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    fn created() -> GatewayEventKind {
        GatewayEventKind::GatewayCreated(GatewayCreated {
            gateway_id: "gw-1".to_owned(),
            name: "A".to_owned(),
            location: "Room1".to_owned(),
            timestamp: at(0),
        })
    }

    fn updated(update: GatewayUpdate, seconds: i64) -> GatewayEventKind {
        GatewayEventKind::GatewayUpdated(GatewayUpdated {
            gateway_id: "gw-1".to_owned(),
            update,
            timestamp: at(seconds),
        })
    }

    fn heartbeat(seconds: i64) -> GatewayEventKind {
        updated(
            GatewayUpdate::Heartbeat {
                uptime: Some(120),
                health: Some(serde_json::json!({"cpu": 0.4})),
            },
            seconds,
        )
    }

    fn status(status: ReportedStatus, seconds: i64) -> GatewayEventKind {
        updated(
            GatewayUpdate::Status {
                status,
                certificate_info: None,
            },
            seconds,
        )
    }

    fn connected(seconds: i64) -> GatewayEventKind {
        GatewayEventKind::GatewayConnected(GatewayConnected {
            gateway_id: "gw-1".to_owned(),
            timestamp: at(seconds),
        })
    }

    fn disconnected(seconds: i64) -> GatewayEventKind {
        GatewayEventKind::GatewayDisconnected(GatewayDisconnected {
            gateway_id: "gw-1".to_owned(),
            reason: Some("missed heartbeats".to_owned()),
            stale_before: None,
            timestamp: at(seconds),
        })
    }

    fn timed_out(seconds: i64, stale_before: i64) -> GatewayEventKind {
        GatewayEventKind::GatewayDisconnected(GatewayDisconnected {
            gateway_id: "gw-1".to_owned(),
            reason: Some("missed heartbeats".to_owned()),
            stale_before: Some(at(stale_before)),
            timestamp: at(seconds),
        })
    }

    fn deleted(seconds: i64) -> GatewayEventKind {
        GatewayEventKind::GatewayDeleted(GatewayDeleted {
            gateway_id: "gw-1".to_owned(),
            reason: None,
            timestamp: at(seconds),
        })
    }

    /// Replays `kinds` in order and returns the gateway with every result.
    fn replay(kinds: Vec<GatewayEventKind>) -> (Gateway, Vec<TransitionResult>) {
        let mut gateway = Gateway::new("gw-1");
        let results = kinds
            .into_iter()
            .enumerate()
            .map(|(i, kind)| gateway.apply(&event(i64::try_from(i).unwrap(), kind)))
            .collect();
        (gateway, results)
    }

    fn connected_gateway() -> Gateway {
        let (gateway, results) = replay(vec![
            created(),
            status(ReportedStatus::CertificateInstalled, 1),
            connected(2),
        ]);
        assert!(results.iter().all(TransitionResult::is_applied));
        gateway
    }

    // --- recording ---

    #[test]
    fn test_register_records_created_event_at_version_zero() {
        let mut gateway = Gateway::new("gw-1");
        let correlation_id = Uuid::new_v4();

        gateway.register("A".to_owned(), "Room1".to_owned(), correlation_id, &fixed_clock());
        gateway.report(
            GatewayUpdate::Heartbeat {
                uptime: None,
                health: None,
            },
            correlation_id,
            &fixed_clock(),
        );

        let events = gateway.uncommitted_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type(), "gateway.created");
        assert_eq!(events[0].metadata().version, 0);
        assert_eq!(events[1].event_type(), "gateway.updated");
        assert_eq!(events[1].metadata().version, 1);
        assert_eq!(events[1].metadata().correlation_id, correlation_id);
    }

    // --- created ---

    #[test]
    fn test_new_gateway_starts_in_created_with_version_minus_one() {
        let gateway = Gateway::new("gw-1");

        assert_eq!(gateway.status(), GatewayStatus::Created);
        assert_eq!(gateway.version(), -1);
        assert!(!gateway.exists());
    }

    #[test]
    fn test_apply_created_sets_details() {
        let (gateway, results) = replay(vec![created()]);

        assert_eq!(results, vec![TransitionResult::Applied]);
        assert_eq!(gateway.name, "A");
        assert_eq!(gateway.location, "Room1");
        assert_eq!(gateway.created_at, Some(at(0)));
        assert_eq!(gateway.version(), 0);
    }

    #[test]
    fn test_second_created_event_is_ignored() {
        let (gateway, results) = replay(vec![created(), created()]);

        assert_eq!(
            results[1],
            TransitionResult::Ignored(IgnoreReason::AlreadyCreated)
        );
        assert_eq!(gateway.version(), 1);
    }

    // --- certificate gate ---

    #[test]
    fn test_connect_without_certificate_is_ignored() {
        let (gateway, results) = replay(vec![created(), connected(1)]);

        assert_eq!(
            results[1],
            TransitionResult::Ignored(IgnoreReason::CertificateNotInstalled)
        );
        assert_eq!(gateway.status(), GatewayStatus::Created);
        assert_eq!(gateway.connected_at, None);
    }

    #[test]
    fn test_status_online_without_certificate_does_not_connect() {
        let (gateway, results) = replay(vec![created(), status(ReportedStatus::Online, 1)]);

        assert_eq!(
            results[1],
            TransitionResult::Ignored(IgnoreReason::CertificateNotInstalled)
        );
        assert_eq!(gateway.status(), GatewayStatus::Created);
    }

    #[test]
    fn test_status_online_with_installed_certificate_connects() {
        let online = updated(
            GatewayUpdate::Status {
                status: ReportedStatus::Online,
                certificate_info: Some(CertificateInfo {
                    status: CertificateStatus::Installed,
                    certificate_id: Some("cert-1".to_owned()),
                    expires_at: None,
                }),
            },
            5,
        );

        let (gateway, results) = replay(vec![created(), online]);

        assert_eq!(results[1], TransitionResult::Applied);
        assert_eq!(gateway.status(), GatewayStatus::Connected);
        assert_eq!(gateway.connected_at, Some(at(5)));
        assert_eq!(gateway.certificate_info.certificate_id.as_deref(), Some("cert-1"));
    }

    #[test]
    fn test_connect_with_installed_certificate_connects() {
        let gateway = connected_gateway();

        assert_eq!(gateway.status(), GatewayStatus::Connected);
        assert_eq!(gateway.connected_at, Some(at(2)));
    }

    #[test]
    fn test_connect_while_connected_is_invalid() {
        let mut gateway = connected_gateway();

        let result = gateway.apply(&event(3, connected(3)));

        assert_eq!(
            result,
            TransitionResult::Ignored(IgnoreReason::InvalidTransition {
                state: "connected",
                event: "gateway.connected",
            })
        );
    }

    // --- disconnect ---

    #[test]
    fn test_disconnect_sets_reported_offline_marker() {
        let mut gateway = connected_gateway();

        let result = gateway.apply(&event(3, disconnected(100)));

        assert_eq!(result, TransitionResult::Applied);
        assert_eq!(gateway.status(), GatewayStatus::Disconnected);
        assert_eq!(gateway.disconnected_at, Some(at(100)));
        assert_eq!(
            gateway.error,
            Some(GatewayErrorMarker {
                status: "reported offline".to_owned(),
                reason: Some("missed heartbeats".to_owned()),
            })
        );
    }

    #[test]
    fn test_timeout_disconnects_gateway_silent_since_before_cutoff() {
        // connected at 2, cutoff 10
        let mut gateway = connected_gateway();

        let result = gateway.apply(&event(3, timed_out(100, 10)));

        assert_eq!(result, TransitionResult::Applied);
        assert_eq!(gateway.status(), GatewayStatus::Disconnected);
    }

    #[test]
    fn test_timeout_is_ignored_after_a_heartbeat_past_the_cutoff() {
        let mut gateway = connected_gateway();
        assert!(gateway.apply(&event(3, heartbeat(95))).is_applied());

        let result = gateway.apply(&event(4, timed_out(100, 10)));

        assert_eq!(result, TransitionResult::Ignored(IgnoreReason::RecentlySeen));
        assert_eq!(gateway.status(), GatewayStatus::Connected);
        assert_eq!(gateway.error, None);
    }

    #[test]
    fn test_timeout_cutoff_equal_to_last_seen_keeps_gateway_connected() {
        let mut gateway = connected_gateway();

        let result = gateway.apply(&event(3, timed_out(100, 2)));

        assert_eq!(result, TransitionResult::Ignored(IgnoreReason::RecentlySeen));
    }

    #[test]
    fn test_disconnect_from_created_is_invalid() {
        let (gateway, results) = replay(vec![created(), disconnected(1)]);

        assert!(!results[1].is_applied());
        assert_eq!(gateway.status(), GatewayStatus::Created);
        assert_eq!(gateway.error, None);
    }

    #[test]
    fn test_status_offline_disconnects_connected_gateway() {
        let mut gateway = connected_gateway();

        let result = gateway.apply(&event(3, status(ReportedStatus::Offline, 10)));

        assert_eq!(result, TransitionResult::Applied);
        assert_eq!(gateway.status(), GatewayStatus::Disconnected);
        assert_eq!(gateway.error.as_ref().unwrap().status, REPORTED_OFFLINE);
    }

    #[test]
    fn test_certificate_removed_disconnects_with_marker() {
        let mut gateway = connected_gateway();

        let result = gateway.apply(&event(3, status(ReportedStatus::CertificateRemoved, 10)));

        assert_eq!(result, TransitionResult::Applied);
        assert_eq!(gateway.status(), GatewayStatus::Disconnected);
        assert_eq!(gateway.certificate_info.status, CertificateStatus::Removed);
        assert_eq!(gateway.error.as_ref().unwrap().status, CERTIFICATE_REMOVED);
    }

    // --- heartbeat ---

    #[test]
    fn test_heartbeat_on_created_gateway_keeps_created() {
        let (gateway, results) = replay(vec![created(), heartbeat(30)]);

        assert_eq!(results[1], TransitionResult::Applied);
        assert_eq!(gateway.status(), GatewayStatus::Created);
        assert_eq!(gateway.last_heartbeat, Some(at(30)));
        assert_eq!(gateway.uptime, Some(120));
    }

    #[test]
    fn test_heartbeat_reconnects_disconnected_gateway_and_clears_error() {
        let mut gateway = connected_gateway();
        gateway.apply(&event(3, disconnected(100)));

        let result = gateway.apply(&event(4, heartbeat(130)));

        assert_eq!(result, TransitionResult::Applied);
        assert_eq!(gateway.status(), GatewayStatus::Connected);
        assert_eq!(gateway.error, None);
        assert_eq!(gateway.last_heartbeat, Some(at(130)));
        assert_eq!(gateway.connected_at, Some(at(130)));
    }

    #[test]
    fn test_heartbeat_after_certificate_removal_does_not_reconnect() {
        let mut gateway = connected_gateway();
        gateway.apply(&event(3, status(ReportedStatus::CertificateRemoved, 10)));

        gateway.apply(&event(4, heartbeat(40)));

        assert_eq!(gateway.status(), GatewayStatus::Disconnected);
        assert_eq!(gateway.last_heartbeat, Some(at(40)));
    }

    // --- deleted ---

    #[test]
    fn test_deleted_is_terminal_for_every_event() {
        let mut gateway = connected_gateway();
        assert_eq!(gateway.apply(&event(3, deleted(50))), TransitionResult::Applied);

        let followups = vec![
            heartbeat(60),
            connected(61),
            status(ReportedStatus::Online, 62),
            disconnected(63),
            deleted(64),
        ];
        for (i, kind) in followups.into_iter().enumerate() {
            let result = gateway.apply(&event(4 + i64::try_from(i).unwrap(), kind));
            assert_eq!(
                result,
                TransitionResult::Ignored(IgnoreReason::TerminalState { state: "deleted" })
            );
        }

        assert_eq!(gateway.status(), GatewayStatus::Deleted);
        assert_eq!(gateway.deleted_at, Some(at(50)));
        assert_eq!(gateway.last_heartbeat, None);
        assert_eq!(gateway.version(), 8);
    }

    #[test]
    fn test_acknowledge_records_timestamp_without_state_change() {
        let ack = updated(
            GatewayUpdate::Acknowledge {
                details: serde_json::json!({"message_id": "m-1"}),
            },
            7,
        );

        let (gateway, results) = replay(vec![created(), ack]);

        assert_eq!(results[1], TransitionResult::Applied);
        assert_eq!(gateway.status(), GatewayStatus::Created);
        assert_eq!(gateway.last_acknowledged_at, Some(at(7)));
    }
}

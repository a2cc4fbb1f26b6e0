//! Aggregate root abstraction.

use std::fmt;

use serde::Serialize;

use crate::event::{AggregateType, DomainEvent};

/// Why an event was recorded but left the aggregate's state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum IgnoreReason {
    /// The event is not valid from the aggregate's current state.
    InvalidTransition {
        /// State the aggregate was in.
        state: &'static str,
        /// Event type that was rejected.
        event: &'static str,
    },
    /// The aggregate already reached a terminal state.
    TerminalState {
        /// The terminal state.
        state: &'static str,
    },
    /// A connection was requested without an installed certificate.
    CertificateNotInstalled,
    /// A creation event arrived for an aggregate that already exists.
    AlreadyCreated,
    /// A timeout arrived for a gateway seen after the timeout cutoff.
    RecentlySeen,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTransition { state, event } => {
                write!(f, "{event} is not valid from state {state}")
            }
            Self::TerminalState { state } => write!(f, "aggregate is in terminal state {state}"),
            Self::CertificateNotInstalled => f.write_str("certificate is not installed"),
            Self::AlreadyCreated => f.write_str("aggregate already created"),
            Self::RecentlySeen => f.write_str("gateway was seen after the timeout cutoff"),
        }
    }
}

/// Outcome of applying one event to an aggregate.
///
/// Replay never fails: an event whose preconditions do not hold is reported
/// as `Ignored` and leaves the aggregate's state unchanged, while its version
/// still advances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransitionResult {
    /// The event was applied.
    Applied,
    /// The event was recorded but did not change state.
    Ignored(IgnoreReason),
}

impl TransitionResult {
    /// Returns `true` if the event changed the aggregate.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Trait for aggregate roots that reconstitute from event history.
pub trait AggregateRoot: Send + Sync {
    /// The event type this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The stream kind this aggregate is stored under.
    const AGGREGATE_TYPE: AggregateType;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> &str;

    /// Returns the current version (-1 before any event was applied).
    fn version(&self) -> i64;

    /// Apply an event to mutate internal state (used during reconstitution).
    fn apply(&mut self, event: &Self::Event) -> TransitionResult;

    /// Returns uncommitted events produced by command handling.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Clears uncommitted events after persistence.
    fn clear_uncommitted_events(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignored_serializes_with_reason_tag() {
        let result = TransitionResult::Ignored(IgnoreReason::InvalidTransition {
            state: "deleted",
            event: "gateway.connected",
        });

        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["outcome"], "ignored");
        assert_eq!(json["reason"], "invalid_transition");
        assert_eq!(json["state"], "deleted");
        assert_eq!(json["event"], "gateway.connected");
    }

    #[test]
    fn test_ignore_reason_display() {
        assert_eq!(
            IgnoreReason::TerminalState { state: "completed" }.to_string(),
            "aggregate is in terminal state completed"
        );
        assert!(!TransitionResult::Ignored(IgnoreReason::AlreadyCreated).is_applied());
        assert!(TransitionResult::Applied.is_applied());
    }
}

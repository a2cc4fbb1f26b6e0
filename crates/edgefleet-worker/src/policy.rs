//! Auto-registration policy.
//!
//! Gateways announce themselves over the message bus before anyone
//! registers them through the API. Messages that only make sense for a
//! live device register the gateway on the fly; destructive ones do not.

/// Kind of device message addressed to a gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayMessageKind {
    /// Periodic liveness signal.
    Heartbeat,
    /// Status report.
    Status,
    /// Acknowledgement.
    Acknowledge,
    /// Deletion request.
    Delete,
}

/// Returns `true` if a message of `kind` for an unknown gateway should
/// register that gateway first.
#[must_use]
pub fn allow_auto_register(kind: GatewayMessageKind) -> bool {
    match kind {
        GatewayMessageKind::Heartbeat
        | GatewayMessageKind::Status
        | GatewayMessageKind::Acknowledge => true,
        GatewayMessageKind::Delete => false,
    }
}

//! Edgefleet — Gateway Lifecycle bounded context.
//!
//! Responsible for the device lifecycle of edge gateways: registration,
//! certificate-gated connection, heartbeats, disconnection and deletion.
//! Gateway state is derived only by replaying the gateway's event stream.

pub mod application;
pub mod domain;

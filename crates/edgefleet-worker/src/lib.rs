//! Edgefleet Worker — turns inbound commands and message-bus events into
//! domain events.
//!
//! The `Dispatcher` validates and shapes each `InboundMessage`, applies the
//! auto-registration policy, retries appends on concurrency conflicts and
//! drives the container lifecycle hooks. The heartbeat monitor polls the
//! read model and reports connected gateways that went silent.

pub mod config;
pub mod container;
pub mod dispatcher;
pub mod heartbeat;
pub mod message;
pub mod policy;
pub mod topic;

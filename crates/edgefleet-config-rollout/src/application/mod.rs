//! Application layer for the Configuration Rollout context.

pub mod command_handlers;
pub mod projection;
pub mod query_handlers;

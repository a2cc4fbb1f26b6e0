//! Application layer for the Gateway Lifecycle context.

pub mod command_handlers;
pub mod projection;
pub mod query_handlers;

//! Domain layer for the Gateway Lifecycle context.

pub mod aggregates;
pub mod commands;
pub mod events;

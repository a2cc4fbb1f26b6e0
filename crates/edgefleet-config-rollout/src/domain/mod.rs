//! Domain layer for the Configuration Rollout context.

pub mod aggregates;
pub mod commands;
pub mod content;
pub mod events;

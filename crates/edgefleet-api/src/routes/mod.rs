//! Route modules organized by resource.

pub mod configs;
pub mod events;
pub mod gateways;
pub mod health;

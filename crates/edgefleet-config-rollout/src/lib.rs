//! Edgefleet — Configuration Rollout bounded context.
//!
//! Tracks a configuration update from storage through notification, device
//! request, transmission and acknowledgement. Configuration bodies are YAML
//! documents stored once per SHA-256 content hash.

pub mod application;
pub mod domain;

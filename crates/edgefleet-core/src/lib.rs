//! Edgefleet Core — shared domain abstractions.
//!
//! This crate defines the fundamental traits and types that the gateway and
//! configuration-rollout contexts depend on: the event envelope, the
//! aggregate contract, the storage ports and the clock. It contains no
//! infrastructure code.

pub mod aggregate;
pub mod blob;
pub mod clock;
pub mod command;
pub mod container;
pub mod error;
pub mod event;
pub mod projection;
pub mod repository;

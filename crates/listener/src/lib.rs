//! `statebus-listener` library crate.
//!
//! Binds the generic transition observer to guest networks and reports
//! their state changes on the event bus. The binary entrypoint lives in
//! `main.rs`.

pub mod config;
pub mod listener;
pub mod network;

pub use listener::{NetworkStateListener, PublishOutcome, ResourceStateListener};
pub use network::{Network, NetworkEvent, NetworkState};

//! External delivery channels for resource events.
//!
//! Subscribers in this module consume the [`EventBus`](crate::bus::EventBus)
//! and push events outside the process. Retrying is their concern; producers
//! only ever hand events to the bus.

pub mod webhook;

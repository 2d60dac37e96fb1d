//! Resource event bus and delivery infrastructure.
//!
//! This crate provides the building blocks for state-change notifications:
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`ResourceEvent`]: the external event envelope and its wire format.
//! - [`EventPublisher`] / [`PublisherProvider`]: the producer-side contract
//!   and its late-binding lookup.
//! - [`EventJournal`]: background service appending every event to an
//!   audit log.
//! - [`delivery`]: external delivery channels (webhook).

pub mod bus;
pub mod delivery;
pub mod journal;
pub mod publisher;

pub use bus::{EventBus, EventCategory, ResourceEvent};
pub use delivery::webhook::{WebhookDelivery, WebhookForwarder};
pub use journal::EventJournal;
pub use publisher::{EventPublisher, NoPublisher, PublishError, PublisherProvider, PublisherSlot};

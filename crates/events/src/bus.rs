//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the central publish/subscribe hub for [`ResourceEvent`]s.
//! It is designed to be shared via `Arc<EventBus>` across the application
//! and handed to producers as an [`EventPublisher`].

use std::collections::BTreeMap;
use std::fmt::Display;

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::publisher::{EventPublisher, PublishError};

// ---------------------------------------------------------------------------
// Wire constants
// ---------------------------------------------------------------------------

/// Origin recorded on every event emitted by the management server.
pub const SOURCE_MANAGEMENT_SERVER: &str = "management-server";

/// Description key: short resource type name.
pub const DESC_RESOURCE: &str = "resource";
/// Description key: resource uuid.
pub const DESC_ID: &str = "id";
/// Description key: state before the transition.
pub const DESC_OLD_STATE: &str = "old-state";
/// Description key: state after the transition.
pub const DESC_NEW_STATE: &str = "new-state";
/// Description key: local time the event was built.
pub const DESC_EVENT_DATE_TIME: &str = "eventDateTime";

/// `chrono` pattern for [`DESC_EVENT_DATE_TIME`], e.g. `2024-03-01 14:05:09 +0100`.
pub const EVENT_DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Format a timestamp the way downstream consumers expect in
/// [`DESC_EVENT_DATE_TIME`].
pub fn format_event_date_time<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    at.format(EVENT_DATE_TIME_FORMAT).to_string()
}

// ---------------------------------------------------------------------------
// EventCategory
// ---------------------------------------------------------------------------

/// Coarse classification consumers route on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventCategory {
    ActionEvent,
    AlertEvent,
    UsageEvent,
    ResourceStateChangeEvent,
    AsyncJobEvent,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ActionEvent => "ACTION_EVENT",
            Self::AlertEvent => "ALERT_EVENT",
            Self::UsageEvent => "USAGE_EVENT",
            Self::ResourceStateChangeEvent => "RESOURCE_STATE_CHANGE_EVENT",
            Self::AsyncJobEvent => "ASYNC_JOB_EVENT",
        }
    }
}

// ---------------------------------------------------------------------------
// ResourceEvent
// ---------------------------------------------------------------------------

/// An event about a managed resource, in its external wire shape.
///
/// Field names serialize in camelCase and are contractual for downstream
/// consumers. Constructed via [`ResourceEvent::new`] and enriched with
/// [`describe`](ResourceEvent::describe).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEvent {
    /// Component that emitted the event, e.g. `"management-server"`.
    pub source: String,

    pub category: EventCategory,

    /// Trigger name, e.g. `"ImplementNetwork"`.
    pub event_type: String,

    /// Short resource type name, e.g. `"Network"`.
    pub resource_type: String,

    /// Resource uuid; `None` when the entity had none to report.
    pub resource_id: Option<String>,

    /// Free-form string attributes.
    pub description: BTreeMap<String, String>,
}

impl ResourceEvent {
    /// Create an event with an empty description.
    pub fn new(
        source: impl Into<String>,
        category: EventCategory,
        event_type: impl Into<String>,
        resource_type: impl Into<String>,
        resource_id: Option<String>,
    ) -> Self {
        Self {
            source: source.into(),
            category,
            event_type: event_type.into(),
            resource_type: resource_type.into(),
            resource_id,
            description: BTreeMap::new(),
        }
    }

    /// Add or replace one description attribute.
    pub fn describe(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.description.insert(key.into(), value.into());
        self
    }

    /// Serialize to the wire JSON representation.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
pub const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`ResourceEvent`].
///
/// # Usage
///
/// ```rust
/// use statebus_events::bus::{EventBus, EventCategory, ResourceEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.send(ResourceEvent::new(
///     "management-server",
///     EventCategory::ResourceStateChangeEvent,
///     "ImplementNetwork",
///     "Network",
///     Some("abc-123".into()),
/// ));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<ResourceEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Send an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn send(&self, event: ResourceEvent) {
        // Ignore the SendError: it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<ResourceEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, event: ResourceEvent) -> Result<(), PublishError> {
        self.send(event);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

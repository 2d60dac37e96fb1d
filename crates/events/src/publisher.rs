//! Publisher contract and late-binding providers.
//!
//! Producers that start before the event infrastructure is ready hold a
//! [`PublisherProvider`] instead of a publisher, and resolve it on first use.

use std::sync::{Arc, RwLock};

use crate::bus::ResourceEvent;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for a publisher refusing an event.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The publisher is up but would not take the event.
    #[error("Event rejected: {0}")]
    Rejected(String),
}

// ---------------------------------------------------------------------------
// EventPublisher
// ---------------------------------------------------------------------------

/// Accepts events for delivery to subscribers.
///
/// `publish` hands the event off and returns; delivery, retries and
/// acknowledgement are the publisher's business.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: ResourceEvent) -> Result<(), PublishError>;
}

// ---------------------------------------------------------------------------
// PublisherProvider
// ---------------------------------------------------------------------------

/// Deferred lookup of an [`EventPublisher`].
///
/// Returning `None` means "not available yet"; callers are expected to ask
/// again later rather than treat it as permanent.
pub trait PublisherProvider: Send + Sync {
    fn resolve(&self) -> Option<Arc<dyn EventPublisher>>;
}

impl<F> PublisherProvider for F
where
    F: Fn() -> Option<Arc<dyn EventPublisher>> + Send + Sync,
{
    fn resolve(&self) -> Option<Arc<dyn EventPublisher>> {
        self()
    }
}

/// Provider that never has a publisher.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPublisher;

impl PublisherProvider for NoPublisher {
    fn resolve(&self) -> Option<Arc<dyn EventPublisher>> {
        None
    }
}

/// A publisher bound after construction.
///
/// Shared (via `Arc`) between the startup code that eventually calls
/// [`bind`](PublisherSlot::bind) and the producers that resolve it.
#[derive(Default)]
pub struct PublisherSlot {
    inner: RwLock<Option<Arc<dyn EventPublisher>>>,
}

impl PublisherSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind (or rebind) the publisher handed out by [`resolve`](PublisherProvider::resolve).
    pub fn bind(&self, publisher: Arc<dyn EventPublisher>) {
        *self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(publisher);
    }

    pub fn unbind(&self) {
        *self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    pub fn is_bound(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }
}

impl PublisherProvider for PublisherSlot {
    fn resolve(&self) -> Option<Arc<dyn EventPublisher>> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

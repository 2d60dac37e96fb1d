//! State-transition listener that reports resource state changes on the
//! event bus.
//!
//! [`ResourceStateListener`] plugs into a
//! [`StateMachine`](statebus_core::StateMachine) for one entity type. On
//! every transition it checks the `publish.resource.state.events` setting,
//! resolves the event publisher if it has none yet, and publishes a
//! [`ResourceEvent`] describing the change.
//!
//! Publishing is best-effort. Nothing that goes wrong here (setting off, no
//! publisher, a failing or panicking publisher) is surfaced to the state
//! machine; both hooks always return `true`.

use std::any::Any;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, FixedOffset, Local};
use statebus_core::config::{flag_enabled, PUBLISH_RESOURCE_STATE_EVENTS};
use statebus_core::{entity_name_from_type_name, ConfigSource, Named, ResourceEntity};
use statebus_core::{StateListener, Transition};
use statebus_events::bus::{
    format_event_date_time, DESC_EVENT_DATE_TIME, DESC_ID, DESC_NEW_STATE, DESC_OLD_STATE,
    DESC_RESOURCE, SOURCE_MANAGEMENT_SERVER,
};
use statebus_events::{EventCategory, EventPublisher, PublisherProvider, ResourceEvent};

use crate::network::Network;

/// Phase label for notifications sent before a transition is committed.
pub const PHASE_PRE: &str = "preStateTransitionEvent";

/// Phase label for notifications sent after a transition is committed.
pub const PHASE_POST: &str = "postStateTransitionEvent";

/// Source of the `eventDateTime` timestamp.
pub type Clock = fn() -> DateTime<FixedOffset>;

fn local_now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

// ---------------------------------------------------------------------------
// PublishOutcome
// ---------------------------------------------------------------------------

/// What a single publish attempt ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    /// The setting is off, unset or not `"true"`.
    Disabled,
    /// The provider had no publisher; it will be asked again next time.
    PublisherUnavailable,
    /// The publisher returned an error or panicked.
    PublishFailed,
}

// ---------------------------------------------------------------------------
// ResourceStateListener
// ---------------------------------------------------------------------------

/// Publishes a [`ResourceEvent`] for every state transition of a `V`.
pub struct ResourceStateListener<V> {
    config: Arc<dyn ConfigSource>,
    provider: Arc<dyn PublisherProvider>,
    publisher: RwLock<Option<Arc<dyn EventPublisher>>>,
    resource_type: &'static str,
    clock: Clock,
    span: tracing::Span,
    _entity: PhantomData<fn(&V)>,
}

/// The listener attached to guest network state machines.
pub type NetworkStateListener = ResourceStateListener<Network>;

impl<V: ResourceEntity> ResourceStateListener<V> {
    /// Create a listener that reads its setting from `config` and looks up
    /// its publisher from `provider` on first use.
    pub fn new(config: Arc<dyn ConfigSource>, provider: Arc<dyn PublisherProvider>) -> Self {
        let resource_type = entity_name_from_type_name(V::type_name());
        Self {
            config,
            provider,
            publisher: RwLock::new(None),
            resource_type,
            clock: local_now,
            span: tracing::info_span!("resource_state_listener", resource = resource_type),
            _entity: PhantomData,
        }
    }

    /// Replace the timestamp source.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Short type name reported as `resourceType`.
    pub fn resource_type(&self) -> &'static str {
        self.resource_type
    }

    /// Bind a publisher directly, bypassing the provider.
    pub fn set_event_publisher(&self, publisher: Arc<dyn EventPublisher>) {
        *self.publisher.write().unwrap_or_else(PoisonError::into_inner) = Some(publisher);
    }

    /// Drop the cached publisher so the next publish asks the provider again.
    pub fn clear_event_publisher(&self) {
        *self.publisher.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn has_event_publisher(&self) -> bool {
        self.publisher
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Publish a state-change event for `entity` if publishing is enabled.
    ///
    /// `phase` only shows up in logs; the event is the same for both hooks.
    pub fn maybe_publish<S: Named, E: Named>(
        &self,
        trigger: &E,
        phase: &str,
        entity: &V,
        old_state: &S,
        new_state: &S,
    ) -> PublishOutcome {
        let _entered = self.span.enter();

        if !flag_enabled(self.config.as_ref(), PUBLISH_RESOURCE_STATE_EVENTS) {
            return PublishOutcome::Disabled;
        }

        let Some(publisher) = self.resolve_publisher() else {
            tracing::debug!(phase, "No event publisher available, skipping state event");
            return PublishOutcome::PublisherUnavailable;
        };

        let event = self.build_event(trigger, entity, old_state, new_state, (self.clock)());
        let event_type = event.event_type.clone();

        match panic::catch_unwind(AssertUnwindSafe(|| publisher.publish(event))) {
            Ok(Ok(())) => {
                tracing::debug!(
                    phase,
                    event_type = %event_type,
                    old_state = old_state.name(),
                    new_state = new_state.name(),
                    "Published resource state event"
                );
                PublishOutcome::Published
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    phase,
                    event_type = %event_type,
                    error = %e,
                    "Failed to publish resource state event"
                );
                PublishOutcome::PublishFailed
            }
            Err(_) => {
                tracing::warn!(
                    phase,
                    event_type = %event_type,
                    "Event publisher panicked while publishing resource state event"
                );
                PublishOutcome::PublishFailed
            }
        }
    }

    /// Build the event for one transition, stamped with `at`.
    pub fn build_event<S: Named, E: Named>(
        &self,
        trigger: &E,
        entity: &V,
        old_state: &S,
        new_state: &S,
        at: DateTime<FixedOffset>,
    ) -> ResourceEvent {
        let resource_id = entity.uuid().map(str::to_owned);

        ResourceEvent::new(
            SOURCE_MANAGEMENT_SERVER,
            EventCategory::ResourceStateChangeEvent,
            trigger.name(),
            self.resource_type,
            resource_id.clone(),
        )
        .describe(DESC_RESOURCE, self.resource_type)
        .describe(DESC_ID, resource_id.unwrap_or_default())
        .describe(DESC_OLD_STATE, old_state.name())
        .describe(DESC_NEW_STATE, new_state.name())
        .describe(DESC_EVENT_DATE_TIME, format_event_date_time(&at))
    }

    /// Cached publisher, or a fresh one from the provider.
    ///
    /// A `None` from the provider is not cached.
    fn resolve_publisher(&self) -> Option<Arc<dyn EventPublisher>> {
        let cached = self
            .publisher
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if cached.is_some() {
            return cached;
        }

        let resolved = self.provider.resolve()?;
        tracing::debug!("Resolved event publisher");
        self.set_event_publisher(Arc::clone(&resolved));
        Some(resolved)
    }
}

impl<S, E, V> StateListener<S, E, V> for ResourceStateListener<V>
where
    S: Named,
    E: Named,
    V: ResourceEntity,
{
    fn pre_state_transition_event(
        &self,
        old_state: S,
        event: E,
        new_state: S,
        entity: &V,
        _status: bool,
        _opaque: Option<&dyn Any>,
    ) -> bool {
        self.maybe_publish(&event, PHASE_PRE, entity, &old_state, &new_state);
        true
    }

    fn post_state_transition_event(
        &self,
        transition: &Transition<S, E>,
        entity: &V,
        _status: bool,
        _opaque: Option<&dyn Any>,
    ) -> bool {
        self.maybe_publish(
            &transition.event,
            PHASE_POST,
            entity,
            &transition.current_state,
            &transition.to_state,
        );
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Integration tests for network state-change notifications.
//!
//! Drives a real [`StateMachine`] with a [`NetworkStateListener`] attached
//! and checks what reaches the event publisher.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use statebus_core::config::PUBLISH_RESOURCE_STATE_EVENTS;
use statebus_core::{CoreError, MemoryConfigSource, StateListener, StateMachine, Transition};
use statebus_events::{
    EventBus, EventPublisher, NoPublisher, PublishError, PublisherSlot, ResourceEvent,
};
use statebus_listener::listener::PHASE_PRE;
use statebus_listener::{Network, NetworkEvent, NetworkState, NetworkStateListener, PublishOutcome};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RecordingPublisher {
    events: Mutex<Vec<ResourceEvent>>,
}

impl RecordingPublisher {
    fn events(&self) -> Vec<ResourceEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, event: ResourceEvent) -> Result<(), PublishError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

fn config(flag: Option<&str>) -> Arc<MemoryConfigSource> {
    let source = MemoryConfigSource::new();
    if let Some(value) = flag {
        source.set(PUBLISH_RESOURCE_STATE_EVENTS, value);
    }
    Arc::new(source)
}

/// Listener whose provider always hands out `publisher`, plus a call counter.
fn listener_for(
    flag: Option<&str>,
    publisher: Arc<RecordingPublisher>,
) -> (Arc<NetworkStateListener>, Arc<AtomicUsize>) {
    let resolutions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&resolutions);
    let provider = move || -> Option<Arc<dyn EventPublisher>> {
        counter.fetch_add(1, Ordering::SeqCst);
        Some(publisher.clone())
    };
    let listener = NetworkStateListener::new(config(flag), Arc::new(provider));
    (Arc::new(listener), resolutions)
}

fn machine_with(
    listener: Arc<NetworkStateListener>,
) -> StateMachine<NetworkState, NetworkEvent, Network> {
    let mut machine = StateMachine::new();
    machine
        .add_transition(
            NetworkState::Allocated,
            NetworkEvent::ImplementNetwork,
            NetworkState::Setup,
        )
        .add_transition(
            NetworkState::Setup,
            NetworkEvent::ImplementNetwork,
            NetworkState::Implementing,
        )
        .add_transition(
            NetworkState::Implementing,
            NetworkEvent::OperationSucceeded,
            NetworkState::Implemented,
        );
    machine.register_listener(listener);
    machine
}

// ---------------------------------------------------------------------------
// Test: Allocated -> Setup scenario publishes the documented event
// ---------------------------------------------------------------------------

#[test]
fn implement_network_publishes_pre_and_post_events() {
    let publisher = Arc::new(RecordingPublisher::default());
    let (listener, _) = listener_for(Some("true"), publisher.clone());
    let machine = machine_with(listener);
    let network = Network::with_uuid("guest", "abc-123");

    let next = machine
        .transit_to(&network, NetworkState::Allocated, NetworkEvent::ImplementNetwork, None)
        .unwrap();
    assert_eq!(next, NetworkState::Setup);

    let events = publisher.events();
    assert_eq!(events.len(), 2, "one event per hook invocation");
    for event in &events {
        assert_eq!(event.event_type, "ImplementNetwork");
        assert_eq!(event.resource_type, "Network");
        assert_eq!(event.resource_id.as_deref(), Some("abc-123"));
        assert_eq!(event.description["resource"], "Network");
        assert_eq!(event.description["id"], "abc-123");
        assert_eq!(event.description["old-state"], "Allocated");
        assert_eq!(event.description["new-state"], "Setup");
        assert!(event.description.contains_key("eventDateTime"));
    }
}

// ---------------------------------------------------------------------------
// Test: disabled or absent flag publishes nothing
// ---------------------------------------------------------------------------

#[test]
fn disabled_flag_publishes_nothing() {
    for flag in [
        Some("false"),
        Some("FALSE"),
        Some("garbage"),
        Some(""),
        Some(" true"),
        Some("true\n"),
        None,
    ] {
        let publisher = Arc::new(RecordingPublisher::default());
        let (listener, resolutions) = listener_for(flag, publisher.clone());
        let machine = machine_with(listener);
        let network = Network::allocate("guest");

        machine
            .transit_to(&network, NetworkState::Allocated, NetworkEvent::ImplementNetwork, None)
            .unwrap();

        assert!(publisher.events().is_empty(), "flag {flag:?} must not publish");
        assert_eq!(resolutions.load(Ordering::SeqCst), 0);
    }
}

#[test]
fn flag_is_read_on_every_transition() {
    let publisher = Arc::new(RecordingPublisher::default());
    let source = config(Some("false"));
    let slot = Arc::new(PublisherSlot::new());
    slot.bind(publisher.clone());
    let listener = Arc::new(NetworkStateListener::new(source.clone(), slot));
    let machine = machine_with(listener);
    let network = Network::allocate("guest");

    machine
        .transit_to(&network, NetworkState::Allocated, NetworkEvent::ImplementNetwork, None)
        .unwrap();
    source.set(PUBLISH_RESOURCE_STATE_EVENTS, "True");
    machine
        .transit_to(&network, NetworkState::Setup, NetworkEvent::ImplementNetwork, None)
        .unwrap();

    let events = publisher.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].description["old-state"], "Setup");
    assert_eq!(events[0].description["new-state"], "Implementing");
}

#[test]
fn padded_flag_value_is_disabled() {
    for raw in [" true", "true\n", "\ttrue "] {
        let publisher = Arc::new(RecordingPublisher::default());
        let (listener, resolutions) = listener_for(Some(raw), publisher.clone());
        let network = Network::with_uuid("guest", "abc-123");

        let outcome = listener.maybe_publish(
            &NetworkEvent::ImplementNetwork,
            PHASE_PRE,
            &network,
            &NetworkState::Allocated,
            &NetworkState::Setup,
        );

        assert_eq!(outcome, PublishOutcome::Disabled, "flag {raw:?} must stay disabled");
        assert!(publisher.events().is_empty());
        assert_eq!(resolutions.load(Ordering::SeqCst), 0);
    }
}

// ---------------------------------------------------------------------------
// Test: publisher resolution is cached
// ---------------------------------------------------------------------------

#[test]
fn provider_is_consulted_once() {
    let publisher = Arc::new(RecordingPublisher::default());
    let (listener, resolutions) = listener_for(Some("true"), publisher.clone());
    let machine = machine_with(listener);
    let network = Network::allocate("guest");

    let mut state = NetworkState::Allocated;
    for event in [
        NetworkEvent::ImplementNetwork,
        NetworkEvent::ImplementNetwork,
        NetworkEvent::OperationSucceeded,
    ] {
        state = machine.transit_to(&network, state, event, None).unwrap();
    }

    assert_eq!(state, NetworkState::Implemented);
    assert_eq!(publisher.events().len(), 6);
    assert_eq!(resolutions.load(Ordering::SeqCst), 1);
}

#[test]
fn unavailable_publisher_is_retried_without_error() {
    let resolutions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&resolutions);
    let provider = move || -> Option<Arc<dyn EventPublisher>> {
        counter.fetch_add(1, Ordering::SeqCst);
        None
    };
    let listener = NetworkStateListener::new(config(Some("true")), Arc::new(provider));
    let network = Network::allocate("guest");

    for _ in 0..2 {
        let outcome = listener.maybe_publish(
            &NetworkEvent::ImplementNetwork,
            PHASE_PRE,
            &network,
            &NetworkState::Allocated,
            &NetworkState::Setup,
        );
        assert_eq!(outcome, PublishOutcome::PublisherUnavailable);
    }

    assert_eq!(resolutions.load(Ordering::SeqCst), 2);
    assert!(!listener.has_event_publisher());
}

#[test]
fn late_bound_slot_is_picked_up() {
    let slot = Arc::new(PublisherSlot::new());
    let listener = NetworkStateListener::new(config(Some("true")), slot.clone());
    let network = Network::allocate("guest");
    let publish = || {
        listener.maybe_publish(
            &NetworkEvent::ImplementNetwork,
            PHASE_PRE,
            &network,
            &NetworkState::Allocated,
            &NetworkState::Setup,
        )
    };

    assert_eq!(publish(), PublishOutcome::PublisherUnavailable);

    let publisher = Arc::new(RecordingPublisher::default());
    slot.bind(publisher.clone());

    assert_eq!(publish(), PublishOutcome::Published);
    assert_eq!(publisher.events().len(), 1);
}

// ---------------------------------------------------------------------------
// Test: hooks never veto
// ---------------------------------------------------------------------------

#[test]
fn hooks_return_true_whatever_happens() {
    struct Failing;
    impl EventPublisher for Failing {
        fn publish(&self, _event: ResourceEvent) -> Result<(), PublishError> {
            Err(PublishError::Rejected("nope".into()))
        }
    }

    let network = Network::allocate("guest");
    let transition = Transition::new(
        NetworkState::Implementing,
        NetworkEvent::OperationSucceeded,
        NetworkState::Implemented,
    );

    for flag in [Some("true"), Some("false"), None] {
        let listener = NetworkStateListener::new(config(flag), Arc::new(NoPublisher));
        listener.set_event_publisher(Arc::new(Failing));

        assert!(listener.pre_state_transition_event(
            NetworkState::Allocated,
            NetworkEvent::ImplementNetwork,
            NetworkState::Setup,
            &network,
            true,
            None,
        ));
        assert!(listener.post_state_transition_event(&transition, &network, false, None));
    }
}

#[test]
fn failing_publisher_does_not_block_transition() {
    struct Failing;
    impl EventPublisher for Failing {
        fn publish(&self, _event: ResourceEvent) -> Result<(), PublishError> {
            Err(PublishError::Rejected("broker unavailable".into()))
        }
    }

    let listener = Arc::new(NetworkStateListener::new(
        config(Some("true")),
        Arc::new(NoPublisher),
    ));
    listener.set_event_publisher(Arc::new(Failing));
    let machine = machine_with(listener);

    let result = machine.transit_to(
        &Network::allocate("guest"),
        NetworkState::Allocated,
        NetworkEvent::ImplementNetwork,
        None,
    );
    assert_matches!(result, Ok(NetworkState::Setup));

    let invalid = machine.transit_to(
        &Network::allocate("guest"),
        NetworkState::Implemented,
        NetworkEvent::ImplementNetwork,
        None,
    );
    assert_matches!(invalid, Err(CoreError::Validation(_)));
}

// ---------------------------------------------------------------------------
// Test: events reach bus subscribers in wire format
// ---------------------------------------------------------------------------

#[tokio::test]
async fn events_reach_bus_subscribers() {
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();
    let listener = Arc::new(NetworkStateListener::new(
        config(Some("true")),
        Arc::new(NoPublisher),
    ));
    listener.set_event_publisher(bus.clone());
    let machine = machine_with(listener);

    machine
        .transit_to(
            &Network::with_uuid("guest", "abc-123"),
            NetworkState::Allocated,
            NetworkEvent::ImplementNetwork,
            None,
        )
        .unwrap();

    let pre = rx.recv().await.expect("pre-transition event");
    let post = rx.recv().await.expect("post-transition event");
    assert_eq!(pre.event_type, post.event_type);

    let json = serde_json::to_value(&post).unwrap();
    assert_eq!(json["source"], "management-server");
    assert_eq!(json["category"], "RESOURCE_STATE_CHANGE_EVENT");
    assert_eq!(json["eventType"], "ImplementNetwork");
    assert_eq!(json["resourceType"], "Network");
    assert_eq!(json["resourceId"], "abc-123");
    assert_eq!(json["description"]["old-state"], "Allocated");
    assert_eq!(json["description"]["new-state"], "Setup");

    let stamp = json["description"]["eventDateTime"].as_str().unwrap();
    assert!(
        chrono::DateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M:%S %z").is_ok(),
        "unexpected timestamp format: {stamp}"
    );
}

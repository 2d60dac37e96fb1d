use std::sync::Arc;

use statebus_core::{EnvConfigSource, StateMachine};
use statebus_events::{EventBus, EventJournal, PublisherSlot, WebhookDelivery, WebhookForwarder};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use statebus_listener::config::{AppConfig, JournalTarget};
use statebus_listener::{Network, NetworkEvent, NetworkState, NetworkStateListener};

type NetworkStateMachine = StateMachine<NetworkState, NetworkEvent, Network>;

/// Edges exercised by the sample lifecycle below.
const NETWORK_EDGES: &[(NetworkState, NetworkEvent, NetworkState)] = &[
    (NetworkState::Allocated, NetworkEvent::ImplementNetwork, NetworkState::Implementing),
    (NetworkState::Setup, NetworkEvent::ImplementNetwork, NetworkState::Implementing),
    (NetworkState::Implementing, NetworkEvent::OperationSucceeded, NetworkState::Implemented),
    (NetworkState::Implementing, NetworkEvent::OperationFailed, NetworkState::Shutdown),
    (NetworkState::Implemented, NetworkEvent::DestroyNetwork, NetworkState::Shutdown),
    (NetworkState::Shutdown, NetworkEvent::OperationSucceeded, NetworkState::Destroy),
    (NetworkState::Allocated, NetworkEvent::DestroyNetwork, NetworkState::Destroy),
];

fn network_state_machine() -> NetworkStateMachine {
    let mut machine = NetworkStateMachine::new();
    for &(from, event, to) in NETWORK_EDGES {
        machine.add_transition(from, event, to);
    }
    machine
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "statebus_listener=debug,statebus_events=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // --- Configuration ---
    let config = AppConfig::from_env()?;
    tracing::info!(
        bus_capacity = config.bus_capacity,
        webhook_url = ?config.webhook_url,
        journal = ?config.journal,
        "Loaded configuration"
    );

    // --- Listener (publisher bound later) ---
    let slot = Arc::new(PublisherSlot::new());
    let listener = Arc::new(NetworkStateListener::new(
        Arc::new(EnvConfigSource::new()),
        slot.clone(),
    ));

    let mut machine = network_state_machine();
    machine.register_listener(listener.clone());

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::new(config.bus_capacity));
    tracing::info!("Event bus created");

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let journal_handle = match config.journal {
        JournalTarget::Stdout => Some(tokio::spawn(EventJournal::run(
            tokio::io::stdout(),
            event_bus.subscribe(),
        ))),
        JournalTarget::Off => None,
    };

    let webhook_handle = match &config.webhook_url {
        Some(url) => {
            let forwarder = WebhookForwarder::new(WebhookDelivery::new()?, url.clone());
            Some(tokio::spawn(forwarder.run(event_bus.subscribe(), cancel.clone())))
        }
        None => None,
    };

    slot.bind(event_bus.clone());

    // --- Sample lifecycle ---
    let mut network = Network::allocate("guest-network");
    tracing::info!(uuid = ?network.uuid, "Driving sample network lifecycle");

    for event in [
        NetworkEvent::ImplementNetwork,
        NetworkEvent::OperationSucceeded,
        NetworkEvent::DestroyNetwork,
        NetworkEvent::OperationSucceeded,
    ] {
        match machine.transit_to(&network, network.state, event, None) {
            Ok(next) => network.state = next,
            Err(e) => tracing::warn!(error = %e, "Transition rejected"),
        }
    }

    // --- Shutdown: release every handle on the bus so subscribers drain ---
    slot.unbind();
    listener.clear_event_publisher();
    drop(event_bus);

    if let Some(handle) = journal_handle {
        let written = handle.await?;
        tracing::info!(written, "Event journal drained");
    }
    if let Some(handle) = webhook_handle {
        handle.await?;
    }

    tracing::info!(final_state = ?network.state, "Shutdown complete");
    Ok(())
}

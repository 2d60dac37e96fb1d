//! Guest network entity and its lifecycle vocabulary.
//!
//! Only the states and triggers are defined here. Which triggers are valid
//! in which state is declared by whoever owns the
//! [`StateMachine`](statebus_core::StateMachine).

use serde::{Deserialize, Serialize};
use statebus_core::{Named, ResourceEntity};

// ---------------------------------------------------------------------------
// NetworkState
// ---------------------------------------------------------------------------

/// Lifecycle states of a guest network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkState {
    /// Reserved in the database, nothing provisioned yet.
    Allocated,
    /// Configured from an existing physical setup.
    Setup,
    Implementing,
    Implemented,
    Shutdown,
    Destroy,
}

impl Named for NetworkState {
    fn name(&self) -> &'static str {
        match self {
            Self::Allocated => "Allocated",
            Self::Setup => "Setup",
            Self::Implementing => "Implementing",
            Self::Implemented => "Implemented",
            Self::Shutdown => "Shutdown",
            Self::Destroy => "Destroy",
        }
    }
}

// ---------------------------------------------------------------------------
// NetworkEvent
// ---------------------------------------------------------------------------

/// Triggers that move a guest network between [`NetworkState`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkEvent {
    ImplementNetwork,
    DestroyNetwork,
    OperationSucceeded,
    OperationFailed,
}

impl Named for NetworkEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::ImplementNetwork => "ImplementNetwork",
            Self::DestroyNetwork => "DestroyNetwork",
            Self::OperationSucceeded => "OperationSucceeded",
            Self::OperationFailed => "OperationFailed",
        }
    }
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// A guest network as seen by state listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub name: String,
    /// Externally visible id; absent until the network is registered.
    pub uuid: Option<String>,
    pub state: NetworkState,
}

impl Network {
    /// A freshly allocated network with a random v4 uuid.
    pub fn allocate(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid: Some(uuid::Uuid::new_v4().to_string()),
            state: NetworkState::Allocated,
        }
    }

    pub fn with_uuid(name: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid: Some(uuid.into()),
            state: NetworkState::Allocated,
        }
    }
}

impl ResourceEntity for Network {
    fn type_name() -> &'static str {
        "statebus.network.Network"
    }

    fn uuid(&self) -> Option<&str> {
        self.uuid.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Domain layer for resource state-change notifications.
//!
//! Nothing in this crate performs I/O. It defines the contracts the
//! notification adapter is built against:
//!
//! - [`fsm`]: the observer contract ([`StateListener`]) and a small generic
//!   [`StateMachine`] host that drives it.
//! - [`config`]: the [`ConfigSource`] lookup and the feature flag parser.
//! - [`naming`]: short resource-type names for observed entities.

pub mod config;
pub mod error;
pub mod fsm;
pub mod naming;

pub use config::{ConfigSource, EnvConfigSource, MemoryConfigSource};
pub use error::CoreError;
pub use fsm::{Named, StateListener, StateMachine, Transition};
pub use naming::{entity_name_from_type_name, ResourceEntity};

//! Generic finite-state-machine host and its observer contract.
//!
//! Entities that move through a fixed set of states (networks, volumes,
//! instances) declare their transitions on a [`StateMachine`]. Every
//! registered [`StateListener`] is told about a transition twice: once
//! before the new state is committed and once after.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Named
// ---------------------------------------------------------------------------

/// A state or trigger with a stable external name.
///
/// The name is what ends up on the wire, so it must not change between
/// releases even if the Rust variant is renamed.
pub trait Named {
    fn name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

/// A committed transition as seen by post-transition listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition<S, E> {
    /// State the entity was in before the transition.
    pub current_state: S,
    /// Trigger that caused the transition.
    pub event: E,
    /// State the entity is in after the transition.
    pub to_state: S,
}

impl<S, E> Transition<S, E> {
    pub fn new(current_state: S, event: E, to_state: S) -> Self {
        Self {
            current_state,
            event,
            to_state,
        }
    }
}

impl<S: Named, E: Named> fmt::Display for Transition<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} --{}--> {}",
            self.current_state.name(),
            self.event.name(),
            self.to_state.name()
        )
    }
}

// ---------------------------------------------------------------------------
// StateListener
// ---------------------------------------------------------------------------

/// Observer hooks invoked by a [`StateMachine`] around each transition.
///
/// `S` is the state enumeration, `E` the trigger enumeration and `V` the
/// entity type. `opaque` is caller-supplied context the machine passes
/// through untouched.
pub trait StateListener<S, E, V: ?Sized>: Send + Sync {
    /// Called before the transition is committed. Returning `false` vetoes it.
    fn pre_state_transition_event(
        &self,
        old_state: S,
        event: E,
        new_state: S,
        entity: &V,
        status: bool,
        opaque: Option<&dyn Any>,
    ) -> bool;

    /// Called after the transition is committed. `status` reports whether
    /// the commit succeeded.
    fn post_state_transition_event(
        &self,
        transition: &Transition<S, E>,
        entity: &V,
        status: bool,
        opaque: Option<&dyn Any>,
    ) -> bool;
}

// ---------------------------------------------------------------------------
// StateMachine
// ---------------------------------------------------------------------------

/// Transition table plus the listeners observing it.
pub struct StateMachine<S, E, V: ?Sized> {
    /// Outgoing edges per source state, in declaration order.
    transitions: HashMap<S, Vec<(E, S)>>,
    listeners: Vec<Arc<dyn StateListener<S, E, V>>>,
}

impl<S, E, V> StateMachine<S, E, V>
where
    S: Copy + Eq + Hash + Named,
    E: Copy + Eq + Named,
    V: ?Sized,
{
    pub fn new() -> Self {
        Self {
            transitions: HashMap::new(),
            listeners: Vec::new(),
        }
    }

    /// Declare that `event` moves an entity from `from` to `to`.
    ///
    /// Declaring the same `(from, event)` pair twice replaces the target.
    pub fn add_transition(&mut self, from: S, event: E, to: S) -> &mut Self {
        let edges = self.transitions.entry(from).or_default();
        match edges.iter_mut().find(|(e, _)| *e == event) {
            Some(edge) => edge.1 = to,
            None => edges.push((event, to)),
        }
        self
    }

    /// Target state for `event` fired in `from`, if such a transition exists.
    pub fn next_state(&self, from: S, event: E) -> Option<S> {
        self.transitions
            .get(&from)?
            .iter()
            .find(|(e, _)| *e == event)
            .map(|(_, to)| *to)
    }

    /// Triggers that are valid in `from`, in declaration order.
    pub fn possible_events(&self, from: S) -> Vec<E> {
        self.transitions
            .get(&from)
            .map(|edges| edges.iter().map(|(e, _)| *e).collect())
            .unwrap_or_default()
    }

    pub fn register_listener(&mut self, listener: Arc<dyn StateListener<S, E, V>>) {
        self.listeners.push(listener);
    }

    /// Fire `event` on an entity currently in `current`.
    ///
    /// Equivalent to [`transit_to_with`](Self::transit_to_with) with a commit
    /// step that always succeeds.
    pub fn transit_to(
        &self,
        entity: &V,
        current: S,
        event: E,
        opaque: Option<&dyn Any>,
    ) -> Result<S, CoreError> {
        self.transit_to_with(entity, current, event, opaque, |_, _| true)
    }

    /// Fire `event` on an entity currently in `current`, persisting the new
    /// state through `commit`.
    ///
    /// Listeners are notified in registration order: all pre-hooks, then
    /// `commit(old, new)`, then all post-hooks with the commit result. Any
    /// pre-hook returning `false` aborts before `commit` runs.
    pub fn transit_to_with<F>(
        &self,
        entity: &V,
        current: S,
        event: E,
        opaque: Option<&dyn Any>,
        commit: F,
    ) -> Result<S, CoreError>
    where
        F: FnOnce(S, S) -> bool,
    {
        let next = self.next_state(current, event).ok_or_else(|| {
            CoreError::Validation(format!(
                "No transition from '{}' on event '{}'",
                current.name(),
                event.name()
            ))
        })?;

        for listener in &self.listeners {
            if !listener.pre_state_transition_event(current, event, next, entity, true, opaque) {
                return Err(CoreError::Conflict(format!(
                    "Transition {} --{}--> {} vetoed by listener",
                    current.name(),
                    event.name(),
                    next.name()
                )));
            }
        }

        let committed = commit(current, next);
        let transition = Transition::new(current, event, next);

        for listener in &self.listeners {
            listener.post_state_transition_event(&transition, entity, committed, opaque);
        }

        if !committed {
            return Err(CoreError::Conflict(format!(
                "Transition {transition} was not committed"
            )));
        }

        tracing::debug!(transition = %transition, "State transition committed");
        Ok(next)
    }
}

impl<S, E, V> Default for StateMachine<S, E, V>
where
    S: Copy + Eq + Hash + Named,
    E: Copy + Eq + Named,
    V: ?Sized,
{
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Runtime configuration lookup.
//!
//! Settings are addressed by dotted keys (`publish.resource.state.events`)
//! and read on every use, so toggling a value takes effect without a
//! restart.

use std::collections::HashMap;
use std::sync::RwLock;

/// Enables publishing of resource state-change events.
pub const PUBLISH_RESOURCE_STATE_EVENTS: &str = "publish.resource.state.events";

/// Key/value configuration store.
pub trait ConfigSource: Send + Sync {
    /// Raw stored value for `key`, or `None` if unset.
    fn get_value(&self, key: &str) -> Option<String>;
}

/// Interpret a raw setting as a boolean flag.
///
/// Only a case-insensitive `"true"` enables the flag. The value is not
/// trimmed, so surrounding whitespace disables it. Unset, empty, and
/// unrecognised values all read as `false`; there is no separate parse-error
/// path.
pub fn parse_flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// Read `key` from `source` as a boolean flag. See [`parse_flag`].
pub fn flag_enabled(source: &dyn ConfigSource, key: &str) -> bool {
    parse_flag(source.get_value(key).as_deref())
}

// ---------------------------------------------------------------------------
// MemoryConfigSource
// ---------------------------------------------------------------------------

/// In-memory settings, writable at runtime.
#[derive(Debug, Default)]
pub struct MemoryConfigSource {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, for seeding at construction time.
    pub fn with(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) {
        self.values
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(key);
    }
}

impl ConfigSource for MemoryConfigSource {
    fn get_value(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }
}

// ---------------------------------------------------------------------------
// EnvConfigSource
// ---------------------------------------------------------------------------

/// Settings backed by process environment variables.
///
/// A dotted key maps to an upper-case variable with dots and dashes replaced
/// by underscores, optionally prefixed: `publish.resource.state.events`
/// becomes `PUBLISH_RESOURCE_STATE_EVENTS`.
#[derive(Debug, Clone, Default)]
pub struct EnvConfigSource {
    prefix: Option<String>,
}

impl EnvConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend `prefix` and an underscore to every variable name.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    /// Environment variable name for a dotted key.
    pub fn env_var_name(&self, key: &str) -> String {
        let base: String = key
            .chars()
            .map(|c| match c {
                '.' | '-' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        match &self.prefix {
            Some(prefix) => format!("{prefix}_{base}"),
            None => base,
        }
    }
}

impl ConfigSource for EnvConfigSource {
    fn get_value(&self, key: &str) -> Option<String> {
        std::env::var(self.env_var_name(key)).ok()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

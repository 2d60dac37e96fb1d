use statebus_events::bus::DEFAULT_CAPACITY;

/// Where the audit journal goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalTarget {
    Stdout,
    Off,
}

/// Process configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development. The publish
/// flag itself is not part of this struct: it is read on every transition
/// through [`EnvConfigSource`](statebus_core::EnvConfigSource) so it can be
/// flipped at runtime.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Broadcast buffer size of the event bus (default: `1024`).
    pub bus_capacity: usize,
    /// Webhook receiving every event; forwarding is off when unset.
    pub webhook_url: Option<String>,
    /// Audit journal destination (default: stdout).
    pub journal: JournalTarget,
}

impl AppConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var              | Default  |
    /// |----------------------|----------|
    /// | `EVENT_BUS_CAPACITY` | `1024`   |
    /// | `WEBHOOK_URL`        | unset    |
    /// | `EVENT_JOURNAL`      | `stdout` |
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bus_capacity = match lookup("EVENT_BUS_CAPACITY") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    anyhow::anyhow!("EVENT_BUS_CAPACITY must be a positive integer, got '{raw}'")
                })?,
            None => DEFAULT_CAPACITY,
        };

        let webhook_url = lookup("WEBHOOK_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let journal = match lookup("EVENT_JOURNAL").as_deref().map(str::trim) {
            None | Some("") | Some("stdout") => JournalTarget::Stdout,
            Some("off") => JournalTarget::Off,
            Some(other) => anyhow::bail!("EVENT_JOURNAL must be 'stdout' or 'off', got '{other}'"),
        };

        Ok(Self {
            bus_capacity,
            webhook_url,
            journal,
        })
    }
}

use std::time::Duration;

use larder_core::sync::{echo_debounce_window, reconnect_delay};
use larder_core::{Error, Result};

pub const ECHO_DEBOUNCE_ENV: &str = "LARDER_ECHO_DEBOUNCE_MS";
pub const RECONNECT_DELAY_ENV: &str = "LARDER_RECONNECT_DELAY_MS";

/// Timing knobs for the realtime layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RealtimeConfig {
    pub echo_debounce: Duration,
    pub reconnect_delay: Duration,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            echo_debounce: echo_debounce_window(),
            reconnect_delay: reconnect_delay(),
        }
    }
}

impl RealtimeConfig {
    /// Reads overrides from the process environment. Unset variables keep
    /// their defaults; malformed ones are a configuration error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            echo_debounce: millis_var(&lookup, ECHO_DEBOUNCE_ENV)?
                .unwrap_or(defaults.echo_debounce),
            reconnect_delay: millis_var(&lookup, RECONNECT_DELAY_ENV)?
                .unwrap_or(defaults.reconnect_delay),
        })
    }
}

fn millis_var<F>(lookup: &F, name: &str) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<u64>()
        .map(|ms| Some(Duration::from_millis(ms)))
        .map_err(|_| Error::config(format!("{} must be a whole number of milliseconds, got '{}'", name, raw)))
}

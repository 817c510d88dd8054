//! Layered runtime configuration.
//!
//! Watch definitions arrive as in-memory structures ([`crate::WatchConfig`],
//! [`crate::TaskProfile`]); this module only tunes how the watcher behaves.
//! Values layer as: defaults, then `dropwatch.toml`, then environment
//! variables prefixed with `DW_` using a double underscore to separate
//! nesting, e.g. `DW_WATCHER__DEBOUNCE_MS=250`.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    /// Event source tuning.
    #[serde(default)]
    pub watcher: WatcherConfig,

    /// Logging levels, see [`crate::logging`].
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tuning knobs for the debounced event sources.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatcherConfig {
    /// Quiet interval in milliseconds a file must hold before it counts as
    /// settled. Editors and copy tools emit many intermediate writes.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Sweep interval in milliseconds for the settle check.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Buffer size for the raw and settled event channels.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level for all modules: error, warn, info, debug, trace.
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `registry = "debug"`.
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_tick_ms() -> u64 {
    100
}

fn default_channel_capacity() -> usize {
    100
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            tick_ms: default_tick_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file("dropwatch.toml"))
            // Double underscore separates nested levels; single underscores
            // stay inside field names.
            .merge(Env::prefixed("DW_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let settings = Settings::default();
        assert_eq!(settings.watcher.debounce_ms, 1000);
        assert_eq!(settings.watcher.tick_ms, 100);
        assert_eq!(settings.watcher.channel_capacity, 100);
        assert_eq!(settings.logging.default, "warn");
        assert!(settings.logging.modules.is_empty());
    }

    #[test]
    fn env_overrides_nested_fields() {
        unsafe {
            std::env::set_var("DW_WATCHER__DEBOUNCE_MS", "250");
        }
        let settings = Settings::load().expect("settings should load");
        assert_eq!(settings.watcher.debounce_ms, 250);
        unsafe {
            std::env::remove_var("DW_WATCHER__DEBOUNCE_MS");
        }
    }
}

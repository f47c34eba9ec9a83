//! Runtime Configuration
//!
//! A small set of switches that change diagnostics, not semantics:
//!
//! - `debug`: verify key integrity of child lists and log `use_debug_value`.
//! - `check_json_attrs`: fail node construction on attributes that could
//!   not be turned into JSON.
//! - `async_effect_shutdown_timeout_ms`: default grace period given to an
//!   async effect body once its stop signal fires.
//!
//! A process default is kept behind a lock so hooks and constructors called
//! from deep inside a render can read it. Every consumer also has a variant
//! taking an explicit config.

use std::env;
use std::sync::OnceLock;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Deserialize;

const ENV_DEBUG: &str = "TRELLIS_DEBUG";
const ENV_CHECK_JSON_ATTRS: &str = "TRELLIS_CHECK_JSON_ATTRS";
const ENV_ASYNC_EFFECT_TIMEOUT_MS: &str = "TRELLIS_ASYNC_EFFECT_TIMEOUT_MS";

static CURRENT: OnceLock<RwLock<RuntimeConfig>> = OnceLock::new();

fn current_cell() -> &'static RwLock<RuntimeConfig> {
    CURRENT.get_or_init(|| RwLock::new(RuntimeConfig::from_env()))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub debug: bool,
    pub check_json_attrs: bool,
    pub async_effect_shutdown_timeout_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            debug: false,
            check_json_attrs: false,
            async_effect_shutdown_timeout_ms: 100,
        }
    }
}

impl RuntimeConfig {
    /// Build a config from `TRELLIS_*` environment variables, falling back
    /// to the defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            debug: lookup(ENV_DEBUG)
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.debug),
            check_json_attrs: lookup(ENV_CHECK_JSON_ATTRS)
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.check_json_attrs),
            async_effect_shutdown_timeout_ms: lookup(ENV_ASYNC_EFFECT_TIMEOUT_MS)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.async_effect_shutdown_timeout_ms),
        }
    }

    /// The process-wide config. Initialized from the environment on first use.
    pub fn current() -> Self {
        current_cell().read().clone()
    }

    /// Replace the process-wide config.
    pub fn set_current(config: RuntimeConfig) {
        *current_cell().write() = config;
    }

    pub fn async_effect_shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.async_effect_shutdown_timeout_ms)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

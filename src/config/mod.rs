//! Configuration for modelex
//!
//! Two layers live here:
//!
//! 1. [`SettingsProvider`] - the by-name settings lookup the model store and the
//!    protection validator consult (`enableProtectedResourceValidation`,
//!    `modelRoot`, ...). Anything that can answer `get_setting(name)` can back a
//!    store, which keeps the store independent of where settings come from.
//! 2. [`ModelConfig`] - the TOML configuration file used by the CLI, which
//!    implements [`SettingsProvider`].
//!
//! # Configuration File Location
//!
//! - `--config <path>` on the command line
//! - `MODELEX_CONFIG` environment variable
//! - `~/.modelex/config.toml`
//!
//! A missing file yields the default configuration.
//!
//! # File Format
//!
//! ```toml
//! model_root = "~/src/models"
//! local_clone = "~/src/models"
//! enable_protected_resource_validation = true
//! group_limit = 100
//!
//! [providers]
//! unprotected_resources = ["link", "prop", "kusto"]
//! unprotected_data = ["template", "regex"]
//!
//! [settings]
//! someOtherFlag = "on"
//! ```

mod model_config;

pub use model_config::{ModelConfig, ProviderConfig};

use serde_json::Value;
use std::collections::HashMap;

/// By-name settings lookup.
pub trait SettingsProvider: Send + Sync {
    /// Returns the setting's value, or `None` when unset.
    fn get_setting(&self, name: &str) -> Option<Value>;

    /// Interprets a setting as a flag: `true`, `"true"`, `"1"`, `"on"` and
    /// non-zero numbers are on; everything else, including unset, is off.
    fn flag(&self, name: &str) -> bool {
        match self.get_setting(name) {
            Some(Value::Bool(b)) => b,
            Some(Value::String(s)) => {
                matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "on" | "yes")
            }
            Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
            _ => false,
        }
    }
}

/// In-memory settings, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSettings {
    values: HashMap<String, Value>,
}

impl StaticSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl SettingsProvider for StaticSettings {
    fn get_setting(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }
}

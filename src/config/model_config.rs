use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::SettingsProvider;
use crate::constants::{
    CONFIG_ENV_VAR, DEFAULT_GROUP_LIMIT, ENABLE_PROTECTED_RESOURCE_VALIDATION, MODEL_ROOT_SETTING,
};

const fn default_group_limit() -> usize {
    DEFAULT_GROUP_LIMIT
}

/// TOML configuration consumed by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Root of the model repository. `~` is expanded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_root: Option<String>,

    /// Local clone removed when the model root turns out to hold no namespaces.
    ///
    /// Nothing is removed when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_clone: Option<String>,

    #[serde(default)]
    pub enable_protected_resource_validation: bool,

    /// Page size for association grouping nodes.
    #[serde(default = "default_group_limit")]
    pub group_limit: usize,

    #[serde(default)]
    pub providers: ProviderConfig,

    /// Free-form settings answered by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub settings: BTreeMap<String, toml::Value>,
}

/// Provider kinds that declare themselves unprotected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_unprotected_resources")]
    pub unprotected_resources: Vec<String>,
    #[serde(default = "default_unprotected_data")]
    pub unprotected_data: Vec<String>,
}

fn default_unprotected_resources() -> Vec<String> {
    ["link", "prop", "kusto", "dgrep", "folder"].iter().map(|s| (*s).to_string()).collect()
}

fn default_unprotected_data() -> Vec<String> {
    ["template", "regex", "lookup"].iter().map(|s| (*s).to_string()).collect()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            unprotected_resources: default_unprotected_resources(),
            unprotected_data: default_unprotected_data(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_root: None,
            local_clone: None,
            enable_protected_resource_validation: false,
            group_limit: DEFAULT_GROUP_LIMIT,
            providers: ProviderConfig::default(),
            settings: BTreeMap::new(),
        }
    }
}

impl ModelConfig {
    /// Load from `path`, else `MODELEX_CONFIG`, else the default location.
    ///
    /// A missing file is not an error; the default configuration is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => match std::env::var(CONFIG_ENV_VAR) {
                Ok(env_path) if !env_path.is_empty() => PathBuf::from(env_path),
                _ => Self::default_path()?,
            },
        };

        if path.exists() {
            Self::load_from(&path).await
        } else {
            tracing::debug!(target: "config", "No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML for this schema.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Write the configuration as pretty TOML, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// `~/.modelex/config.toml`
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".modelex").join("config.toml"))
    }

    /// The model root with `~` and environment variables expanded.
    pub fn model_root_path(&self) -> Option<PathBuf> {
        self.model_root.as_deref().map(expand_path)
    }

    /// The local clone path with `~` and environment variables expanded.
    pub fn local_clone_path(&self) -> Option<PathBuf> {
        self.local_clone.as_deref().map(expand_path)
    }
}

fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(raw).as_ref()),
    }
}

fn toml_to_json(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::from(*i),
        toml::Value::Float(f) => Value::from(*f),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(d) => Value::String(d.to_string()),
        toml::Value::Array(items) => Value::Array(items.iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => {
            Value::Object(table.iter().map(|(k, v)| (k.clone(), toml_to_json(v))).collect())
        }
    }
}

impl SettingsProvider for ModelConfig {
    fn get_setting(&self, name: &str) -> Option<Value> {
        match name {
            ENABLE_PROTECTED_RESOURCE_VALIDATION => {
                Some(Value::Bool(self.enable_protected_resource_validation))
            }
            MODEL_ROOT_SETTING => self
                .model_root_path()
                .map(|p| Value::String(p.display().to_string())),
            _ => self.settings.get(name).map(toml_to_json),
        }
    }
}

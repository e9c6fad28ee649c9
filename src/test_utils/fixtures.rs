//! Model repository fixtures
//!
//! [`ModelFixture`] writes namespace configs, object definitions and split
//! companions into a temporary directory laid out the way a real model repository
//! is, and builds stores over it.

use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use crate::config::{ProviderConfig, SettingsProvider, StaticSettings};
use crate::constants::{
    DEFAULT_OBJECT_ROOT, ENABLE_PROTECTED_RESOURCE_VALIDATION, NAMESPACE_CONFIG_FILE,
    PROTECTED_MODELS_DIR,
};
use crate::protection::StaticProviderRegistry;
use crate::store::ModelStore;

/// A model repository in a temporary directory.
///
/// The directory is removed when the fixture is dropped.
#[derive(Debug)]
pub struct ModelFixture {
    temp: TempDir,
}

impl ModelFixture {
    /// An empty model root.
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp: TempDir::new().context("Failed to create temp model root")?,
        })
    }

    /// Namespace `Compute` with a keyed `VM` object carrying one link resource.
    pub fn compute_vm() -> Result<Self> {
        let fixture = Self::new()?;
        fixture.add_namespace("Compute")?;
        fixture.add_object(
            "Compute",
            "VM",
            &json!({
                "path": "VM",
                "key": "Region",
                "requiredProps": ["Region"],
                "resources": [{ "relativePath": "Health\\Dummy", "type": "link" }]
            }),
        )?;
        Ok(fixture)
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    /// Write `value` as pretty JSON at a root-relative path.
    pub fn write_json(&self, relative: &str, value: &Value) -> Result<PathBuf> {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(value)?;
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// `<name>/namespaceConfig.json` declaring only the name.
    pub fn add_namespace(&self, name: &str) -> Result<PathBuf> {
        self.add_namespace_config(name, &json!({ "name": name }))
    }

    /// `<dir>/namespaceConfig.json` with an explicit document.
    pub fn add_namespace_config(&self, dir: &str, config: &Value) -> Result<PathBuf> {
        self.write_json(&format!("{dir}/{NAMESPACE_CONFIG_FILE}"), config)
    }

    /// `<namespace>/Objects/<stem>.json`
    pub fn add_object(&self, namespace: &str, stem: &str, definition: &Value) -> Result<PathBuf> {
        self.write_json(&format!("{namespace}/{DEFAULT_OBJECT_ROOT}/{stem}.json"), definition)
    }

    /// `<namespace>/Objects/<stem>.<token>.json`
    pub fn add_companion(
        &self,
        namespace: &str,
        stem: &str,
        token: &str,
        fragment: &Value,
    ) -> Result<PathBuf> {
        self.write_json(&format!("{namespace}/{DEFAULT_OBJECT_ROOT}/{stem}.{token}.json"), fragment)
    }

    /// A file under the protected tree, at the logical path `relative`.
    pub fn add_protected(&self, relative: &str, value: &Value) -> Result<PathBuf> {
        self.write_json(&format!("{PROTECTED_MODELS_DIR}/{relative}"), value)
    }

    /// Store with protection validation off and the default providers.
    pub fn store(&self) -> ModelStore {
        self.store_with_settings(Arc::new(StaticSettings::new()))
    }

    /// Store with protection validation on and the default providers.
    pub fn protected_store(&self) -> ModelStore {
        self.store_with_settings(Arc::new(
            StaticSettings::new().with(ENABLE_PROTECTED_RESOURCE_VALIDATION, true),
        ))
    }

    pub fn store_with_settings(&self, settings: Arc<dyn SettingsProvider>) -> ModelStore {
        let registry = StaticProviderRegistry::from_config(&ProviderConfig::default());
        ModelStore::new(self.root(), settings, Arc::new(registry))
    }
}

//! Protection validation for model documents.
//!
//! Some declarations run privileged code (script-backed resource profiles,
//! constants, arbitrary data providers). When the
//! `enableProtectedResourceValidation` setting is on, such declarations are only
//! accepted from files in the top-level `ProtectedModels` folder. Everywhere else
//! they are stripped from the in-memory document and reported, so one bad entry
//! never prevents the rest of the file from loading.
//!
//! # Rules
//!
//! | Document          | Entry              | Rejected when                                   |
//! |-------------------|--------------------|-------------------------------------------------|
//! | namespace config  | `resourceProfiles` | `type == "powershell"`                          |
//! | object definition | `constructor`      | data provider is not unprotected                |
//! | object definition | `additionalProps`  | `type == "constant"`, or provider not unprotected |
//! | object definition | `resources`        | resource provider is not unprotected            |
//!
//! Providers are looked up through a [`ProviderRegistry`]. A kind the registry does
//! not know is treated as protected.
//!
//! The validator never fails. It returns a [`ProtectionReport`]; whether a
//! non-empty report is fatal is the caller's decision (strict validation: yes,
//! passive reads: log and continue).

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::debug;

use crate::config::{ProviderConfig, SettingsProvider};
use crate::constants::{
    CONSTANT_PROP_KIND, ENABLE_PROTECTED_RESOURCE_VALIDATION, POWERSHELL_PROFILE_KIND,
};
use crate::fileset::is_protected;

/// Capabilities a provider declares about itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderCapabilities {
    /// Safe to declare outside `ProtectedModels`
    pub unprotected: bool,
}

impl ProviderCapabilities {
    pub const UNPROTECTED: Self = Self {
        unprotected: true,
    };
    pub const PROTECTED: Self = Self {
        unprotected: false,
    };
}

/// Lookup of resource and data providers by kind.
pub trait ProviderRegistry: Send + Sync {
    /// Capabilities of the resource provider for `kind`, if one is registered.
    fn resource_provider(&self, kind: &str) -> Option<ProviderCapabilities>;
    /// Capabilities of the data provider for `kind`, if one is registered.
    fn data_provider(&self, kind: &str) -> Option<ProviderCapabilities>;
}

/// Registry backed by two maps, usually built from [`ProviderConfig`].
#[derive(Debug, Clone, Default)]
pub struct StaticProviderRegistry {
    resources: HashMap<String, ProviderCapabilities>,
    data: HashMap<String, ProviderCapabilities>,
}

impl StaticProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource_provider(
        mut self,
        kind: impl Into<String>,
        caps: ProviderCapabilities,
    ) -> Self {
        self.resources.insert(kind.into(), caps);
        self
    }

    pub fn with_data_provider(
        mut self,
        kind: impl Into<String>,
        caps: ProviderCapabilities,
    ) -> Self {
        self.data.insert(kind.into(), caps);
        self
    }

    /// Register every configured kind as unprotected.
    pub fn from_config(config: &ProviderConfig) -> Self {
        let mut registry = Self::new();
        for kind in &config.unprotected_resources {
            registry.resources.insert(kind.clone(), ProviderCapabilities::UNPROTECTED);
        }
        for kind in &config.unprotected_data {
            registry.data.insert(kind.clone(), ProviderCapabilities::UNPROTECTED);
        }
        registry
    }
}

impl ProviderRegistry for StaticProviderRegistry {
    fn resource_provider(&self, kind: &str) -> Option<ProviderCapabilities> {
        self.resources.get(kind).copied()
    }

    fn data_provider(&self, kind: &str) -> Option<ProviderCapabilities> {
        self.data.get(kind).copied()
    }
}

/// Which kind of document is being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    NamespaceConfig,
    ObjectDefinition,
}

/// One rejected declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionFailure {
    /// Field the entry came from (`resources`, `additionalProps`, ...)
    pub field: &'static str,
    /// Identity of the entry (name or `relativePath.type`)
    pub entry: String,
    pub reason: String,
}

impl fmt::Display for ProtectionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}': {}", self.field, self.entry, self.reason)
    }
}

/// Outcome of validating one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectionReport {
    pub failures: Vec<ProtectionFailure>,
}

impl ProtectionReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    /// Every failure, one per line.
    pub fn message(&self) -> String {
        self.failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
    }
}

/// Entries split into those that may stay and the failures for the rest.
#[derive(Debug, Clone, Default)]
pub struct Partitioned {
    pub unprotected: Vec<Value>,
    pub failures: Vec<ProtectionFailure>,
}

/// Applies the protection rules to parsed documents.
pub struct ProtectionValidator {
    root: PathBuf,
    settings: Arc<dyn SettingsProvider>,
    registry: Arc<dyn ProviderRegistry>,
    enabled: OnceLock<bool>,
}

impl fmt::Debug for ProtectionValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtectionValidator")
            .field("root", &self.root)
            .field("enabled", &self.enabled.get())
            .finish_non_exhaustive()
    }
}

impl ProtectionValidator {
    pub fn new(
        root: impl Into<PathBuf>,
        settings: Arc<dyn SettingsProvider>,
        registry: Arc<dyn ProviderRegistry>,
    ) -> Self {
        Self {
            root: root.into(),
            settings,
            registry,
            enabled: OnceLock::new(),
        }
    }

    /// The feature flag, read once and cached for the validator's lifetime.
    pub fn is_enabled(&self) -> bool {
        *self.enabled.get_or_init(|| self.settings.flag(ENABLE_PROTECTED_RESOURCE_VALIDATION))
    }

    /// Files in the protected tree are never validated.
    pub fn is_exempt(&self, path: &Path) -> bool {
        is_protected(&self.root, path)
    }

    /// Validate `doc` in place, stripping rejected entries.
    pub fn validate(&self, doc: &mut Value, path: &Path, kind: DocumentKind) -> ProtectionReport {
        if self.is_exempt(path) || !self.is_enabled() {
            return ProtectionReport::default();
        }

        let report = match kind {
            DocumentKind::NamespaceConfig => self.validate_namespace_config(doc),
            DocumentKind::ObjectDefinition => self.validate_object_definition(doc),
        };

        if !report.is_ok() {
            debug!(
                target: "model::protection",
                "{} protected declarations stripped from {}",
                report.failures.len(),
                path.display()
            );
        }
        report
    }

    /// Split additional props into the unprotected ones and failures.
    ///
    /// `constant` props are always rejected; any other kind must be an
    /// unprotected data provider.
    pub fn partition_additional_props(&self, props: Vec<Value>) -> Partitioned {
        let mut partitioned = Partitioned::default();
        for prop in props {
            let name = string_field(&prop, "name");
            let kind = string_field(&prop, "type");
            let reason = if kind == CONSTANT_PROP_KIND {
                Some("constant props must be declared in a protected file".to_string())
            } else if !self.data_provider_unprotected(&kind) {
                Some(format!("data provider '{kind}' is not unprotected"))
            } else {
                None
            };

            match reason {
                Some(reason) => partitioned.failures.push(ProtectionFailure {
                    field: "additionalProps",
                    entry: name,
                    reason,
                }),
                None => partitioned.unprotected.push(prop),
            }
        }
        partitioned
    }

    fn validate_namespace_config(&self, doc: &mut Value) -> ProtectionReport {
        let mut report = ProtectionReport::default();
        let Some(profiles) = doc.get_mut("resourceProfiles").and_then(Value::as_array_mut) else {
            return report;
        };

        profiles.retain(|profile| {
            let kind = string_field(profile, "type");
            if kind.eq_ignore_ascii_case(POWERSHELL_PROFILE_KIND) {
                report.failures.push(ProtectionFailure {
                    field: "resourceProfiles",
                    entry: string_field(profile, "name"),
                    reason: format!("'{kind}' profiles must be declared in a protected file"),
                });
                false
            } else {
                true
            }
        });
        report
    }

    fn validate_object_definition(&self, doc: &mut Value) -> ProtectionReport {
        let mut report = ProtectionReport::default();
        let Some(object) = doc.as_object_mut() else {
            return report;
        };

        if let Some(constructor) = object.get("constructor") {
            let kind = string_field(constructor, "type");
            if !self.data_provider_unprotected(&kind) {
                report.failures.push(ProtectionFailure {
                    field: "constructor",
                    entry: kind.clone(),
                    reason: format!("data provider '{kind}' is not unprotected"),
                });
                object.remove("constructor");
            }
        }

        if let Some(Value::Array(props)) = object.get_mut("additionalProps") {
            let partitioned = self.partition_additional_props(std::mem::take(props));
            *props = partitioned.unprotected;
            report.failures.extend(partitioned.failures);
        }

        if let Some(Value::Array(resources)) = object.get_mut("resources") {
            resources.retain(|resource| {
                let kind = string_field(resource, "type");
                if self.resource_provider_unprotected(&kind) {
                    true
                } else {
                    report.failures.push(ProtectionFailure {
                        field: "resources",
                        entry: format!("{}.{}", string_field(resource, "relativePath"), kind),
                        reason: format!("resource provider '{kind}' is not unprotected"),
                    });
                    false
                }
            });
        }

        report
    }

    fn data_provider_unprotected(&self, kind: &str) -> bool {
        self.registry.data_provider(kind).is_some_and(|caps| caps.unprotected)
    }

    fn resource_provider_unprotected(&self, kind: &str) -> bool {
        self.registry.resource_provider(kind).is_some_and(|caps| caps.unprotected)
    }
}

fn string_field(value: &Value, field: &str) -> String {
    value.get(field).and_then(Value::as_str).unwrap_or_default().to_string()
}

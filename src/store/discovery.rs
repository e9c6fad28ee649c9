//! Disk resolution of namespaces and object definitions.
//!
//! These functions never touch a cache; [`super::ModelStore`] wraps them with
//! caching and [`super::ModelStore::validate_model_files`] calls them directly.

use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::ObjectDefinitions;
use crate::constants::{NAMESPACE_CONFIG_FILE, NAMESPACE_CONFIG_GLOB, OBJECT_FILE_GLOB};
use crate::core::ModelError;
use crate::fileset::FileSet;
use crate::loader::{DocumentKind, LoadMode, load_merged};
use crate::model::{NamespaceConfig, ObjectDefinition, ParsedObjectDefinition, ResourceProfile};
use crate::protection::ProtectionValidator;

/// A loaded namespace config and where it came from.
#[derive(Debug, Clone)]
pub struct NamespaceEntry {
    pub config: NamespaceConfig,
    /// Directory holding the base `namespaceConfig.json`
    pub dir: PathBuf,
    /// Base file first, then merged companions
    pub files: Vec<PathBuf>,
}

impl NamespaceEntry {
    /// Directory searched for this namespace's object files.
    pub fn object_dir(&self) -> PathBuf {
        self.dir.join(&self.config.object_root)
    }
}

/// Every namespace under a model root, with profiles indexed by name.
#[derive(Debug, Default)]
pub(crate) struct NamespaceCatalog {
    pub(crate) entries: BTreeMap<String, Arc<NamespaceEntry>>,
    pub(crate) profiles: BTreeMap<String, BTreeMap<String, ResourceProfile>>,
}

impl NamespaceCatalog {
    pub(crate) fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

fn is_fatal(err: &ModelError, mode: LoadMode) -> bool {
    mode == LoadMode::Strict || err.is_integrity_error()
}

/// Load every namespace config under the fileset's root.
pub(crate) async fn discover_namespaces(
    fileset: &FileSet,
    validator: &ProtectionValidator,
    mode: LoadMode,
) -> Result<NamespaceCatalog, ModelError> {
    let bases = fileset.list_base_files(NAMESPACE_CONFIG_GLOB)?;
    let results =
        join_all(bases.iter().map(|path| load_namespace(fileset, path, validator, mode))).await;

    let mut catalog = NamespaceCatalog::default();
    for (path, result) in bases.iter().zip(results) {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) if is_fatal(&err, mode) => return Err(err),
            Err(err) => {
                warn!(
                    target: "model::store",
                    "Skipping namespace config {}: {err}",
                    path.display()
                );
                continue;
            }
        };

        let name = entry.config.name.clone();
        if let Some(existing) = catalog.entries.get(&name) {
            return Err(ModelError::DuplicateNamespace {
                name,
                first: display_first(&existing.files),
                second: path.display().to_string(),
            });
        }

        let profiles = entry
            .config
            .resource_profiles
            .iter()
            .map(|profile| (profile.name.clone(), profile.clone()))
            .collect();
        catalog.profiles.insert(name.clone(), profiles);
        catalog.entries.insert(name, Arc::new(entry));
    }

    if catalog.entries.is_empty() {
        return Err(ModelError::NoNamespacesFound {
            root: fileset.root().display().to_string(),
        });
    }

    debug!(target: "model::store", "Loaded {} namespaces", catalog.entries.len());
    Ok(catalog)
}

async fn load_namespace(
    fileset: &FileSet,
    path: &Path,
    validator: &ProtectionValidator,
    mode: LoadMode,
) -> Result<NamespaceEntry, ModelError> {
    let merged = load_merged(fileset, path, DocumentKind::NamespaceConfig, mode, validator).await?;
    let config: NamespaceConfig =
        serde_json::from_value(merged.value).map_err(|e| ModelError::InvalidDefinition {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;

    Ok(NamespaceEntry {
        config,
        dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
        files: merged.associated_paths,
    })
}

/// Load and parse every object definition of one namespace.
pub(crate) async fn load_object_definitions(
    fileset: &FileSet,
    entry: &NamespaceEntry,
    validator: &ProtectionValidator,
    mode: LoadMode,
) -> Result<BTreeMap<String, Arc<ParsedObjectDefinition>>, ModelError> {
    let namespace = entry.config.name.as_str();
    let bases: Vec<PathBuf> = fileset
        .list_base_files_under(&entry.object_dir(), OBJECT_FILE_GLOB)?
        .into_iter()
        .filter(|path| path.file_name().is_none_or(|name| name != NAMESPACE_CONFIG_FILE))
        .collect();

    let results = join_all(
        bases.iter().map(|path| load_object(fileset, path, namespace, validator, mode)),
    )
    .await;

    let mut definitions: BTreeMap<String, Arc<ParsedObjectDefinition>> = BTreeMap::new();
    for (path, result) in bases.iter().zip(results) {
        let parsed = match result {
            Ok(parsed) => parsed,
            Err(err) if is_fatal(&err, mode) => return Err(err),
            Err(err) => {
                warn!(
                    target: "model::store",
                    "Skipping object definition {}: {err}",
                    path.display()
                );
                continue;
            }
        };

        if let Some(existing) = definitions.get(parsed.path()) {
            return Err(ModelError::DuplicateObjectPath {
                namespace: namespace.to_string(),
                path: parsed.path().to_string(),
                first: display_first(existing.files()),
                second: path.display().to_string(),
            });
        }
        definitions.insert(parsed.path().to_string(), Arc::new(parsed));
    }

    debug!(
        target: "model::store",
        "Loaded {} object definitions for namespace '{namespace}'",
        definitions.len()
    );
    Ok(definitions)
}

async fn load_object(
    fileset: &FileSet,
    path: &Path,
    namespace: &str,
    validator: &ProtectionValidator,
    mode: LoadMode,
) -> Result<ParsedObjectDefinition, ModelError> {
    let merged = load_merged(fileset, path, DocumentKind::ObjectDefinition, mode, validator).await?;
    let definition: ObjectDefinition =
        serde_json::from_value(merged.value).map_err(|e| ModelError::InvalidDefinition {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;
    ParsedObjectDefinition::parse(definition, namespace, merged.associated_paths)
}

/// Namespaces other than `namespace` that `definitions` associate with.
pub(crate) fn foreign_association_namespaces(
    namespace: &str,
    definitions: &BTreeMap<String, Arc<ParsedObjectDefinition>>,
) -> BTreeSet<String> {
    definitions
        .values()
        .flat_map(|definition| definition.associations())
        .map(|association| association.target_namespace(namespace))
        .filter(|target| *target != namespace)
        .map(str::to_string)
        .collect()
}

/// Check that every association of `definitions` points at a known object.
///
/// Targets in `namespace` are looked up in `definitions`, other targets in
/// `others`. A namespace missing from `others` has no objects to point at.
pub(crate) fn check_associations(
    namespace: &str,
    definitions: &BTreeMap<String, Arc<ParsedObjectDefinition>>,
    others: &BTreeMap<String, ObjectDefinitions>,
) -> Result<(), ModelError> {
    for definition in definitions.values() {
        for association in definition.associations() {
            let target_namespace = association.target_namespace(namespace);
            let target = association.associated_object_path.as_str();

            let found = if target_namespace == namespace {
                definitions.contains_key(target)
            } else {
                others.get(target_namespace).is_some_and(|other| other.contains_key(target))
            };

            if !found {
                return Err(ModelError::AssociationTargetNotFound {
                    namespace: namespace.to_string(),
                    object: definition.path().to_string(),
                    target_namespace: target_namespace.to_string(),
                    target: target.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn display_first(files: &[PathBuf]) -> String {
    files.first().map(|p| p.display().to_string()).unwrap_or_default()
}

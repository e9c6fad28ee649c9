//! Cached model resolution.
//!
//! [`ModelStore`] answers namespace, object definition and resource profile
//! queries for one model repository. Results are resolved from disk on the first
//! request and cached until explicitly cleared; there is no expiry.
//!
//! # Caches
//!
//! - **Namespaces**: one segment holding every namespace config and the resource
//!   profile index. Populated by [`ModelStore::get_namespaces`], dropped by
//!   [`ModelStore::clear_namespace_cache`].
//! - **Object definitions**: one segment per namespace. Populated by
//!   [`ModelStore::get_object_definitions`], dropped by
//!   [`ModelStore::clear_object_definition_cache`].
//!
//! A segment is either fully populated or absent. A load that fails leaves nothing
//! behind, and a load that overlaps a clear does not publish its result.
//!
//! # Concurrency
//!
//! Concurrent misses on the same segment are serialized by a per-key async lock
//! and re-check the cache after acquiring it, so each segment is resolved from disk
//! once no matter how many tasks ask for it.
//!
//! # Example
//!
//! ```rust,no_run
//! use modelex::config::StaticSettings;
//! use modelex::protection::StaticProviderRegistry;
//! use modelex::store::ModelStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), modelex::core::ModelError> {
//! let store = ModelStore::new(
//!     "/src/models",
//!     Arc::new(StaticSettings::new()),
//!     Arc::new(StaticProviderRegistry::new()),
//! );
//! let vm = store.get_object_definition("Compute", "VM").await?;
//! println!("{} has {} resources", vm.path(), vm.resources().len());
//! # Ok(())
//! # }
//! ```

mod discovery;
mod local_clone;

pub use discovery::NamespaceEntry;
pub use local_clone::{LocalClone, LocalCloneDir};

use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::{ModelConfig, SettingsProvider};
use crate::core::ModelError;
use crate::fileset::FileSet;
use crate::loader::LoadMode;
use crate::model::{NamespaceConfig, ParsedObjectDefinition, ResourceProfile};
use crate::protection::{ProtectionValidator, ProviderRegistry, StaticProviderRegistry};
use discovery::{
    NamespaceCatalog, check_associations, discover_namespaces, foreign_association_namespaces,
    load_object_definitions,
};

/// Object definitions of one namespace keyed by object path.
pub type ObjectDefinitions = Arc<BTreeMap<String, Arc<ParsedObjectDefinition>>>;

/// Counts reported by [`ModelStore::validate_model_files`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub namespaces: usize,
    pub objects: usize,
    /// Base files and companions read
    pub files: usize,
}

/// Cached resolver for one model repository.
pub struct ModelStore {
    root: PathBuf,
    validator: Arc<ProtectionValidator>,
    namespaces: Arc<RwLock<Option<Arc<NamespaceCatalog>>>>,
    namespace_lock: Arc<Mutex<()>>,
    object_cache: Arc<DashMap<String, ObjectDefinitions>>,
    object_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    /// Bumped by every clear; loads started before a clear do not publish.
    generation: Arc<AtomicU64>,
    namespace_names: Arc<std::sync::RwLock<Vec<String>>>,
    local_clone: Option<Arc<dyn LocalClone>>,
}

impl Clone for ModelStore {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            validator: Arc::clone(&self.validator),
            namespaces: Arc::clone(&self.namespaces),
            namespace_lock: Arc::clone(&self.namespace_lock),
            object_cache: Arc::clone(&self.object_cache),
            object_locks: Arc::clone(&self.object_locks),
            generation: Arc::clone(&self.generation),
            namespace_names: Arc::clone(&self.namespace_names),
            local_clone: self.local_clone.clone(),
        }
    }
}

impl std::fmt::Debug for ModelStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelStore")
            .field("root", &self.root)
            .field("cached_namespaces", &self.object_cache.len())
            .field("local_clone", &self.local_clone)
            .finish_non_exhaustive()
    }
}

impl ModelStore {
    /// Create a store over `root` with empty caches.
    pub fn new(
        root: impl Into<PathBuf>,
        settings: Arc<dyn SettingsProvider>,
        registry: Arc<dyn ProviderRegistry>,
    ) -> Self {
        let root = root.into();
        Self {
            validator: Arc::new(ProtectionValidator::new(root.clone(), settings, registry)),
            root,
            namespaces: Arc::new(RwLock::new(None)),
            namespace_lock: Arc::new(Mutex::new(())),
            object_cache: Arc::new(DashMap::new()),
            object_locks: Arc::new(DashMap::new()),
            generation: Arc::new(AtomicU64::new(0)),
            namespace_names: Arc::new(std::sync::RwLock::new(Vec::new())),
            local_clone: None,
        }
    }

    /// Build a store from the CLI configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ConfigError`] when no model root is configured.
    pub fn from_config(config: &ModelConfig) -> Result<Self, ModelError> {
        let root = config.model_root_path().ok_or_else(|| ModelError::ConfigError {
            message: "No model root configured; set model_root or pass --model-root".to_string(),
        })?;
        let registry = StaticProviderRegistry::from_config(&config.providers);
        let mut store = Self::new(root, Arc::new(config.clone()), Arc::new(registry));
        if let Some(clone) = config.local_clone_path() {
            store = store.with_local_clone(Arc::new(LocalCloneDir::new(clone)));
        }
        Ok(store)
    }

    /// Local clone wiped when the root turns out to hold no namespaces.
    pub fn with_local_clone(mut self, local_clone: Arc<dyn LocalClone>) -> Self {
        self.local_clone = Some(local_clone);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every namespace config, sorted by name.
    ///
    /// Files that fail to load are logged and skipped.
    ///
    /// # Errors
    ///
    /// - [`ModelError::DuplicateNamespace`] when two configs share a name; nothing is cached
    /// - [`ModelError::NoNamespacesFound`] when none load; the local clone is wiped
    pub async fn get_namespaces(&self) -> Result<Vec<NamespaceConfig>, ModelError> {
        self.load_namespaces(LoadMode::Lenient).await
    }

    /// Like [`ModelStore::get_namespaces`] with an explicit load mode.
    ///
    /// A strict load always goes to disk and fails on the first bad file; when it
    /// succeeds its result is cached.
    ///
    /// # Errors
    ///
    /// As [`ModelStore::get_namespaces`], plus per-file errors in strict mode.
    pub async fn load_namespaces(
        &self,
        mode: LoadMode,
    ) -> Result<Vec<NamespaceConfig>, ModelError> {
        let catalog = self.namespace_catalog(mode).await?;
        Ok(catalog.entries.values().map(|entry| entry.config.clone()).collect())
    }

    /// The namespace entry for `name`, including its directory on disk.
    ///
    /// # Errors
    ///
    /// [`ModelError::NamespaceNotFound`] when no such namespace loaded.
    pub async fn get_namespace(&self, name: &str) -> Result<Arc<NamespaceEntry>, ModelError> {
        let catalog = self.namespace_catalog(LoadMode::Lenient).await?;
        catalog.entries.get(name).cloned().ok_or_else(|| ModelError::NamespaceNotFound {
            name: name.to_string(),
        })
    }

    /// Names of the namespaces last loaded, without touching the disk.
    ///
    /// Empty until a namespace load completes, and again after
    /// [`ModelStore::clear_namespace_cache`] until the next one does.
    pub fn namespace_names(&self) -> Vec<String> {
        self.namespace_names.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Every object definition of `namespace`, keyed by path.
    ///
    /// # Errors
    ///
    /// - [`ModelError::NamespaceNotFound`] for an unknown namespace
    /// - [`ModelError::DuplicateObjectPath`], [`ModelError::ObjectKeyNotInRequiredProps`]
    ///   and [`ModelError::AssociationTargetNotFound`]; nothing is cached
    pub async fn get_object_definitions(
        &self,
        namespace: &str,
    ) -> Result<ObjectDefinitions, ModelError> {
        if let Some(cached) = self.object_cache.get(namespace) {
            return Ok(Arc::clone(cached.value()));
        }

        let lock = Arc::clone(
            self.object_locks
                .entry(namespace.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        let _guard = lock.lock().await;

        if let Some(cached) = self.object_cache.get(namespace) {
            return Ok(Arc::clone(cached.value()));
        }

        let generation = self.generation.load(Ordering::Acquire);
        let catalog = self.namespace_catalog(LoadMode::Lenient).await?;
        let entry = catalog.entries.get(namespace).ok_or_else(|| ModelError::NamespaceNotFound {
            name: namespace.to_string(),
        })?;

        let fileset = FileSet::scan_async(&self.root).await?;
        let definitions =
            load_object_definitions(&fileset, entry, &self.validator, LoadMode::Lenient).await?;
        let others =
            self.association_targets(&fileset, &catalog, namespace, &definitions).await?;
        check_associations(namespace, &definitions, &others)?;

        let definitions = Arc::new(definitions);
        if self.generation.load(Ordering::Acquire) == generation {
            self.object_cache.insert(namespace.to_string(), Arc::clone(&definitions));
        } else {
            debug!(
                target: "model::store",
                "Cache cleared while loading '{namespace}'; not caching"
            );
        }
        Ok(definitions)
    }

    /// One object definition.
    ///
    /// # Errors
    ///
    /// [`ModelError::ObjectNotFound`] (with the closest known path, if any) when the
    /// namespace has no such object, plus everything
    /// [`ModelStore::get_object_definitions`] returns.
    pub async fn get_object_definition(
        &self,
        namespace: &str,
        path: &str,
    ) -> Result<Arc<ParsedObjectDefinition>, ModelError> {
        let definitions = self.get_object_definitions(namespace).await?;
        definitions.get(path).cloned().ok_or_else(|| ModelError::ObjectNotFound {
            namespace: namespace.to_string(),
            path: path.to_string(),
            closest: closest_match(path, definitions.keys()),
        })
    }

    /// A named resource profile of `namespace`.
    ///
    /// # Errors
    ///
    /// [`ModelError::ResourceProfileNotFound`] when the namespace or profile is unknown.
    pub async fn get_resource_profile(
        &self,
        namespace: &str,
        profile: &str,
    ) -> Result<ResourceProfile, ModelError> {
        let catalog = self.namespace_catalog(LoadMode::Lenient).await?;
        catalog
            .profiles
            .get(namespace)
            .and_then(|profiles| profiles.get(profile))
            .cloned()
            .ok_or_else(|| ModelError::ResourceProfileNotFound {
                namespace: namespace.to_string(),
                profile: profile.to_string(),
            })
    }

    /// Drop the namespace and profile caches along with the namespace-name index.
    ///
    /// When called inside a tokio runtime the index is refreshed in the
    /// background; it stays empty if that refresh fails.
    pub async fn clear_namespace_cache(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        *self.namespaces.write().await = None;
        self.namespace_names.write().unwrap_or_else(PoisonError::into_inner).clear();
        debug!(target: "model::store", "Namespace cache cleared");

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let store = self.clone();
            handle.spawn(async move {
                if let Err(err) = store.get_namespaces().await {
                    warn!(target: "model::store", "Background namespace refresh failed: {err}");
                }
            });
        }
    }

    /// Drop the object definition cache for one namespace, or for all of them.
    pub fn clear_object_definition_cache(&self, namespace: Option<&str>) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        match namespace {
            Some(namespace) => {
                self.object_cache.remove(namespace);
            }
            None => self.object_cache.clear(),
        }
        debug!(
            target: "model::store",
            "Object definition cache cleared ({})",
            namespace.unwrap_or("all")
        );
    }

    /// Strictly load every namespace and every object from disk.
    ///
    /// Caches are neither read nor written.
    ///
    /// # Errors
    ///
    /// The first error of any kind, including protection violations.
    pub async fn validate_model_files(&self) -> Result<ValidationSummary, ModelError> {
        let fileset = FileSet::scan_async(&self.root).await?;
        let catalog = discover_namespaces(&fileset, &self.validator, LoadMode::Strict).await?;

        let mut summary = ValidationSummary {
            namespaces: catalog.entries.len(),
            ..ValidationSummary::default()
        };
        summary.files += catalog.entries.values().map(|entry| entry.files.len()).sum::<usize>();

        let mut all: BTreeMap<String, ObjectDefinitions> = BTreeMap::new();
        for (name, entry) in &catalog.entries {
            let definitions =
                load_object_definitions(&fileset, entry, &self.validator, LoadMode::Strict).await?;
            summary.objects += definitions.len();
            summary.files += definitions.values().map(|d| d.files().len()).sum::<usize>();
            all.insert(name.clone(), Arc::new(definitions));
        }

        for (name, definitions) in &all {
            check_associations(name, definitions, &all)?;
        }

        info!(
            target: "model::store",
            "Validated {} namespaces, {} objects, {} files",
            summary.namespaces,
            summary.objects,
            summary.files
        );
        Ok(summary)
    }

    async fn namespace_catalog(&self, mode: LoadMode) -> Result<Arc<NamespaceCatalog>, ModelError> {
        if mode == LoadMode::Lenient
            && let Some(catalog) = self.namespaces.read().await.clone()
        {
            return Ok(catalog);
        }

        let _guard = self.namespace_lock.lock().await;
        if mode == LoadMode::Lenient
            && let Some(catalog) = self.namespaces.read().await.clone()
        {
            return Ok(catalog);
        }

        let generation = self.generation.load(Ordering::Acquire);
        let fileset = FileSet::scan_async(&self.root).await?;
        let catalog = match discover_namespaces(&fileset, &self.validator, mode).await {
            Ok(catalog) => Arc::new(catalog),
            Err(err) => {
                if matches!(err, ModelError::NoNamespacesFound { .. }) {
                    self.wipe_local_clone();
                }
                return Err(err);
            }
        };

        if self.generation.load(Ordering::Acquire) == generation {
            *self.namespaces.write().await = Some(Arc::clone(&catalog));
            *self.namespace_names.write().unwrap_or_else(PoisonError::into_inner) = catalog.names();
        }
        Ok(catalog)
    }

    /// Definitions of every other namespace `definitions` associate with.
    ///
    /// Cached namespaces are used as they are; the rest are read from disk
    /// without touching their cache or locks, so two namespaces pointing at each
    /// other cannot wait on one another.
    async fn association_targets(
        &self,
        fileset: &FileSet,
        catalog: &NamespaceCatalog,
        namespace: &str,
        definitions: &BTreeMap<String, Arc<ParsedObjectDefinition>>,
    ) -> Result<BTreeMap<String, ObjectDefinitions>, ModelError> {
        let mut targets = BTreeMap::new();
        for target in foreign_association_namespaces(namespace, definitions) {
            let Some(entry) = catalog.entries.get(&target) else {
                continue;
            };
            let cached = self.object_cache.get(&target).map(|cached| Arc::clone(cached.value()));
            let target_definitions = match cached {
                Some(cached) => cached,
                None => {
                    debug!(
                        target: "model::store",
                        "Reading '{target}' to check associations of '{namespace}'"
                    );
                    let loaded =
                        load_object_definitions(fileset, entry, &self.validator, LoadMode::Lenient)
                            .await?;
                    Arc::new(loaded)
                }
            };
            targets.insert(target, target_definitions);
        }
        Ok(targets)
    }

    fn wipe_local_clone(&self) {
        let Some(clone) = &self.local_clone else {
            warn!(target: "model::store", "No namespaces under {}", self.root.display());
            return;
        };
        if let Err(err) = clone.wipe() {
            warn!(target: "model::store", "Failed to wipe local clone: {err}");
        }
    }
}

/// The candidate most similar to `target`, if any is reasonably close.
fn closest_match<'a>(
    target: &str,
    candidates: impl Iterator<Item = &'a String>,
) -> Option<String> {
    let target = target.to_lowercase();
    candidates
        .map(|candidate| (strsim::jaro_winkler(&target, &candidate.to_lowercase()), candidate))
        .filter(|(score, _)| *score >= 0.8)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, candidate)| candidate.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticSettings;
    use serde_json::{Value, json};
    use std::fs;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, value: Value) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
    }

    fn store(root: &Path) -> ModelStore {
        ModelStore::new(
            root,
            Arc::new(StaticSettings::new()),
            Arc::new(StaticProviderRegistry::new()),
        )
    }

    fn compute_model(root: &Path) {
        write(
            root,
            "Compute/namespaceConfig.json",
            json!({
                "name": "Compute",
                "requiredBaseProps": [{ "name": "Cloud" }],
                "resourceProfiles": [{ "name": "portal", "type": "link", "baseUrl": "https://portal" }]
            }),
        );
        write(
            root,
            "Compute/Objects/VM.json",
            json!({
                "path": "VM",
                "key": "Region",
                "requiredProps": ["Region"],
                "associations": [{ "relativePath": "Disks", "associatedObjectPath": "Disk" }]
            }),
        );
        write(root, "Compute/Objects/Disk.json", json!({ "path": "Disk" }));
    }

    #[derive(Debug, Default)]
    struct CountingClone(AtomicUsize);

    impl LocalClone for CountingClone {
        fn wipe(&self) -> Result<(), ModelError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_namespaces_and_profiles() {
        let temp = TempDir::new().unwrap();
        compute_model(temp.path());
        let store = store(temp.path());

        let namespaces = store.get_namespaces().await.unwrap();
        assert_eq!(namespaces.len(), 1);
        assert_eq!(namespaces[0].name, "Compute");
        assert_eq!(store.namespace_names(), vec!["Compute".to_string()]);

        let profile = store.get_resource_profile("Compute", "portal").await.unwrap();
        assert_eq!(profile.extra["baseUrl"], "https://portal");
        assert!(matches!(
            store.get_resource_profile("Compute", "missing").await.unwrap_err(),
            ModelError::ResourceProfileNotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_duplicate_namespace_is_not_cached() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "A/namespaceConfig.json", json!({ "name": "Compute" }));
        write(temp.path(), "B/namespaceConfig.json", json!({ "name": "Compute" }));
        let store = store(temp.path());

        let err = store.get_namespaces().await.unwrap_err();
        assert!(matches!(
            err,
            ModelError::DuplicateNamespace { ref name, .. } if name == "Compute"
        ));
        assert!(store.namespaces.read().await.is_none());
        assert!(store.namespace_names().is_empty());
    }

    #[tokio::test]
    async fn test_zero_namespaces_wipes_local_clone() {
        let temp = TempDir::new().unwrap();
        let clone = Arc::new(CountingClone::default());
        let store = store(temp.path()).with_local_clone(clone.clone());

        let err = store.get_namespaces().await.unwrap_err();
        assert!(matches!(err, ModelError::NoNamespacesFound { .. }));
        assert_eq!(clone.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_object_definitions_and_lookup() {
        let temp = TempDir::new().unwrap();
        compute_model(temp.path());
        let store = store(temp.path());

        let definitions = store.get_object_definitions("Compute").await.unwrap();
        assert_eq!(definitions.keys().cloned().collect::<Vec<_>>(), vec!["Disk", "VM"]);

        let again = store.get_object_definitions("Compute").await.unwrap();
        assert!(Arc::ptr_eq(&definitions, &again));

        let err = store.get_object_definition("Compute", "Vm").await.unwrap_err();
        assert_eq!(
            err,
            ModelError::ObjectNotFound {
                namespace: "Compute".to_string(),
                path: "Vm".to_string(),
                closest: Some("VM".to_string()),
            }
        );

        assert!(matches!(
            store.get_object_definitions("Storage").await.unwrap_err(),
            ModelError::NamespaceNotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_duplicate_object_path() {
        let temp = TempDir::new().unwrap();
        compute_model(temp.path());
        write(temp.path(), "Compute/Objects/Nested/VM.json", json!({ "path": "VM" }));
        let store = store(temp.path());

        let err = store.get_object_definitions("Compute").await.unwrap_err();
        assert!(matches!(err, ModelError::DuplicateObjectPath { ref path, .. } if path == "VM"));
        assert!(store.object_cache.get("Compute").is_none());
    }

    #[tokio::test]
    async fn test_key_must_be_required_prop() {
        let temp = TempDir::new().unwrap();
        compute_model(temp.path());
        write(temp.path(), "Compute/Objects/Bad.json", json!({ "path": "Bad", "key": "Id" }));
        let store = store(temp.path());

        let err = store.get_object_definitions("Compute").await.unwrap_err();
        assert!(matches!(err, ModelError::ObjectKeyNotInRequiredProps { .. }));
    }

    #[tokio::test]
    async fn test_missing_association_target() {
        let temp = TempDir::new().unwrap();
        compute_model(temp.path());
        fs::remove_file(temp.path().join("Compute/Objects/Disk.json")).unwrap();
        let store = store(temp.path());

        let err = store.get_object_definitions("Compute").await.unwrap_err();
        assert_eq!(
            err,
            ModelError::AssociationTargetNotFound {
                namespace: "Compute".to_string(),
                object: "VM".to_string(),
                target_namespace: "Compute".to_string(),
                target: "Disk".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_cross_namespace_association() {
        let temp = TempDir::new().unwrap();
        compute_model(temp.path());
        write(temp.path(), "Storage/namespaceConfig.json", json!({ "name": "Storage" }));
        write(temp.path(), "Storage/Objects/Account.json", json!({ "path": "Account" }));
        write(
            temp.path(),
            "Compute/Objects/Backup.json",
            json!({
                "path": "Backup",
                "associations": [
                    { "relativePath": "Target", "associatedObjectPath": "Account", "associatedNamespace": "Storage" }
                ]
            }),
        );
        let store = store(temp.path());
        store.get_object_definitions("Compute").await.unwrap();

        write(
            temp.path(),
            "Compute/Objects/Broken.json",
            json!({
                "path": "Broken",
                "associations": [
                    { "relativePath": "X", "associatedObjectPath": "Nope", "associatedNamespace": "Missing" }
                ]
            }),
        );
        store.clear_object_definition_cache(Some("Compute"));
        assert!(matches!(
            store.get_object_definitions("Compute").await.unwrap_err(),
            ModelError::AssociationTargetNotFound { .. }
        ));
    }

    fn storage_with_backup_to(root: &Path, target: &str) {
        compute_model(root);
        write(root, "Storage/namespaceConfig.json", json!({ "name": "Storage" }));
        write(root, "Storage/Objects/Account.json", json!({ "path": "Account" }));
        write(
            root,
            "Compute/Objects/Backup.json",
            json!({
                "path": "Backup",
                "associations": [
                    { "relativePath": "Target", "associatedObjectPath": target, "associatedNamespace": "Storage" }
                ]
            }),
        );
    }

    #[tokio::test]
    async fn test_cross_namespace_target_checked_regardless_of_load_order() {
        let temp = TempDir::new().unwrap();
        storage_with_backup_to(temp.path(), "Ghost");

        let cold = store(temp.path());
        let cold_err = cold.get_object_definitions("Compute").await.unwrap_err();
        assert!(cold.object_cache.get("Storage").is_none());

        let warm = store(temp.path());
        warm.get_object_definitions("Storage").await.unwrap();
        let warm_err = warm.get_object_definitions("Compute").await.unwrap_err();

        for err in [cold_err, warm_err] {
            assert_eq!(
                err,
                ModelError::AssociationTargetNotFound {
                    namespace: "Compute".to_string(),
                    object: "Backup".to_string(),
                    target_namespace: "Storage".to_string(),
                    target: "Ghost".to_string(),
                }
            );
        }
        assert!(cold.object_cache.get("Compute").is_none());
    }

    #[tokio::test]
    async fn test_mutual_cross_namespace_associations_load() {
        let temp = TempDir::new().unwrap();
        storage_with_backup_to(temp.path(), "Account");
        write(
            temp.path(),
            "Storage/Objects/Account.json",
            json!({
                "path": "Account",
                "associations": [
                    { "relativePath": "Owners", "associatedObjectPath": "VM", "associatedNamespace": "Compute" }
                ]
            }),
        );
        let store = store(temp.path());

        let (compute, storage) = tokio::join!(
            store.get_object_definitions("Compute"),
            store.get_object_definitions("Storage")
        );
        assert_eq!(compute.unwrap().len(), 3);
        assert_eq!(storage.unwrap().len(), 1);
        assert!(store.validate_model_files().await.is_ok());
    }

    #[tokio::test]
    async fn test_clear_namespace_cache_drops_name_index() {
        let temp = TempDir::new().unwrap();
        compute_model(temp.path());
        let store = store(temp.path());
        store.get_namespaces().await.unwrap();
        assert_eq!(store.namespace_names(), vec!["Compute".to_string()]);

        write(temp.path(), "Copy/namespaceConfig.json", json!({ "name": "Compute" }));
        store.clear_namespace_cache().await;
        assert!(store.namespace_names().is_empty());

        assert!(matches!(
            store.get_namespaces().await.unwrap_err(),
            ModelError::DuplicateNamespace { .. }
        ));
        assert!(store.namespace_names().is_empty());
    }

    #[tokio::test]
    async fn test_clear_object_cache_rereads_disk() {
        let temp = TempDir::new().unwrap();
        compute_model(temp.path());
        let store = store(temp.path());
        assert_eq!(store.get_object_definitions("Compute").await.unwrap().len(), 2);

        write(temp.path(), "Compute/Objects/Nic.json", json!({ "path": "Nic" }));
        assert_eq!(store.get_object_definitions("Compute").await.unwrap().len(), 2);

        store.clear_object_definition_cache(None);
        assert_eq!(store.get_object_definitions("Compute").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_clear_namespace_cache() {
        let temp = TempDir::new().unwrap();
        compute_model(temp.path());
        let store = store(temp.path());
        store.get_namespaces().await.unwrap();

        write(temp.path(), "Storage/namespaceConfig.json", json!({ "name": "Storage" }));
        store.clear_namespace_cache().await;

        let names: Vec<_> =
            store.get_namespaces().await.unwrap().into_iter().map(|n| n.name).collect();
        assert_eq!(names, vec!["Compute", "Storage"]);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_result() {
        let temp = TempDir::new().unwrap();
        compute_model(temp.path());
        let store = store(temp.path());

        let (a, b) = tokio::join!(
            store.get_object_definitions("Compute"),
            store.get_object_definitions("Compute")
        );
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
    }

    #[tokio::test]
    async fn test_validate_model_files_is_strict() {
        let temp = TempDir::new().unwrap();
        compute_model(temp.path());
        write(
            temp.path(),
            "Compute/Objects/VM.health.json",
            json!({ "displayName": "VM {Region}" }),
        );
        let store = store(temp.path());

        let summary = store.validate_model_files().await.unwrap();
        assert_eq!(
            summary,
            ValidationSummary {
                namespaces: 1,
                objects: 2,
                files: 4,
            }
        );
        assert!(store.object_cache.is_empty());

        write(temp.path(), "Compute/Objects/Broken.json", json!("not an object"));
        assert!(store.get_object_definitions("Compute").await.is_ok());
        assert!(matches!(
            store.validate_model_files().await.unwrap_err(),
            ModelError::InvalidDefinition { .. }
        ));
    }
}

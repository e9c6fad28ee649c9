//! Explorer tree generation.
//!
//! [`TreeGenerator`] turns a resolved object definition plus the property values
//! of one instance into an [`ExplorerTree`]:
//!
//! ```text
//! VM/eastus                    (object, root)
//! ├── Properties.prop          (resource)
//! ├── Health                   (directory)
//! │   └── Dummy.link           (resource)
//! └── Disks                    (association, expanded on demand)
//!     ├── [0..99]              (group)
//!     └── [100..149]           (group)
//! ```
//!
//! Resources and associations are placed under directory nodes built from the
//! segments of their `\`-separated relative paths. Associations with more
//! instances than the group limit are paged into group nodes that materialize
//! their slice only when expanded.
//!
//! Trees registered with [`TreeGenerator::open_tree`] are rebuilt by
//! [`TreeGenerator::reload_all_trees`] after the model caches are dropped.

pub mod display;
pub mod menu;
pub mod node;
pub mod suggestions;

pub use display::object_node_display_name;
pub use menu::{ContextMenu, MenuAction, MenuItem, add_resources_to_context_menu};
pub use node::{
    ExplorerNode, ExplorerTree, InstanceData, NodeId, NodeState, NodeType, ObjectBinding,
    compare_nodes,
};
pub use suggestions::{InMemorySuggestionStore, SuggestionEntry, SuggestionStore};

use dashmap::DashMap;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, trace, warn};

use crate::constants::{DEFAULT_GROUP_LIMIT, TREE_PATH_SEPARATOR};
use crate::core::ModelError;
use crate::model::{ObjectContext, ParsedObjectDefinition, Resource};
use crate::store::ModelStore;
use crate::utils::{join_tree_path, split_tree_path};

/// What to build a tree for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeRequest {
    pub namespace: String,
    pub object_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ObjectContext>,
}

impl TreeRequest {
    pub fn new(namespace: impl Into<String>, object_path: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            object_path: object_path.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: ObjectContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// Handle of a tree registered with [`TreeGenerator::open_tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TreeId(u64);

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tree#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct OpenTree {
    request: TreeRequest,
    tree: ExplorerTree,
}

/// Leaf paths and directory nodes seen while expanding one object node.
///
/// Keys are relative to the object node being expanded.
#[derive(Default)]
struct ExpansionPaths {
    directories: HashMap<String, NodeId>,
    leaves: HashSet<String>,
}

/// Builds and maintains explorer trees over a [`ModelStore`].
pub struct TreeGenerator {
    store: ModelStore,
    suggestions: Arc<dyn SuggestionStore>,
    /// `namespace\objectPath` -> `namespace\objectPath\relativePath.type` of each resource
    resource_index: Arc<DashMap<String, Arc<Vec<String>>>>,
    open_trees: Arc<DashMap<TreeId, OpenTree>>,
    next_tree_id: Arc<AtomicU64>,
    group_limit: usize,
}

impl Clone for TreeGenerator {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            suggestions: Arc::clone(&self.suggestions),
            resource_index: Arc::clone(&self.resource_index),
            open_trees: Arc::clone(&self.open_trees),
            next_tree_id: Arc::clone(&self.next_tree_id),
            group_limit: self.group_limit,
        }
    }
}

impl fmt::Debug for TreeGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeGenerator")
            .field("store", &self.store)
            .field("open_trees", &self.open_trees.len())
            .field("group_limit", &self.group_limit)
            .finish_non_exhaustive()
    }
}

impl TreeGenerator {
    pub fn new(store: ModelStore, suggestions: Arc<dyn SuggestionStore>) -> Self {
        Self {
            store,
            suggestions,
            resource_index: Arc::new(DashMap::new()),
            open_trees: Arc::new(DashMap::new()),
            next_tree_id: Arc::new(AtomicU64::new(1)),
            group_limit: DEFAULT_GROUP_LIMIT,
        }
    }

    /// Page size used by [`TreeGenerator::expand_association_node`] callers that
    /// have no limit of their own. Values below 1 are treated as 1.
    pub fn with_group_limit(mut self, group_limit: usize) -> Self {
        self.group_limit = group_limit.max(1);
        self
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn group_limit(&self) -> usize {
        self.group_limit
    }

    /// Build the tree for `request` with its root expanded.
    ///
    /// # Errors
    ///
    /// - Anything [`ModelStore::get_object_definition`] returns
    /// - [`ModelError::MissingRequiredProp`] when a keyed object has no key value
    /// - [`ModelError::PathConflict`] when the root's resources collide with a directory
    pub async fn generate_tree(&self, request: &TreeRequest) -> Result<ExplorerTree, ModelError> {
        let definition =
            self.store.get_object_definition(&request.namespace, &request.object_path).await?;
        let name = object_node_display_name(&definition, request.context.as_ref(), true)?;
        debug!(
            target: "explorer",
            "Generating tree '{name}' for {}\\{}",
            request.namespace,
            request.object_path
        );

        let namespace = definition.namespace().to_string();
        let mut tree = ExplorerTree::new(
            namespace,
            name,
            ObjectBinding {
                definition,
                context: request.context.clone(),
            },
        );
        let root = tree.root();
        self.expand_object_node(&mut tree, root)?;
        tree.root_node_mut().children_visible = true;
        Ok(tree)
    }

    /// Add a nested object node under `parent` without expanding it.
    ///
    /// # Errors
    ///
    /// [`ModelError::NodeNotFound`] for a foreign `parent`, or
    /// [`ModelError::MissingRequiredProp`] from the display name.
    pub fn attach_object_node(
        &self,
        tree: &mut ExplorerTree,
        parent: NodeId,
        definition: Arc<ParsedObjectDefinition>,
        context: Option<ObjectContext>,
    ) -> Result<NodeId, ModelError> {
        let parent_path = tree.node(parent)?.path.clone();
        let name = object_node_display_name(&definition, context.as_ref(), false)?;
        let path = join_tree_path(&parent_path, &name);
        let binding = tree.add_binding(ObjectBinding {
            definition,
            context,
        });
        tree.add_child(parent, ExplorerNode::new(name, path, NodeType::Object, binding))
    }

    /// Populate an unexpanded object node with its resources, directories and
    /// associations.
    ///
    /// Nodes that are not objects, or are already expanded, are left alone. On
    /// failure the node is restored to its state before the call.
    ///
    /// # Errors
    ///
    /// [`ModelError::PathConflict`] when one path is used for both a directory and
    /// a resource or association.
    pub fn expand_object_node(
        &self,
        tree: &mut ExplorerTree,
        id: NodeId,
    ) -> Result<(), ModelError> {
        let node = tree.node(id)?;
        if node.node_type != NodeType::Object || node.state != NodeState::Unexpanded {
            return Ok(());
        }
        let base_path = node.path.clone();
        let binding_index = node.binding;
        let binding = tree.binding(id)?.clone();

        let checkpoint = tree.checkpoint(id)?;
        tree.node_mut(id)?.state = NodeState::Expanding;

        let built =
            self.build_object_children(tree, id, &base_path, binding_index, &binding.definition);
        if let Err(err) = built {
            tree.rollback(checkpoint);
            return Err(err);
        }
        tree.sort_subtree(id);
        tree.node_mut(id)?.state = NodeState::Expanded;

        if id == tree.root()
            && let Some(context) = &binding.context
        {
            self.register_suggestions(&binding.definition, context);
        }
        self.preload_resource_index(&binding.definition);
        Ok(())
    }

    fn build_object_children(
        &self,
        tree: &mut ExplorerTree,
        object: NodeId,
        base_path: &str,
        binding: usize,
        definition: &ParsedObjectDefinition,
    ) -> Result<(), ModelError> {
        let mut paths = ExpansionPaths::default();

        for resource in definition.explorer_resources() {
            let leaf = LeafPath {
                relative_path: &resource.relative_path,
                kind: &resource.kind,
            };
            let Some((parent, path, name)) =
                attach_directories(tree, object, base_path, leaf, binding, &mut paths)?
            else {
                warn!(
                    target: "explorer",
                    "Skipping resource with empty path in '{}'",
                    definition.path()
                );
                continue;
            };
            let mut node = ExplorerNode::new(name, path, NodeType::Resource, binding);
            node.state = NodeState::Expanded;
            node.resource_key = Some(resource.key());
            tree.add_child(parent, node)?;
        }

        for association in definition.associations() {
            let leaf = LeafPath {
                relative_path: &association.relative_path,
                kind: &association.kind,
            };
            let Some((parent, path, name)) =
                attach_directories(tree, object, base_path, leaf, binding, &mut paths)?
            else {
                warn!(
                    target: "explorer",
                    "Skipping association with empty path in '{}'",
                    definition.path()
                );
                continue;
            };
            let mut node = ExplorerNode::new(name, path, NodeType::Association, binding);
            node.association = Some(association.clone());
            tree.add_child(parent, node)?;
        }

        trace!(
            target: "explorer",
            "Expanded '{}' ({} directories)",
            definition.path(),
            paths.directories.len()
        );
        Ok(())
    }

    /// Materialize the instances behind an association node.
    ///
    /// Up to `group_limit` instances become object nodes directly; beyond that one
    /// collapsed group node is created per page. Each instance map supplies the
    /// required props of one target object; base props are inherited from the
    /// object owning the association.
    ///
    /// # Errors
    ///
    /// Target resolution errors from the store and display-name errors; the node
    /// is left unexpanded.
    pub async fn expand_association_node(
        &self,
        tree: &mut ExplorerTree,
        id: NodeId,
        instances: Vec<BTreeMap<String, String>>,
        group_limit: usize,
    ) -> Result<(), ModelError> {
        let node = tree.node(id)?;
        if node.node_type != NodeType::Association || node.state != NodeState::Unexpanded {
            return Ok(());
        }
        let Some(association) = node.association.clone() else {
            return Ok(());
        };
        let owner = tree.binding(id)?.clone();
        let target = self
            .store
            .get_object_definition(
                association.target_namespace(owner.definition.namespace()),
                &association.associated_object_path,
            )
            .await?;

        let limit = group_limit.max(1);
        let data: InstanceData = Arc::new(instances);
        let checkpoint = tree.checkpoint(id)?;
        tree.node_mut(id)?.state = NodeState::Expanding;

        let result = if data.len() <= limit {
            self.attach_instances(tree, id, &target, owner.context.as_ref(), data.iter())
        } else {
            let mut index = 0;
            loop {
                match generate_association_grouping_node(tree, id, &data, index, limit) {
                    Ok(Some(_)) => index += 1,
                    Ok(None) => break Ok(()),
                    Err(err) => break Err(err),
                }
            }
        };

        if let Err(err) = result {
            tree.rollback(checkpoint);
            return Err(err);
        }

        tree.sort_subtree(id);
        let node = tree.node_mut(id)?;
        node.data_to_group_into = Some(data);
        node.state = NodeState::Expanded;
        debug!(
            target: "explorer",
            "Expanded association '{}' ({} children)",
            node.path,
            node.child_nodes.len()
        );
        Ok(())
    }

    /// Materialize the slice of instances a collapsed group node stands for.
    ///
    /// # Errors
    ///
    /// As [`TreeGenerator::expand_association_node`].
    pub async fn expand_group_node(
        &self,
        tree: &mut ExplorerTree,
        id: NodeId,
        group_limit: usize,
    ) -> Result<(), ModelError> {
        let node = tree.node(id)?;
        let (NodeType::Group, NodeState::Collapsed { bucket }) = (node.node_type, node.state) else {
            return Ok(());
        };
        let (Some(data), Some(association)) =
            (node.data_to_group_into.clone(), node.association.clone())
        else {
            return Ok(());
        };
        let owner = tree.binding(id)?.clone();
        let target = self
            .store
            .get_object_definition(
                association.target_namespace(owner.definition.namespace()),
                &association.associated_object_path,
            )
            .await?;

        let limit = group_limit.max(1);
        let checkpoint = tree.checkpoint(id)?;
        tree.node_mut(id)?.state = NodeState::Expanding;

        let slice = data.iter().skip(bucket.saturating_mul(limit)).take(limit);
        if let Err(err) = self.attach_instances(tree, id, &target, owner.context.as_ref(), slice) {
            tree.rollback(checkpoint);
            return Err(err);
        }

        tree.sort_subtree(id);
        tree.node_mut(id)?.state = NodeState::Expanded;
        Ok(())
    }

    fn attach_instances<'a>(
        &self,
        tree: &mut ExplorerTree,
        parent: NodeId,
        target: &Arc<ParsedObjectDefinition>,
        owner_context: Option<&ObjectContext>,
        instances: impl Iterator<Item = &'a BTreeMap<String, String>>,
    ) -> Result<(), ModelError> {
        let base_props =
            owner_context.map(|ctx| ctx.required_base_props.clone()).unwrap_or_default();
        for instance in instances {
            let context = ObjectContext::new(instance.clone(), base_props.clone());
            self.attach_object_node(tree, parent, Arc::clone(target), Some(context))?;
        }
        Ok(())
    }

    fn register_suggestions(&self, definition: &ParsedObjectDefinition, context: &ObjectContext) {
        let mut seen = HashSet::new();
        let resources =
            definition.explorer_resources().iter().chain(definition.context_menu_resources());

        let mut added = 0;
        for resource in resources.filter(|resource| seen.insert(resource.key())) {
            let entry = SuggestionEntry {
                path: join_tree_path(definition.namespace(), &resource.key()),
                namespace: definition.namespace().to_string(),
                object_path: definition.path().to_string(),
                context: context.clone(),
            };
            if self.suggestions.put_suggestion_if_not_exists(entry) {
                added += 1;
            }
        }
        trace!(target: "explorer", "Registered {added} suggestions for '{}'", definition.path());
    }

    /// Fill the per-object resource index in the background.
    ///
    /// Skipped outside a tokio runtime or when the object is already indexed.
    fn preload_resource_index(&self, definition: &Arc<ParsedObjectDefinition>) {
        let key = object_index_key(definition);
        if self.resource_index.contains_key(&key) {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let index = Arc::clone(&self.resource_index);
        let definition = Arc::clone(definition);
        handle.spawn(async move {
            let entries: Vec<String> = if definition.definition().hide_from_search {
                Vec::new()
            } else {
                definition
                    .resources()
                    .iter()
                    .map(|resource: &Resource| {
                        format!("{key}{TREE_PATH_SEPARATOR}{}", resource.key())
                    })
                    .collect()
            };
            trace!(target: "explorer", "Indexed {} resources for '{key}'", entries.len());
            index.insert(key, Arc::new(entries));
        });
    }

    /// Indexed resource paths of one object, once preloading has run.
    pub fn resource_suggestions(
        &self,
        namespace: &str,
        object_path: &str,
    ) -> Option<Arc<Vec<String>>> {
        let key = join_tree_path(namespace, object_path);
        self.resource_index.get(&key).map(|entry| Arc::clone(entry.value()))
    }

    /// Build a tree and keep it for [`TreeGenerator::reload_all_trees`].
    ///
    /// # Errors
    ///
    /// As [`TreeGenerator::generate_tree`]; nothing is registered.
    pub async fn open_tree(&self, request: TreeRequest) -> Result<TreeId, ModelError> {
        let tree = self.generate_tree(&request).await?;
        let id = TreeId(self.next_tree_id.fetch_add(1, Ordering::Relaxed));
        self.open_trees.insert(
            id,
            OpenTree {
                request,
                tree,
            },
        );
        debug!(target: "explorer", "Opened {id}");
        Ok(id)
    }

    /// Snapshot of an open tree.
    pub fn tree(&self, id: TreeId) -> Option<ExplorerTree> {
        self.open_trees.get(&id).map(|open| open.tree.clone())
    }

    /// Run `f` against an open tree in place.
    pub fn with_tree_mut<R>(
        &self,
        id: TreeId,
        f: impl FnOnce(&mut ExplorerTree) -> R,
    ) -> Option<R> {
        self.open_trees.get_mut(&id).map(|mut open| f(&mut open.tree))
    }

    /// Replace the contents of an open tree, e.g. after expanding a snapshot.
    pub fn update_tree(&self, id: TreeId, tree: ExplorerTree) -> bool {
        match self.open_trees.get_mut(&id) {
            Some(mut open) => {
                open.tree = tree;
                true
            }
            None => false,
        }
    }

    pub fn close_tree(&self, id: TreeId) -> bool {
        self.open_trees.remove(&id).is_some()
    }

    pub fn open_tree_ids(&self) -> Vec<TreeId> {
        let mut ids: Vec<TreeId> = self.open_trees.iter().map(|entry| *entry.key()).collect();
        ids.sort();
        ids
    }

    /// Drop every cache and rebuild every open tree from disk.
    ///
    /// Each tree is regenerated from its original request and keeps the previous
    /// root's `children_visible`. A tree that fails to regenerate keeps its old
    /// contents.
    ///
    /// Returns the number of trees rebuilt.
    ///
    /// # Errors
    ///
    /// The first regeneration error, after every tree has been attempted.
    pub async fn reload_all_trees(&self) -> Result<usize, ModelError> {
        self.suggestions.destroy();
        self.resource_index.clear();
        self.store.clear_object_definition_cache(None);
        self.store.clear_namespace_cache().await;

        let snapshot: Vec<(TreeId, TreeRequest, bool)> = self
            .open_trees
            .iter()
            .map(|open| (*open.key(), open.request.clone(), open.tree.root_node().children_visible))
            .collect();

        let results =
            join_all(snapshot.iter().map(|(_, request, _)| self.generate_tree(request))).await;

        let mut reloaded = 0;
        let mut first_error = None;
        for ((id, request, visible), result) in snapshot.into_iter().zip(results) {
            match result {
                Ok(mut tree) => {
                    tree.root_node_mut().children_visible = visible;
                    if self.update_tree(id, tree) {
                        reloaded += 1;
                    }
                }
                Err(err) => {
                    warn!(
                        target: "explorer",
                        "Failed to reload {id} ({}\\{}): {err}",
                        request.namespace,
                        request.object_path
                    );
                    first_error.get_or_insert(err);
                }
            }
        }

        info!(target: "explorer", "Reloaded {reloaded} trees");
        match first_error {
            Some(err) => Err(err),
            None => Ok(reloaded),
        }
    }
}

/// Create the collapsed group node for page `index` of `data` under `parent`.
///
/// The node is named `[start..end]` with inclusive bounds and shares the
/// association and binding of `parent`. Returns `None` once `index` is past the
/// last page.
///
/// # Errors
///
/// [`ModelError::NodeNotFound`] for a foreign `parent`.
pub fn generate_association_grouping_node(
    tree: &mut ExplorerTree,
    parent: NodeId,
    data: &InstanceData,
    index: usize,
    limit: usize,
) -> Result<Option<NodeId>, ModelError> {
    let limit = limit.max(1);
    let Some(start) = index.checked_mul(limit).filter(|start| *start < data.len()) else {
        return Ok(None);
    };
    let end = start.saturating_add(limit - 1).min(data.len() - 1);

    let parent_node = tree.node(parent)?;
    let name = format!("[{start}..{end}]");
    let mut node = ExplorerNode::new(
        name.clone(),
        join_tree_path(&parent_node.path, &name),
        NodeType::Group,
        parent_node.binding,
    );
    node.association = parent_node.association.clone();
    node.state = NodeState::Collapsed {
        bucket: index,
    };
    node.is_association_group_node = true;
    node.data_to_group_into = Some(Arc::clone(data));
    node.group_index_number = Some(index);

    tree.add_child(parent, node).map(Some)
}

/// Relative path and type of a resource or association.
#[derive(Clone, Copy)]
struct LeafPath<'a> {
    relative_path: &'a str,
    kind: &'a str,
}

/// Create the directory nodes for every folder segment of a leaf and record the
/// leaf.
///
/// Leaves are identified by `relativePath.type`, the same key their node path
/// ends in, so a resource `Health` (`Health.link`) and a folder `Health` do not
/// collide. Returns the parent for the leaf, the leaf's node path and its name,
/// or `None` for an empty path.
fn attach_directories(
    tree: &mut ExplorerTree,
    object: NodeId,
    base_path: &str,
    leaf: LeafPath<'_>,
    binding: usize,
    paths: &mut ExpansionPaths,
) -> Result<Option<(NodeId, String, String)>, ModelError> {
    let segments = split_tree_path(leaf.relative_path);
    let Some((name, folders)) = segments.split_last() else {
        return Ok(None);
    };

    let mut parent = object;
    let mut relative = String::new();
    for folder in folders {
        relative = join_tree_path(&relative, folder);
        if paths.leaves.contains(&relative) {
            return Err(ModelError::PathConflict {
                path: join_tree_path(base_path, &relative),
            });
        }
        parent = match paths.directories.get(&relative) {
            Some(&directory) => directory,
            None => {
                let mut node = ExplorerNode::new(
                    *folder,
                    join_tree_path(base_path, &relative),
                    NodeType::Directory,
                    binding,
                );
                node.state = NodeState::Expanded;
                let directory = tree.add_child(parent, node)?;
                paths.directories.insert(relative.clone(), directory);
                directory
            }
        };
    }

    let key = format!("{}.{}", join_tree_path(&relative, name), leaf.kind);
    if paths.directories.contains_key(&key) {
        return Err(ModelError::PathConflict {
            path: join_tree_path(base_path, &key),
        });
    }
    let path = join_tree_path(base_path, &key);
    paths.leaves.insert(key);
    Ok(Some((parent, path, (*name).to_string())))
}

fn object_index_key(definition: &ParsedObjectDefinition) -> String {
    join_tree_path(definition.namespace(), definition.path())
}

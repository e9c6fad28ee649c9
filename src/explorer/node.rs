//! Explorer node arena.
//!
//! An [`ExplorerTree`] owns every node it creates in a flat `Vec`, addressed by
//! [`NodeId`]. Object nodes register an [`ObjectBinding`] (definition + context)
//! once; the resources, directories and associations beneath them refer to it by
//! index instead of carrying their own copies.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::ModelError;
use crate::model::{Association, ObjectContext, ParsedObjectDefinition};

/// Index of a node within its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Directory,
    Resource,
    Association,
    Object,
    Group,
}

impl NodeType {
    /// Sort rank: resources first, associations last.
    pub const fn sort_rank(self) -> u8 {
        match self {
            Self::Resource => 0,
            Self::Directory | Self::Object | Self::Group => 1,
            Self::Association => 2,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::Resource => "resource",
            Self::Association => "association",
            Self::Object => "object",
            Self::Group => "group",
        }
    }
}

/// Expansion state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeState {
    Unexpanded,
    Expanding,
    Expanded,
    /// A group bucket whose objects are not materialized yet
    Collapsed { bucket: usize },
}

/// Required props of each instance behind an association.
pub type InstanceData = Arc<Vec<BTreeMap<String, String>>>;

/// Definition and context an object node was created with.
#[derive(Debug, Clone)]
pub struct ObjectBinding {
    pub definition: Arc<ParsedObjectDefinition>,
    pub context: Option<ObjectContext>,
}

#[derive(Debug, Clone)]
pub struct ExplorerNode {
    pub name: String,
    /// `\`-joined path from the tree root; unique within the tree
    pub path: String,
    pub node_type: NodeType,
    pub state: NodeState,
    pub parent: Option<NodeId>,
    pub child_nodes: Vec<NodeId>,
    pub children_visible: bool,
    pub is_association_group_node: bool,
    pub data_to_group_into: Option<InstanceData>,
    pub group_index_number: Option<usize>,
    /// Binding of this object node, or of the object it belongs to
    pub binding: usize,
    /// `relativePath.type` of a resource node
    pub resource_key: Option<String>,
    /// Declaration behind an association or group node
    pub association: Option<Association>,
}

impl ExplorerNode {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        node_type: NodeType,
        binding: usize,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            node_type,
            state: NodeState::Unexpanded,
            parent: None,
            child_nodes: Vec::new(),
            children_visible: false,
            is_association_group_node: false,
            data_to_group_into: None,
            group_index_number: None,
            binding,
            resource_key: None,
            association: None,
        }
    }
}

/// Explorer ordering: [`NodeType::sort_rank`], then name ignoring case.
///
/// Group siblings are ordered by bucket instead of name, so `[200..299]` comes
/// before `[1000..1099]`. Groups only share a parent with other groups; should a
/// group meet a directory or object of the same rank, the group sorts after it,
/// which keeps the ordering total.
pub fn compare_nodes(a: &ExplorerNode, b: &ExplorerNode) -> Ordering {
    let bucket = |node: &ExplorerNode| match node.node_type {
        NodeType::Group => Some(node.group_index_number.unwrap_or_default()),
        _ => None,
    };
    a.node_type
        .sort_rank()
        .cmp(&b.node_type.sort_rank())
        .then_with(|| bucket(a).cmp(&bucket(b)))
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
}

/// Position to roll an expansion back to when it fails halfway.
#[derive(Debug, Clone)]
pub(crate) struct Checkpoint {
    nodes: usize,
    bindings: usize,
    node: NodeId,
    children: Vec<NodeId>,
    state: NodeState,
}

/// A tree of explorer nodes rooted at one object.
#[derive(Debug, Clone)]
pub struct ExplorerTree {
    namespace: String,
    nodes: Vec<ExplorerNode>,
    bindings: Vec<ObjectBinding>,
}

impl ExplorerTree {
    /// A tree holding only its root object node.
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        binding: ObjectBinding,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            nodes: vec![ExplorerNode::new(name, "", NodeType::Object, 0)],
            bindings: vec![binding],
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn root_node(&self) -> &ExplorerNode {
        &self.nodes[0]
    }

    pub fn root_node_mut(&mut self) -> &mut ExplorerNode {
        &mut self.nodes[0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// # Errors
    ///
    /// [`ModelError::NodeNotFound`] for an id from another tree.
    pub fn node(&self, id: NodeId) -> Result<&ExplorerNode, ModelError> {
        self.nodes.get(id.0).ok_or(ModelError::NodeNotFound {
            id: id.0,
        })
    }

    /// # Errors
    ///
    /// [`ModelError::NodeNotFound`] for an id from another tree.
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut ExplorerNode, ModelError> {
        self.nodes.get_mut(id.0).ok_or(ModelError::NodeNotFound {
            id: id.0,
        })
    }

    pub fn children(&self, id: NodeId) -> Vec<&ExplorerNode> {
        self.nodes
            .get(id.0)
            .map(|node| {
                node.child_nodes.iter().filter_map(|child| self.nodes.get(child.0)).collect()
            })
            .unwrap_or_default()
    }

    /// The binding a node was created with or belongs to.
    ///
    /// # Errors
    ///
    /// [`ModelError::NodeNotFound`] for an id from another tree.
    pub fn binding(&self, id: NodeId) -> Result<&ObjectBinding, ModelError> {
        let node = self.node(id)?;
        self.bindings.get(node.binding).ok_or(ModelError::NodeNotFound {
            id: id.0,
        })
    }

    pub fn find_by_path(&self, path: &str) -> Option<NodeId> {
        self.nodes.iter().position(|node| node.path == path).map(NodeId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &ExplorerNode)> {
        self.nodes.iter().enumerate().map(|(i, node)| (NodeId(i), node))
    }

    pub(crate) fn add_binding(&mut self, binding: ObjectBinding) -> usize {
        self.bindings.push(binding);
        self.bindings.len() - 1
    }

    /// Append `node` as the last child of `parent`.
    pub(crate) fn add_child(
        &mut self,
        parent: NodeId,
        mut node: ExplorerNode,
    ) -> Result<NodeId, ModelError> {
        self.node(parent)?;
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent.0].child_nodes.push(id);
        Ok(id)
    }

    /// Sort the children of `id` and of every descendant.
    pub(crate) fn sort_subtree(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            let Some(node) = self.nodes.get(current.0) else {
                continue;
            };
            let mut children = node.child_nodes.clone();
            children.sort_by(|a, b| compare_nodes(&self.nodes[a.0], &self.nodes[b.0]));
            pending.extend(children.iter().copied());
            self.nodes[current.0].child_nodes = children;
        }
    }

    pub(crate) fn checkpoint(&self, id: NodeId) -> Result<Checkpoint, ModelError> {
        let node = self.node(id)?;
        Ok(Checkpoint {
            nodes: self.nodes.len(),
            bindings: self.bindings.len(),
            node: id,
            children: node.child_nodes.clone(),
            state: node.state,
        })
    }

    /// Drop everything added since `checkpoint`.
    pub(crate) fn rollback(&mut self, checkpoint: Checkpoint) {
        self.nodes.truncate(checkpoint.nodes);
        self.bindings.truncate(checkpoint.bindings);
        if let Some(node) = self.nodes.get_mut(checkpoint.node.0) {
            node.child_nodes = checkpoint.children;
            node.state = checkpoint.state;
        }
    }

    /// Nested JSON rendering of the tree.
    pub fn to_json(&self) -> Value {
        self.node_to_json(self.root())
    }

    fn node_to_json(&self, id: NodeId) -> Value {
        let node = &self.nodes[id.0];
        let mut value = json!({
            "name": node.name,
            "path": node.path,
            "type": node.node_type,
            "state": node.state,
            "childrenVisible": node.children_visible,
        });

        if let Some(key) = &node.resource_key {
            value["resource"] = json!(key);
        }
        if let Some(association) = &node.association {
            value["associatedObjectPath"] = json!(association.associated_object_path);
        }
        if node.is_association_group_node {
            value["groupIndexNumber"] = json!(node.group_index_number);
        }
        if !node.child_nodes.is_empty() {
            let children = node.child_nodes.iter().map(|child| self.node_to_json(*child));
            value["children"] = Value::Array(children.collect());
        }
        value
    }
}

//! Declared model types.
//!
//! These types mirror the JSON documents found in a model repository:
//! `namespaceConfig.json` files deserialize into [`NamespaceConfig`], object
//! files (after split-file merging) into [`ObjectDefinition`]. Field names on
//! disk are camelCase. Provider-specific fields that this crate does not
//! interpret are kept in `extra` maps so nothing a provider needs is lost.
//!
//! [`ParsedObjectDefinition`] is the validated, immutable view the store caches
//! and the explorer consumes. [`ObjectContext`] carries the concrete property
//! values of one object instance and is never cached with the model.

mod parsed;

pub use parsed::ParsedObjectDefinition;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::constants::{
    DEFAULT_ASSOCIATION_TYPE, DEFAULT_OBJECT_ROOT, PROPERTIES_RESOURCE_NAME,
    PROPERTIES_RESOURCE_TYPE,
};

fn default_object_root() -> String {
    DEFAULT_OBJECT_ROOT.to_string()
}

fn default_association_type() -> String {
    DEFAULT_ASSOCIATION_TYPE.to_string()
}

/// A named collection of object definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceConfig {
    /// Unique namespace name
    pub name: String,
    /// Folder (relative to the config file) holding this namespace's objects
    #[serde(default = "default_object_root")]
    pub object_root: String,
    /// Properties every object in the namespace is instantiated with
    #[serde(default)]
    pub required_base_props: Vec<RequiredBaseProp>,
    /// Named resource profiles resources can refer to
    #[serde(default)]
    pub resource_profiles: Vec<ResourceProfile>,
}

/// A property shared by every object of a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredBaseProp {
    /// Property name, used as `{name}` in templates
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// Named provider settings referenced by resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceProfile {
    pub name: String,
    /// Provider kind, e.g. `link` or `powershell`
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A declared kind of entity, as merged from its base file and companions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDefinition {
    /// Owning namespace; filled in from the folder when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Object path, unique within the namespace
    pub path: String,
    /// Required prop identifying instances; absent for global objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub required_props: Vec<String>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub associations: Vec<Association>,
    #[serde(default)]
    pub additional_props: Vec<AdditionalProp>,
    /// Root data provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constructor: Option<Constructor>,
    /// Template for the explorer node name, e.g. `VM {Region}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub disable_pathless_search: bool,
    #[serde(default)]
    pub hide_from_search: bool,
}

/// A child item of an object shown in the explorer or its context menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// `\`-separated path; intermediate segments become directory nodes
    pub relative_path: String,
    /// Resource provider kind, e.g. `link`, `prop`
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default)]
    pub hide_in_explorer: bool,
    #[serde(default)]
    pub show_in_context_menu: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource {
    /// Create a plain explorer resource.
    pub fn new(relative_path: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            kind: kind.into(),
            profile: None,
            hide_in_explorer: false,
            show_in_context_menu: false,
            description: None,
            extra: Map::new(),
        }
    }

    /// The synthesized `Properties` resource every parsed object carries.
    pub fn properties() -> Self {
        let mut resource = Self::new(PROPERTIES_RESOURCE_NAME, PROPERTIES_RESOURCE_TYPE);
        resource.show_in_context_menu = true;
        resource
    }

    /// `relativePath.type`, the identity used for duplicate checks and lookups.
    pub fn key(&self) -> String {
        format!("{}.{}", self.relative_path, self.kind)
    }
}

/// A declared link from one object definition to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Association {
    pub relative_path: String,
    pub associated_object_path: String,
    /// Target namespace; the owning namespace when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub associated_namespace: Option<String>,
    #[serde(rename = "type", default = "default_association_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Association {
    /// Namespace the target is resolved in.
    pub fn target_namespace<'a>(&'a self, owner: &'a str) -> &'a str {
        self.associated_namespace.as_deref().unwrap_or(owner)
    }

    /// `relativePath.type`
    pub fn key(&self) -> String {
        format!("{}.{}", self.relative_path, self.kind)
    }
}

/// Extra property computed by a data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditionalProp {
    pub name: String,
    /// Data provider kind; `constant` values live in the JSON itself
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Root data provider of an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constructor {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Concrete property values instantiating one object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectContext {
    #[serde(default)]
    pub required_props: BTreeMap<String, String>,
    #[serde(default)]
    pub required_base_props: BTreeMap<String, String>,
}

impl ObjectContext {
    pub fn new(
        required_props: BTreeMap<String, String>,
        required_base_props: BTreeMap<String, String>,
    ) -> Self {
        Self {
            required_props,
            required_base_props,
        }
    }

    /// Builder-style helper for a single required prop.
    pub fn with_prop(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.required_props.insert(name.into(), value.into());
        self
    }

    /// Builder-style helper for a single required base prop.
    pub fn with_base_prop(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.required_base_props.insert(name.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.required_props.is_empty() && self.required_base_props.is_empty()
    }
}

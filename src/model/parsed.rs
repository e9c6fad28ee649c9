use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use serde::Serialize;

use super::{Association, ObjectDefinition, Resource};
use crate::constants::{PROPERTIES_RESOURCE_NAME, PROPERTIES_RESOURCE_TYPE};
use crate::core::ModelError;

/// Validated, immutable view over a merged [`ObjectDefinition`].
///
/// Resources are split into the ones rendered inline in the explorer and the
/// ones offered on the object's context menu, and indexed by relative path and
/// by `relativePath.type`. A `Properties` resource of type `prop` is always
/// present.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedObjectDefinition {
    namespace: String,
    definition: ObjectDefinition,
    explorer_resources: Vec<Resource>,
    context_menu_resources: Vec<Resource>,
    #[serde(skip)]
    by_relative_path: BTreeMap<String, Vec<usize>>,
    #[serde(skip)]
    by_key: BTreeMap<String, usize>,
    #[serde(skip)]
    files: Vec<PathBuf>,
}

impl ParsedObjectDefinition {
    /// Validate `definition` as a member of `namespace` and build the lookup view.
    ///
    /// # Errors
    ///
    /// - [`ModelError::ObjectKeyNotInRequiredProps`] when `key` is not a required prop
    /// - [`ModelError::InvalidDefinition`] when the definition names another namespace
    ///   or has an empty path
    /// - [`ModelError::DuplicateEntry`] when two resources share `relativePath.type`
    pub fn parse(
        mut definition: ObjectDefinition,
        namespace: &str,
        files: Vec<PathBuf>,
    ) -> Result<Self, ModelError> {
        let origin = files
            .first()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| definition.path.clone());

        if definition.path.trim().is_empty() {
            return Err(ModelError::InvalidDefinition {
                file: origin,
                reason: "object 'path' must not be empty".to_string(),
            });
        }

        match &definition.namespace {
            Some(declared) if declared != namespace => {
                return Err(ModelError::InvalidDefinition {
                    file: origin,
                    reason: format!(
                        "object declares namespace '{declared}' but lives under namespace '{namespace}'"
                    ),
                });
            }
            Some(_) => {}
            None => definition.namespace = Some(namespace.to_string()),
        }

        if let Some(key) = &definition.key
            && !definition.required_props.iter().any(|p| p == key)
        {
            return Err(ModelError::ObjectKeyNotInRequiredProps {
                path: definition.path.clone(),
                key: key.clone(),
            });
        }

        let has_properties = definition.resources.iter().any(|r| {
            r.relative_path == PROPERTIES_RESOURCE_NAME && r.kind == PROPERTIES_RESOURCE_TYPE
        });
        if !has_properties {
            definition.resources.push(Resource::properties());
        }

        let mut by_relative_path: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut by_key = BTreeMap::new();
        for (index, resource) in definition.resources.iter().enumerate() {
            if by_key.insert(resource.key(), index).is_some() {
                return Err(ModelError::DuplicateEntry {
                    kind: "resource".to_string(),
                    value: resource.key(),
                    file: origin,
                });
            }
            by_relative_path.entry(resource.relative_path.clone()).or_default().push(index);
        }

        let mut seen_associations = HashSet::new();
        for association in &definition.associations {
            if !seen_associations.insert(association.key()) {
                return Err(ModelError::DuplicateEntry {
                    kind: "association".to_string(),
                    value: association.key(),
                    file: origin,
                });
            }
        }

        let explorer_resources =
            definition.resources.iter().filter(|r| !r.hide_in_explorer).cloned().collect();
        let context_menu_resources =
            definition.resources.iter().filter(|r| r.show_in_context_menu).cloned().collect();

        Ok(Self {
            namespace: namespace.to_string(),
            definition,
            explorer_resources,
            context_menu_resources,
            by_relative_path,
            by_key,
            files,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &str {
        &self.definition.path
    }

    pub fn key(&self) -> Option<&str> {
        self.definition.key.as_deref()
    }

    /// True for singleton objects (no `key`).
    pub fn is_global(&self) -> bool {
        self.definition.key.is_none()
    }

    pub fn definition(&self) -> &ObjectDefinition {
        &self.definition
    }

    pub fn required_props(&self) -> &[String] {
        &self.definition.required_props
    }

    pub fn associations(&self) -> &[Association] {
        &self.definition.associations
    }

    pub fn display_name(&self) -> Option<&str> {
        self.definition.display_name.as_deref()
    }

    pub fn explorer_resources(&self) -> &[Resource] {
        &self.explorer_resources
    }

    pub fn context_menu_resources(&self) -> &[Resource] {
        &self.context_menu_resources
    }

    /// All resources, in declaration order, including `Properties`.
    pub fn resources(&self) -> &[Resource] {
        &self.definition.resources
    }

    /// Resources declared at `relative_path`, any type.
    pub fn resources_at(&self, relative_path: &str) -> Vec<&Resource> {
        self.by_relative_path
            .get(relative_path)
            .map(|indices| indices.iter().map(|&i| &self.definition.resources[i]).collect())
            .unwrap_or_default()
    }

    /// Resource identified by `relativePath.type`.
    pub fn resource_by_key(&self, key: &str) -> Option<&Resource> {
        self.by_key.get(key).map(|&i| &self.definition.resources[i])
    }

    /// Base file first, then merged companions.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

//! Split-JSON loading.
//!
//! A document is read from its base file, every companion found by
//! [`FileSet::list_split_files`] is read concurrently, each file passes through the
//! [`ProtectionValidator`], and the companions are merged into the base one at a
//! time in path order.
//!
//! # Merge Rules
//!
//! For every key of a companion:
//!
//! - absent in the base: copied as-is
//! - both arrays: rejected if any companion entry duplicates a base entry, else
//!   appended
//! - both objects: merged recursively
//! - both scalars of the same JSON kind: the companion wins
//! - anything else: [`ModelError::MergeConflict`]
//!
//! Two array entries are duplicates when they are objects with equal `name`, objects
//! with equal `relativePath.type` (a missing `type` compares as empty), or equal
//! primitives.

use futures::future::join_all;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::core::ModelError;
use crate::core::file_error::{FileOperation, FileOperationContext, read_with_context};
use crate::fileset::FileSet;
use crate::protection::ProtectionValidator;

pub use crate::protection::DocumentKind;

/// How protection failures are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadMode {
    /// Strip offending declarations, log, and keep going
    #[default]
    Lenient,
    /// Fail the load on the first offending file
    Strict,
}

/// A base document with its companions merged in.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedDocument {
    pub value: Value,
    /// Base file first, then each merged companion
    pub associated_paths: Vec<PathBuf>,
}

/// Load `base_path` and merge its companions into it.
///
/// # Errors
///
/// - [`ModelError::FileAccess`] when any file cannot be read
/// - [`ModelError::InvalidDefinition`] when any file is not valid JSON
/// - [`ModelError::ProtectionViolation`] in strict mode, for the first file that
///   declares protected entries
/// - [`ModelError::MergeConflict`] / [`ModelError::DuplicateEntry`] from merging
pub async fn load_merged(
    fileset: &FileSet,
    base_path: &Path,
    kind: DocumentKind,
    mode: LoadMode,
    validator: &ProtectionValidator,
) -> Result<MergedDocument, ModelError> {
    let companions = fileset.list_split_files(base_path);
    debug!(
        target: "model::loader",
        "Loading {} with {} companion(s)",
        base_path.display(),
        companions.len()
    );

    let (base, companion_docs) = tokio::join!(
        read_document(base_path, None, kind, mode, validator),
        join_all(
            companions
                .iter()
                .map(|path| read_document(path, Some(base_path), kind, mode, validator))
        )
    );

    let mut value = base?;
    let mut associated_paths = Vec::with_capacity(companions.len() + 1);
    associated_paths.push(base_path.to_path_buf());

    for (path, doc) in companions.into_iter().zip(companion_docs) {
        merge_values(&mut value, doc?, &path.display().to_string())?;
        associated_paths.push(path);
    }

    Ok(MergedDocument {
        value,
        associated_paths,
    })
}

/// Merge `companion` into `base` in place. `file` names the companion in errors.
///
/// # Errors
///
/// Returns [`ModelError::DuplicateEntry`] for a repeated array entry and
/// [`ModelError::MergeConflict`] when the two sides disagree on a property's kind.
pub fn merge_values(base: &mut Value, companion: Value, file: &str) -> Result<(), ModelError> {
    merge_at(base, companion, "", file)
}

fn merge_at(
    base: &mut Value,
    companion: Value,
    property: &str,
    file: &str,
) -> Result<(), ModelError> {
    match (base, companion) {
        (Value::Object(base_map), Value::Object(companion_map)) => {
            merge_maps(base_map, companion_map, property, file)
        }
        (Value::Array(base_items), Value::Array(companion_items)) => {
            if let Some(value) = find_duplicate(base_items, &companion_items) {
                return Err(ModelError::DuplicateEntry {
                    kind: property_label(property),
                    value,
                    file: file.to_string(),
                });
            }
            base_items.extend(companion_items);
            Ok(())
        }
        (slot, value) => {
            // Objects and arrays were handled above, so equal discriminants mean
            // two scalars of the same kind.
            if std::mem::discriminant(&*slot) == std::mem::discriminant(&value) {
                *slot = value;
                Ok(())
            } else {
                Err(ModelError::MergeConflict {
                    property: property_label(property),
                    file: file.to_string(),
                })
            }
        }
    }
}

fn merge_maps(
    base: &mut Map<String, Value>,
    companion: Map<String, Value>,
    property: &str,
    file: &str,
) -> Result<(), ModelError> {
    for (key, value) in companion {
        let path = if property.is_empty() { key.clone() } else { format!("{property}.{key}") };
        match base.get_mut(&key) {
            Some(existing) => merge_at(existing, value, &path, file)?,
            None => {
                base.insert(key, value);
            }
        }
    }
    Ok(())
}

/// The identity of the first companion entry that duplicates a base entry.
fn find_duplicate(base: &[Value], companion: &[Value]) -> Option<String> {
    companion
        .iter()
        .find_map(|incoming| {
            base.iter().find_map(|existing| duplicate_identity(existing, incoming))
        })
}

fn duplicate_identity(a: &Value, b: &Value) -> Option<String> {
    match (a, b) {
        (Value::Object(a), Value::Object(b)) => {
            if let (Some(x), Some(y)) = (a.get("name"), b.get("name"))
                && x == y
            {
                return Some(scalar_text(x));
            }
            if let (Some(x), Some(y)) = (a.get("relativePath"), b.get("relativePath")) {
                let left = entry_key(x, a.get("type"));
                let right = entry_key(y, b.get("type"));
                if left == right {
                    return Some(right);
                }
            }
            None
        }
        (Value::Object(_) | Value::Array(_), _) | (_, Value::Object(_) | Value::Array(_)) => None,
        (a, b) if a == b => Some(scalar_text(a)),
        _ => None,
    }
}

fn entry_key(relative_path: &Value, kind: Option<&Value>) -> String {
    format!("{}.{}", scalar_text(relative_path), kind.map(scalar_text).unwrap_or_default())
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn property_label(property: &str) -> String {
    if property.is_empty() { "<document>".to_string() } else { property.to_string() }
}

/// Read, parse and protection-check one file; `base` is set for companions.
async fn read_document(
    path: &Path,
    base: Option<&Path>,
    kind: DocumentKind,
    mode: LoadMode,
    validator: &ProtectionValidator,
) -> Result<Value, ModelError> {
    let purpose = match kind {
        DocumentKind::NamespaceConfig => "loading namespace config",
        DocumentKind::ObjectDefinition => "loading object definition",
    };
    let mut context =
        FileOperationContext::new(FileOperation::Read, path, purpose, "loader::load_merged");
    if let Some(base) = base {
        context = context.with_related_path(base);
    }
    let content = read_with_context(context).await?;
    let mut value: Value =
        serde_json::from_str(&content).map_err(|e| ModelError::InvalidDefinition {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;

    let report = validator.validate(&mut value, path, kind);
    if !report.is_ok() {
        match mode {
            LoadMode::Strict => {
                return Err(ModelError::ProtectionViolation {
                    file: path.display().to_string(),
                    message: report.message(),
                });
            }
            LoadMode::Lenient => {
                warn!(
                    target: "model::loader",
                    "Ignoring protected declarations in {}:\n{}",
                    path.display(),
                    report.message()
                );
            }
        }
    }
    Ok(value)
}

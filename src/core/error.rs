//! Error handling for modelex
//!
//! This module provides the error types and user-facing error reporting for model
//! resolution and explorer tree generation. The error system follows two rules:
//! 1. **Strongly-typed errors** for precise handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`ModelError`] - Closed set of failure kinds for model loading and tree building
//! - [`ErrorContext`] - Wrapper that adds suggestions and details for display
//!
//! # Error Categories
//!
//! - **Integrity**: [`ModelError::DuplicateNamespace`], [`ModelError::DuplicateObjectPath`],
//!   [`ModelError::ObjectKeyNotInRequiredProps`], [`ModelError::AssociationTargetNotFound`].
//!   Fatal to the load that hit them, even in lenient mode; the affected cache segment
//!   is left empty.
//! - **Merge**: [`ModelError::DuplicateEntry`], [`ModelError::MergeConflict`]. Fatal to
//!   the one document being merged; lenient loads skip that document.
//! - **Protection**: [`ModelError::ProtectionViolation`]. Only raised in strict mode;
//!   lenient loads strip the offending declarations and log instead.
//! - **I/O**: [`ModelError::FileAccess`], [`ModelError::InvalidDefinition`]. Per-file,
//!   collected and skipped by lenient loads.
//! - **Not found**: [`ModelError::NamespaceNotFound`], [`ModelError::ObjectNotFound`],
//!   [`ModelError::ResourceProfileNotFound`], [`ModelError::NodeNotFound`].
//! - **Catastrophic**: [`ModelError::NoNamespacesFound`]. The store wipes the local
//!   clone of the model repository when it sees this.
//!
//! # Examples
//!
//! ```rust,no_run
//! use modelex::core::{ModelError, user_friendly_error};
//!
//! let error = ModelError::NamespaceNotFound {
//!     name: "Compute".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::file_error::FileOperationError;

/// The main error type for model resolution and tree generation.
///
/// Every variant carries the names and paths needed to act on the failure.
/// File errors are shared behind an `Arc` so the type stays cheap to clone into
/// an [`ErrorContext`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Two namespace configs declare the same `name`
    #[error("Duplicate namespace '{name}' declared in {first} and {second}")]
    DuplicateNamespace {
        /// The duplicated namespace name
        name: String,
        /// File that declared the namespace first
        first: String,
        /// File that declared it again
        second: String,
    },

    /// Two object definitions in one namespace declare the same `path`
    #[error("Duplicate object path '{path}' in namespace '{namespace}' ({first} and {second})")]
    DuplicateObjectPath {
        /// Namespace being loaded
        namespace: String,
        /// The duplicated object path
        path: String,
        /// File that declared the path first
        first: String,
        /// File that declared it again
        second: String,
    },

    /// An object declares a `key` that is not one of its `requiredProps`
    #[error("Object key '{key}' not found in requiredProps of object '{path}'")]
    ObjectKeyNotInRequiredProps {
        /// Object path
        path: String,
        /// The declared key
        key: String,
    },

    /// The model root contains no namespace configs at all
    #[error("No namespaces found under {root}")]
    NoNamespacesFound {
        /// The model root that was searched
        root: String,
    },

    /// An association points at an object that does not exist
    #[error(
        "Association target '{target_namespace}/{target}' not found (declared by '{namespace}/{object}')"
    )]
    AssociationTargetNotFound {
        /// Namespace of the declaring object
        namespace: String,
        /// Declaring object path
        object: String,
        /// Namespace the target was looked up in
        target_namespace: String,
        /// The associated object path that failed to resolve
        target: String,
    },

    /// A split file disagrees with its base file on the type of a property
    #[error("conflicting resource on property {property} in {file}")]
    MergeConflict {
        /// Property path where the conflict was found
        property: String,
        /// Companion file that introduced the conflict
        file: String,
    },

    /// A split file repeats an entry the base file already declares
    #[error("Duplicated {kind} '{value}' in {file}")]
    DuplicateEntry {
        /// What was duplicated (resource, additionalProp, requiredProp)
        kind: String,
        /// Identifying value of the duplicate
        value: String,
        /// Companion file that repeated the entry
        file: String,
    },

    /// Protected declarations found in an unprotected file (strict mode only)
    #[error("Protected declarations in unprotected file {file}:\n{message}")]
    ProtectionViolation {
        /// Offending file
        file: String,
        /// One failure per line
        message: String,
    },

    /// Requested namespace is unknown
    #[error("Namespace '{name}' not found")]
    NamespaceNotFound {
        /// Requested name
        name: String,
    },

    /// Requested object path is unknown in its namespace
    #[error("Object not found: '{path}' in namespace '{namespace}'")]
    ObjectNotFound {
        /// Namespace searched
        namespace: String,
        /// Requested object path
        path: String,
        /// Most similar known path, if any is close
        closest: Option<String>,
    },

    /// Requested resource profile is unknown
    #[error("Resource profile '{profile}' not found in namespace '{namespace}'")]
    ResourceProfileNotFound {
        /// Namespace searched
        namespace: String,
        /// Requested profile name
        profile: String,
    },

    /// A tree path is used for both a directory and a leaf
    #[error("Same path specified for resource and directory: {path}")]
    PathConflict {
        /// The contested tree path
        path: String,
    },

    /// A keyed object was instantiated without a value for its key
    #[error("Required property '{prop}' missing for object '{path}'")]
    MissingRequiredProp {
        /// Object path
        path: String,
        /// Missing property name
        prop: String,
    },

    /// A file could not be parsed as the expected document
    #[error("Invalid definition in {file}: {reason}")]
    InvalidDefinition {
        /// Offending file
        file: String,
        /// Parser or schema message
        reason: String,
    },

    /// A node id does not belong to the tree it was used with
    #[error("Explorer node {id} not found")]
    NodeNotFound {
        /// The stale id
        id: usize,
    },

    /// Configuration problem
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Error message
        message: String,
    },

    /// File system access failed
    #[error("Failed {} {}: {}", .0.operation, .0.file_path.display(), .0.source)]
    FileAccess(Arc<FileOperationError>),
}

impl From<FileOperationError> for ModelError {
    fn from(err: FileOperationError) -> Self {
        Self::FileAccess(Arc::new(err))
    }
}

impl ModelError {
    /// Integrity failures are fatal to the load that raised them regardless of mode.
    pub const fn is_integrity_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateNamespace { .. }
                | Self::DuplicateObjectPath { .. }
                | Self::ObjectKeyNotInRequiredProps { .. }
                | Self::AssociationTargetNotFound { .. }
                | Self::NoNamespacesFound { .. }
        )
    }
}

/// Error context wrapper that provides user-friendly error information.
///
/// Pairs a [`ModelError`] with an optional suggestion and optional details.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: ModelError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: ModelError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error (shown in green).
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error (shown in yellow).
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error context to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`].
///
/// Recognizes [`ModelError`] anywhere in an `anyhow` chain; file errors come
/// through [`ModelError::FileAccess`] with their purpose, caller and related
/// paths as details. Anything else is reported as a configuration error carrying
/// the full `anyhow` chain.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(ctx) = error.downcast_ref::<ErrorContext>() {
        return ErrorContext {
            error: ctx.error.clone(),
            suggestion: ctx.suggestion.clone(),
            details: ctx.details.clone(),
        };
    }

    for cause in error.chain() {
        if let Some(model_error) = cause.downcast_ref::<ModelError>() {
            return create_error_context(model_error.clone());
        }
    }

    let context = ErrorContext::new(ModelError::ConfigError {
        message: format!("{error:#}"),
    });
    if error.chain().any(|cause| cause.is::<std::io::Error>()) {
        return context
            .with_suggestion("Check that the configuration file and model root are readable");
    }
    context
}

fn create_error_context(error: ModelError) -> ErrorContext {
    match &error {
        ModelError::DuplicateNamespace { name, .. } => {
            let suggestion = format!(
                "Rename one of the namespaces called '{name}' or merge them into one config"
            );
            ErrorContext::new(error)
                .with_suggestion(suggestion)
                .with_details("Namespace names must be unique across the whole model repository")
        }
        ModelError::DuplicateObjectPath { .. } => ErrorContext::new(error)
            .with_suggestion("Give each object definition a unique 'path' inside its namespace")
            .with_details(
                "Split companions (Name.<token>.json) are merged into their base file \
                 and must not redeclare the path",
            ),
        ModelError::ObjectKeyNotInRequiredProps { key, .. } => {
            let suggestion = format!(
                "Add '{key}' to requiredProps or remove the 'key' field to make the object global"
            );
            ErrorContext::new(error).with_suggestion(suggestion)
        }
        ModelError::NoNamespacesFound { .. } => ErrorContext::new(error)
            .with_suggestion(
                "Point --model-root at a directory containing namespaceConfig.json files",
            )
            .with_details(
                "An empty model repository is treated as corrupt local state; \
                 the configured local clone is removed so the next sync re-clones it",
            ),
        ModelError::AssociationTargetNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Check associatedObjectPath and associatedNamespace for typos"),
        ModelError::MergeConflict { .. } | ModelError::DuplicateEntry { .. } => {
            ErrorContext::new(error).with_details(
                "Split files are merged key by key into their base file; \
                 arrays are concatenated and scalars overwritten",
            )
        }
        ModelError::ProtectionViolation { .. } => ErrorContext::new(error)
            .with_suggestion(
                "Move the declarations into the ProtectedModels folder or use unprotected providers",
            )
            .with_details("enableProtectedResourceValidation is on for this model repository"),
        ModelError::NamespaceNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Run 'modelex namespaces' to list the namespaces that loaded"),
        ModelError::ObjectNotFound { namespace, closest, .. } => {
            let suggestion = match closest {
                Some(closest) => format!("Did you mean '{closest}'?"),
                None => format!("Run 'modelex objects {namespace}' to list the object paths"),
            };
            ErrorContext::new(error).with_suggestion(suggestion)
        }
        ModelError::MissingRequiredProp { prop, .. } => {
            let suggestion = format!("Pass a value with --prop {prop}=<value>");
            ErrorContext::new(error).with_suggestion(suggestion)
        }
        ModelError::FileAccess(file_error) => {
            let details = file_error.user_message();
            ErrorContext::new(error).with_details(details)
        }
        ModelError::ConfigError { .. } => ErrorContext::new(error)
            .with_suggestion("Check the configuration file passed with --config or MODELEX_CONFIG"),
        _ => ErrorContext::new(error),
    }
}

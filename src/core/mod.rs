//! Core types for modelex
//!
//! This module holds the error vocabulary shared by every other module:
//!
//! - [`ModelError`] - the closed set of failure kinds raised while resolving the model
//!   and building explorer trees
//! - [`ErrorContext`] / [`user_friendly_error`] - CLI presentation of any error with
//!   suggestions and details
//! - [`file_error`] - I/O failures annotated with operation, path and purpose
//!
//! Library operations return `Result<T, ModelError>`; the CLI works in
//! `anyhow::Result` and converts at the edge with [`user_friendly_error`].

pub mod error;
pub mod file_error;

pub use error::{ErrorContext, ModelError, user_friendly_error};
pub use file_error::{FileOperation, FileOperationContext, FileOperationError, FileResultExt};

/// Result alias used throughout the library
pub type Result<T, E = ModelError> = std::result::Result<T, E>;

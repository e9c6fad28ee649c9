//! modelex - split-file JSON object models and explorer trees
//!
//! A model repository is a directory tree of JSON documents describing kinds of
//! objects, grouped into namespaces:
//!
//! ```text
//! models/
//! ├── Compute/
//! │   ├── namespaceConfig.json        { "name": "Compute", ... }
//! │   └── Objects/
//! │       ├── VM.json                 base definition
//! │       └── VM.health.json          companion merged into VM.json
//! └── ProtectedModels/
//!     └── Compute/Objects/VM.scripts.json
//! ```
//!
//! Object definitions may be split across a base file and any number of
//! companions named `<stem>.<token>.json`. Files under `ProtectedModels` are
//! companions of the regular tree that are allowed to declare protected
//! providers; outside it such declarations are stripped (or rejected in strict
//! mode).
//!
//! # Modules
//!
//! ## Model resolution
//! - [`fileset`] - snapshot of the JSON files under a root, base/companion pairing
//! - [`loader`] - reading and merging a base file with its companions
//! - [`protection`] - rejecting protected providers outside `ProtectedModels`
//! - [`store`] - [`store::ModelStore`], the cached resolver for namespaces,
//!   object definitions and resource profiles
//! - [`model`] - the declared JSON types and the parsed object view
//!
//! ## Explorer
//! - [`explorer`] - [`explorer::TreeGenerator`] builds explorer trees, groups large
//!   associations, builds context menus and registers suggestions
//!
//! ## Supporting modules
//! - [`cli`] - the `modelex` command line
//! - [`config`] - settings lookup and the TOML configuration file
//! - [`constants`] - file names, folder names and setting names
//! - [`core`] - [`core::ModelError`] and user-facing error reporting
//! - [`utils`] - tree-path and template helpers
//!
//! # Example
//!
//! ```rust,no_run
//! use modelex::config::StaticSettings;
//! use modelex::explorer::{InMemorySuggestionStore, TreeGenerator, TreeRequest};
//! use modelex::model::ObjectContext;
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
//! let generator = TreeGenerator::new(store, Arc::new(InMemorySuggestionStore::new()));
//!
//! let request = TreeRequest::new("Compute", "VM")
//!     .with_context(ObjectContext::default().with_prop("Region", "eastus"));
//! let tree = generator.generate_tree(&request).await?;
//! assert_eq!(tree.root_node().name, "VM/eastus");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod explorer;
pub mod fileset;
pub mod loader;
pub mod model;
pub mod protection;
pub mod store;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

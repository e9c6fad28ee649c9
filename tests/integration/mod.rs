//! Integration test suite for modelex
//!
//! End-to-end tests that run the `modelex` binary against model repositories
//! built in temporary directories.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! - **cli**: `validate`, `namespaces`, `objects` and `tree` output and exit codes
//! - **protection**: protected-provider handling through the CLI and the store
//! - **reload**: open trees surviving edits to the model repository

#[path = "../common/mod.rs"]
mod common;

mod cli;
mod protection;
mod reload;

//! Unit test suite for modelex
//!
//! Tests of the public library API that need a model repository on disk but
//! not the `modelex` binary.
//!
//! ```bash
//! cargo test --test unit
//! ```
//!
//! - **fileset**: base/companion pairing and the protected tree
//! - **merge**: split-file merge rules
//! - **store**: caching, invalidation and integrity checks of `ModelStore`

#[path = "../common/mod.rs"]
mod common;

mod fileset;
mod merge;
mod store;

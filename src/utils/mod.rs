//! Small helpers shared by the loader, the store and the explorer.
//!
//! - [`paths`] - explorer path joining/splitting and directory removal
//! - [`template`] - `{prop}` substitution used for display names

pub mod paths;
pub mod template;

pub use paths::{join_tree_path, remove_dir_all, split_tree_path};
pub use template::expand_template;

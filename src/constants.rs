//! Names and limits used across the modelex codebase.
//!
//! File names and folder names here describe the on-disk layout of a model
//! repository; setting names are the keys looked up through
//! [`crate::config::SettingsProvider`].

/// File name of a namespace config.
pub const NAMESPACE_CONFIG_FILE: &str = "namespaceConfig.json";

/// Default folder, relative to a namespace config, holding its object files.
pub const DEFAULT_OBJECT_ROOT: &str = "Objects";

/// Top-level folder whose contents are exempt from protection validation.
///
/// Compared case-insensitively.
pub const PROTECTED_MODELS_DIR: &str = "ProtectedModels";

/// Glob (relative to the model root) for namespace config discovery.
pub const NAMESPACE_CONFIG_GLOB: &str = "**/namespaceConfig.json";

/// Glob (relative to an object root) for object file discovery.
pub const OBJECT_FILE_GLOB: &str = "**/*.json";

/// Feature flag gating protection validation.
pub const ENABLE_PROTECTED_RESOURCE_VALIDATION: &str = "enableProtectedResourceValidation";

/// Setting naming the model repository root.
pub const MODEL_ROOT_SETTING: &str = "modelRoot";

/// Separator used in resource relative paths and explorer node paths.
pub const TREE_PATH_SEPARATOR: char = '\\';

/// Name of the synthesized properties resource every object carries.
pub const PROPERTIES_RESOURCE_NAME: &str = "Properties";

/// Type of the synthesized properties resource.
pub const PROPERTIES_RESOURCE_TYPE: &str = "prop";

/// Resource profile kind rejected outside protected folders.
pub const POWERSHELL_PROFILE_KIND: &str = "powershell";

/// Additional prop kind rejected outside protected folders.
pub const CONSTANT_PROP_KIND: &str = "constant";

/// Default association type when a declaration omits it.
pub const DEFAULT_ASSOCIATION_TYPE: &str = "association";

/// Default page size for association grouping.
pub const DEFAULT_GROUP_LIMIT: usize = 100;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV_VAR: &str = "MODELEX_CONFIG";

//! Command-line interface for modelex.
//!
//! # Commands
//!
//! - `validate` - strictly load every namespace and object, failing on the first problem
//! - `namespaces` - list the namespaces of the model repository
//! - `objects <namespace>` - list the object definitions of one namespace
//! - `tree <namespace> <object>` - render the explorer tree of one object instance
//!
//! # Global options
//!
//! - `--verbose` / `--quiet` control logging (`RUST_LOG` still wins when set)
//! - `--config <path>` selects the configuration file
//! - `--model-root <path>` overrides the configured model root
//!
//! ```bash
//! modelex --model-root ~/src/models validate
//! modelex objects Compute --format json
//! modelex tree Compute VM --prop Region=eastus --base-prop Cloud=Public --depth 2
//! ```

mod namespaces;
mod objects;
mod tree;
mod validate;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::ModelConfig;

pub use namespaces::NamespacesCommand;
pub use objects::ObjectsCommand;
pub use tree::TreeCommand;
pub use validate::ValidateCommand;

/// Output format shared by the listing commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Settings derived from the global flags, applied before a command runs.
///
/// Kept separate from [`Cli`] so tests can run commands with an explicit
/// configuration instead of parsed arguments.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Default log filter when `RUST_LOG` is unset; `None` disables logging.
    pub log_level: Option<String>,

    /// Configuration file; falls back to `MODELEX_CONFIG`, then `~/.modelex/config.toml`.
    pub config_path: Option<PathBuf>,

    /// Model root overriding the configuration file.
    pub model_root: Option<String>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the global tracing subscriber, writing to stderr.
    ///
    /// Does nothing when a subscriber is already installed.
    pub fn init_logging(&self) {
        let filter = match (EnvFilter::try_from_default_env(), &self.log_level) {
            (Ok(filter), _) => filter,
            (Err(_), Some(level)) => EnvFilter::new(level),
            (Err(_), None) => return,
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    /// Load the configuration file and apply the command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be parsed.
    pub async fn load_model_config(&self) -> Result<ModelConfig> {
        let mut config = ModelConfig::load_with_optional(self.config_path.clone()).await?;
        if let Some(root) = &self.model_root {
            config.model_root = Some(root.clone());
        }
        Ok(config)
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "modelex",
    about = "Resolve split-file JSON object models and explore them as trees",
    version,
    long_about = "modelex loads namespace configs and object definitions from a model repository, \
                  merges split companion files, enforces protected-provider rules and renders \
                  explorer trees for object instances."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file
    #[arg(long, global = true, env = "MODELEX_CONFIG")]
    config: Option<PathBuf>,

    /// Root of the model repository, overriding the configuration
    #[arg(long, global = true)]
    model_root: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Strictly validate every namespace config and object file
    Validate(ValidateCommand),

    /// List namespaces
    Namespaces(NamespacesCommand),

    /// List the objects of a namespace
    Objects(ObjectsCommand),

    /// Show the explorer tree of an object
    Tree(TreeCommand),
}

impl Cli {
    /// Run the parsed command with the configuration its flags describe.
    ///
    /// # Errors
    ///
    /// Any error of the executed command.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Translate the global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            Some("warn".to_string())
        };

        CliConfig {
            log_level,
            config_path: self.config.clone(),
            model_root: self.model_root.clone(),
        }
    }

    /// Run the parsed command with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Any error of the executed command.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();
        let model_config = config.load_model_config().await?;

        match self.command {
            Commands::Validate(cmd) => cmd.execute(&model_config).await,
            Commands::Namespaces(cmd) => cmd.execute(&model_config).await,
            Commands::Objects(cmd) => cmd.execute(&model_config).await,
            Commands::Tree(cmd) => cmd.execute(&model_config).await,
        }
    }
}

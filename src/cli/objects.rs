use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::OutputFormat;
use crate::config::ModelConfig;
use crate::store::ModelStore;

/// List the object definitions of one namespace.
#[derive(Args, Debug)]
pub struct ObjectsCommand {
    /// Namespace to list
    namespace: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl ObjectsCommand {
    pub async fn execute(self, config: &ModelConfig) -> Result<()> {
        let store = ModelStore::from_config(config)?;
        let definitions = store.get_object_definitions(&self.namespace).await?;

        if self.format == OutputFormat::Json {
            let objects: Vec<_> =
                definitions.values().map(|definition| definition.definition()).collect();
            println!("{}", serde_json::to_string_pretty(&objects)?);
            return Ok(());
        }

        if definitions.is_empty() {
            println!("No objects in namespace '{}'.", self.namespace);
            return Ok(());
        }

        for (path, definition) in definitions.iter() {
            let key = definition
                .key()
                .map(|key| format!(" key={key}").bright_black().to_string())
                .unwrap_or_else(|| " (global)".bright_black().to_string());
            println!(
                "{}{key} {}",
                path.cyan(),
                format!(
                    "{} resources, {} associations",
                    definition.resources().len(),
                    definition.associations().len()
                )
                .bright_black()
            );
        }
        Ok(())
    }
}

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::OutputFormat;
use crate::config::ModelConfig;
use crate::store::ModelStore;

/// List every namespace of the model repository.
#[derive(Args, Debug)]
pub struct NamespacesCommand {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl NamespacesCommand {
    pub async fn execute(self, config: &ModelConfig) -> Result<()> {
        let store = ModelStore::from_config(config)?;
        let namespaces = store.get_namespaces().await?;

        if self.format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&namespaces)?);
            return Ok(());
        }

        for namespace in &namespaces {
            let base_props: Vec<&str> =
                namespace.required_base_props.iter().map(|prop| prop.name.as_str()).collect();
            let suffix = if base_props.is_empty() {
                String::new()
            } else {
                format!(" [{}]", base_props.join(", ")).bright_black().to_string()
            };
            println!("{}{suffix}", namespace.name.cyan());
        }
        Ok(())
    }
}

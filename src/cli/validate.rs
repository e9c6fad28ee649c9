//! `modelex validate`: strict load of the whole model repository.
//!
//! Unlike the lenient loads behind the other commands, validation stops at the
//! first unreadable file, protection violation or integrity error, which makes
//! it suitable for CI:
//!
//! ```bash
//! modelex --quiet validate --format json
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::OutputFormat;
use crate::config::ModelConfig;
use crate::store::ModelStore;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl ValidateCommand {
    pub async fn execute(self, config: &ModelConfig) -> Result<()> {
        let store = ModelStore::from_config(config)?;
        let summary = store.validate_model_files().await?;

        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "valid": true,
                    "root": store.root().display().to_string(),
                    "summary": summary,
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
            OutputFormat::Text => {
                println!("{} Model repository is valid", "✓".green());
                println!(
                    "  {} namespaces, {} objects, {} files",
                    summary.namespaces.to_string().cyan(),
                    summary.objects.to_string().cyan(),
                    summary.files.to_string().cyan()
                );
            }
        }
        Ok(())
    }
}

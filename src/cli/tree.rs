//! `modelex tree`: render the explorer tree of one object instance.
//!
//! ```text
//! VM/eastus
//! ├── Properties (prop)
//! ├── Health
//! │   └── Dummy (link)
//! └── Disks → Disk
//! ```
//!
//! Property values are given as `--prop Name=value`; base props the namespace
//! declares with a default are filled in when not given. Associations are shown
//! but not expanded since their instances come from data providers.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::ModelConfig;
use crate::explorer::{
    ContextMenu, ExplorerTree, InMemorySuggestionStore, MenuItem, NodeId, NodeType, TreeGenerator,
    TreeRequest, add_resources_to_context_menu,
};
use crate::model::ObjectContext;
use crate::store::ModelStore;

#[derive(Args, Debug)]
pub struct TreeCommand {
    /// Namespace of the object
    namespace: String,

    /// Object path within the namespace
    object: String,

    /// Required prop value, as NAME=VALUE (repeatable)
    #[arg(long = "prop", value_name = "NAME=VALUE", value_parser = parse_key_value)]
    props: Vec<(String, String)>,

    /// Required base prop value, as NAME=VALUE (repeatable)
    #[arg(long = "base-prop", value_name = "NAME=VALUE", value_parser = parse_key_value)]
    base_props: Vec<(String, String)>,

    /// Output format (tree, json)
    #[arg(short = 'f', long, default_value = "tree")]
    format: String,

    /// Maximum depth to display (unlimited if not specified)
    #[arg(short = 'd', long)]
    depth: Option<usize>,

    /// Also print the object's context menu
    #[arg(long)]
    menu: bool,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
    }
}

impl TreeCommand {
    pub async fn execute(self, config: &ModelConfig) -> Result<()> {
        if !matches!(self.format.as_str(), "tree" | "json") {
            anyhow::bail!("Invalid format '{}'. Valid formats: tree, json", self.format);
        }

        let store = ModelStore::from_config(config)?;
        let context = self.object_context(&store).await?;
        let generator = TreeGenerator::new(store, Arc::new(InMemorySuggestionStore::new()))
            .with_group_limit(config.group_limit);

        let request = TreeRequest::new(&self.namespace, &self.object).with_context(context);
        let tree = generator
            .generate_tree(&request)
            .await
            .with_context(|| {
                format!("Failed to build tree for {}\\{}", self.namespace, self.object)
            })?;

        if self.format == "json" {
            println!("{}", serde_json::to_string_pretty(&tree.to_json())?);
            return Ok(());
        }

        println!("{}", tree.root_node().name.cyan().bold());
        let children = &tree.root_node().child_nodes;
        for (i, child) in children.iter().enumerate() {
            self.print_node(&tree, *child, "", i == children.len() - 1, 1)?;
        }

        if self.menu {
            self.print_menu(&tree)?;
        }
        Ok(())
    }

    /// Props from the command line, plus namespace base-prop defaults.
    async fn object_context(&self, store: &ModelStore) -> Result<ObjectContext> {
        let required_props: BTreeMap<String, String> = self.props.iter().cloned().collect();
        let mut base_props: BTreeMap<String, String> = self.base_props.iter().cloned().collect();

        let namespace = store.get_namespace(&self.namespace).await?;
        for prop in &namespace.config.required_base_props {
            if let Some(default) = &prop.default {
                base_props.entry(prop.name.clone()).or_insert_with(|| default.clone());
            }
        }
        Ok(ObjectContext::new(required_props, base_props))
    }

    fn print_node(
        &self,
        tree: &ExplorerTree,
        id: NodeId,
        prefix: &str,
        is_last: bool,
        depth: usize,
    ) -> Result<()> {
        if let Some(max_depth) = self.depth
            && depth > max_depth
        {
            return Ok(());
        }

        let node = tree.node(id)?;
        let connector = if is_last { "└── " } else { "├── " };
        let label = match node.node_type {
            NodeType::Resource => {
                let kind = node
                    .resource_key
                    .as_deref()
                    .and_then(|key| key.rsplit('.').next())
                    .unwrap_or("");
                format!("{} {}", node.name, format!("({kind})").bright_black())
            }
            NodeType::Directory => node.name.bold().to_string(),
            NodeType::Association => {
                let target = node
                    .association
                    .as_ref()
                    .map(|a| a.associated_object_path.as_str())
                    .unwrap_or("");
                format!("{} {}", node.name.yellow(), format!("→ {target}").bright_black())
            }
            NodeType::Object | NodeType::Group => node.name.cyan().to_string(),
        };
        println!("{prefix}{connector}{label}");

        let child_prefix =
            if is_last { format!("{prefix}    ") } else { format!("{prefix}│   ") };
        for (i, child) in node.child_nodes.iter().enumerate() {
            let is_last = i == node.child_nodes.len() - 1;
            self.print_node(tree, *child, &child_prefix, is_last, depth + 1)?;
        }
        Ok(())
    }

    fn print_menu(&self, tree: &ExplorerTree) -> Result<()> {
        let binding = tree.binding(tree.root())?;
        let mut menu = ContextMenu::new();
        add_resources_to_context_menu(
            &mut menu,
            binding.definition.context_menu_resources(),
            |_| {},
            |resource| resource.description.clone(),
        );

        println!();
        println!("{}", "Context menu".bold());
        print_menu_items(&menu.items, "  ");
        Ok(())
    }
}

fn print_menu_items(items: &[MenuItem], indent: &str) {
    for item in items {
        match &item.sublabel {
            Some(sublabel) => println!("{indent}{} {}", item.label, sublabel.bright_black()),
            None if item.is_submenu() => println!("{indent}{} ▸", item.label),
            None => println!("{indent}{}", item.label),
        }
        print_menu_items(&item.submenu, &format!("{indent}  "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("Region=eastus").unwrap(),
            ("Region".to_string(), "eastus".to_string())
        );
        assert_eq!(parse_key_value("Query=a=b").unwrap(), ("Query".to_string(), "a=b".to_string()));
        assert_eq!(parse_key_value("Empty=").unwrap(), ("Empty".to_string(), String::new()));
        assert!(parse_key_value("Region").is_err());
        assert!(parse_key_value("=x").is_err());
    }
}

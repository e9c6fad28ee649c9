//! Context menus built from resource paths.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::model::Resource;
use crate::utils::{join_tree_path, split_tree_path};

/// Callback run when a menu item is activated.
pub type MenuAction = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone, Default)]
pub struct MenuItem {
    pub label: String,
    pub sublabel: Option<String>,
    pub action: Option<MenuAction>,
    pub submenu: Vec<MenuItem>,
}

impl fmt::Debug for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuItem")
            .field("label", &self.label)
            .field("sublabel", &self.sublabel)
            .field("action", &self.action.as_ref().map(|_| "<fn>"))
            .field("submenu", &self.submenu)
            .finish()
    }
}

impl MenuItem {
    fn submenu(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Self::default()
        }
    }

    /// Run the item's action, if it has one.
    pub fn activate(&self) {
        if let Some(action) = &self.action {
            action();
        }
    }

    pub fn is_submenu(&self) -> bool {
        self.action.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContextMenu {
    pub items: Vec<MenuItem>,
}

impl ContextMenu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Item at a `\`-separated label path.
    pub fn find(&self, path: &str) -> Option<&MenuItem> {
        let mut level = &self.items;
        let mut found = None;
        for segment in split_tree_path(path) {
            let item = level.iter().find(|item| item.label == segment)?;
            level = &item.submenu;
            found = Some(item);
        }
        found
    }
}

/// Append one item per resource to `menu`, nesting by the segments of each
/// resource's relative path.
///
/// Submenus created by this call are shared between resources with a common
/// prefix; items already in `menu` are left alone.
pub fn add_resources_to_context_menu<F, S>(
    menu: &mut ContextMenu,
    resources: &[Resource],
    open_handler: F,
    sublabel_fn: S,
) where
    F: Fn(&Resource) + Send + Sync + 'static,
    S: Fn(&Resource) -> Option<String>,
{
    let open_handler = Arc::new(open_handler);
    let mut submenus: HashMap<String, usize> = HashMap::new();

    for resource in resources {
        let segments = split_tree_path(&resource.relative_path);
        let Some((leaf, folders)) = segments.split_last() else {
            continue;
        };

        let mut level = &mut menu.items;
        let mut prefix = String::new();
        for folder in folders {
            prefix = join_tree_path(&prefix, folder);
            let index = match submenus.get(&prefix) {
                Some(&index) => index,
                None => {
                    level.push(MenuItem::submenu(folder));
                    submenus.insert(prefix.clone(), level.len() - 1);
                    level.len() - 1
                }
            };
            level = &mut level[index].submenu;
        }

        let handler = Arc::clone(&open_handler);
        let target = resource.clone();
        level.push(MenuItem {
            label: (*leaf).to_string(),
            sublabel: sublabel_fn(resource),
            action: Some(Arc::new(move || handler(&target))),
            submenu: Vec::new(),
        });
    }
}

//! `{prop}` substitution.
//!
//! Display names and resource strings in a model are templates such as
//! `VM {Region}/{Name}`. [`expand_template`] replaces every `{name}` token whose
//! name is a key of the supplied map; unknown tokens are left untouched so a
//! later pass (e.g. with required base props) can fill them.

use std::collections::BTreeMap;

/// Replace `{key}` with `values[key]` for every key in `values`.
///
/// # Examples
///
/// ```rust
/// use modelex::utils::expand_template;
/// use std::collections::BTreeMap;
///
/// let mut values = BTreeMap::new();
/// values.insert("Region".to_string(), "eastus".to_string());
/// assert_eq!(expand_template("VM {Region} {Name}", &values), "VM eastus {Name}");
/// ```
pub fn expand_template(text: &str, values: &BTreeMap<String, String>) -> String {
    let mut expanded = text.to_string();
    for (name, value) in values {
        let token = format!("{{{name}}}");
        if expanded.contains(&token) {
            expanded = expanded.replace(&token, value);
        }
    }
    expanded
}

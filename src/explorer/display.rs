use crate::core::ModelError;
use crate::model::{ObjectContext, ParsedObjectDefinition};
use crate::utils::expand_template;

/// Name shown for an object node.
///
/// With a `displayName` template, `{requiredProp}` tokens are substituted first
/// and `{requiredBaseProp}` tokens second; global objects skip the first pass.
/// Without a template, global objects show their path and keyed objects show the
/// key value, prefixed with `path/` at the tree root.
///
/// # Errors
///
/// [`ModelError::MissingRequiredProp`] when a keyed object without a template has
/// no value for its key.
pub fn object_node_display_name(
    definition: &ParsedObjectDefinition,
    context: Option<&ObjectContext>,
    is_root: bool,
) -> Result<String, ModelError> {
    let empty = ObjectContext::default();
    let context = context.unwrap_or(&empty);

    if let Some(template) = definition.display_name() {
        let name = if definition.is_global() {
            template.to_string()
        } else {
            expand_template(template, &context.required_props)
        };
        return Ok(expand_template(&name, &context.required_base_props));
    }

    let Some(key) = definition.key() else {
        return Ok(definition.path().to_string());
    };

    let value = context.required_props.get(key).ok_or_else(|| ModelError::MissingRequiredProp {
        path: definition.path().to_string(),
        prop: key.to_string(),
    })?;

    if is_root { Ok(format!("{}/{value}", definition.path())) } else { Ok(value.clone()) }
}

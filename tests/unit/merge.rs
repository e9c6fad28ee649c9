use serde_json::json;

use modelex::core::ModelError;
use modelex::loader::merge_values;

#[test]
fn test_companion_extends_arrays_and_objects() {
    let mut base = json!({
        "path": "VM",
        "requiredProps": ["Region"],
        "resources": [{ "relativePath": "Logs", "type": "link" }],
        "settings": { "color": "blue" }
    });
    let companion = json!({
        "resources": [{ "relativePath": "Logs", "type": "kusto" }],
        "settings": { "icon": "vm" },
        "displayName": "VM {Region}"
    });

    merge_values(&mut base, companion, "VM.extra.json").unwrap();

    assert_eq!(base["resources"].as_array().unwrap().len(), 2);
    assert_eq!(base["settings"], json!({ "color": "blue", "icon": "vm" }));
    assert_eq!(base["displayName"], "VM {Region}");
}

#[test]
fn test_empty_companion_is_noop() {
    let original = json!({ "path": "VM", "resources": [] });
    let mut base = original.clone();
    merge_values(&mut base, json!({}), "VM.empty.json").unwrap();
    assert_eq!(base, original);
}

#[test]
fn test_duplicate_resource_is_rejected() {
    let mut base = json!({ "resources": [{ "relativePath": "Logs", "type": "link" }] });
    let err = merge_values(
        &mut base,
        json!({ "resources": [{ "relativePath": "Logs", "type": "link", "description": "again" }] }),
        "VM.dup.json",
    )
    .unwrap_err();

    assert_eq!(
        err,
        ModelError::DuplicateEntry {
            kind: "resources".to_string(),
            value: "Logs.link".to_string(),
            file: "VM.dup.json".to_string(),
        }
    );
}

#[test]
fn test_duplicate_named_entry_is_rejected() {
    let mut base = json!({ "resourceProfiles": [{ "name": "portal", "type": "link" }] });
    let err = merge_values(
        &mut base,
        json!({ "resourceProfiles": [{ "name": "portal", "type": "kusto" }] }),
        "namespaceConfig.extra.json",
    )
    .unwrap_err();
    assert!(matches!(err, ModelError::DuplicateEntry { value, .. } if value == "portal"));
}

#[test]
fn test_duplicate_required_prop_is_rejected() {
    let mut base = json!({ "requiredProps": ["Region"] });
    let err =
        merge_values(&mut base, json!({ "requiredProps": ["Region"] }), "VM.x.json").unwrap_err();
    assert!(matches!(err, ModelError::DuplicateEntry { .. }));
}

#[test]
fn test_kind_mismatch_is_a_conflict() {
    let mut base = json!({ "resources": [] });
    let overlay = json!({ "resources": { "relativePath": "Logs" } });
    let err = merge_values(&mut base, overlay, "VM.x.json").unwrap_err();
    assert_eq!(
        err,
        ModelError::MergeConflict {
            property: "resources".to_string(),
            file: "VM.x.json".to_string(),
        }
    );
}

#[test]
fn test_scalar_of_same_kind_is_replaced() {
    let mut base = json!({ "hideFromSearch": false });
    merge_values(&mut base, json!({ "hideFromSearch": true }), "VM.x.json").unwrap();
    assert_eq!(base["hideFromSearch"], true);
}

use serde_json::json;
use std::sync::Arc;

use crate::common::ModelFixture;
use modelex::config::ModelConfig;
use modelex::core::ModelError;
use modelex::store::{LocalCloneDir, ModelStore};

#[tokio::test]
async fn test_from_config_requires_model_root() {
    let err = ModelStore::from_config(&ModelConfig::default()).unwrap_err();
    assert!(matches!(err, ModelError::ConfigError { .. }));
}

#[tokio::test]
async fn test_from_config_wipes_configured_clone_on_empty_root() {
    let fixture = ModelFixture::new().unwrap();
    let clone = fixture.root().join("clone");
    std::fs::create_dir_all(clone.join("stale")).unwrap();

    let config = ModelConfig {
        model_root: Some(fixture.root().join("models").display().to_string()),
        local_clone: Some(clone.display().to_string()),
        ..ModelConfig::default()
    };
    std::fs::create_dir_all(fixture.root().join("models")).unwrap();

    let store = ModelStore::from_config(&config).unwrap();
    let err = store.get_namespaces().await.unwrap_err();
    assert!(matches!(err, ModelError::NoNamespacesFound { .. }));
    assert!(!clone.exists());
}

#[tokio::test]
async fn test_bad_companion_skips_only_its_object() {
    let fixture = ModelFixture::compute_vm().unwrap();
    fixture.add_object("Compute", "Disk", &json!({ "path": "Disk" })).unwrap();
    fixture
        .add_companion(
            "Compute",
            "Disk",
            "dup",
            &json!({ "resources": [{ "relativePath": "Properties", "type": "prop" }, { "relativePath": "Properties", "type": "prop" }] }),
        )
        .unwrap();
    fixture
        .add_companion("Compute", "VM", "bad", &json!({ "requiredProps": "Region" }))
        .unwrap();

    let store = fixture.store();
    let definitions = store.get_object_definitions("Compute").await.unwrap();
    // VM's companion turns an array into a string; Disk's companion declares a resource twice
    assert!(!definitions.contains_key("VM"));
    assert!(!definitions.contains_key("Disk"));
    assert!(store.validate_model_files().await.is_err());
}

#[tokio::test]
async fn test_namespace_names_follow_loads() {
    let fixture = ModelFixture::compute_vm().unwrap();
    let store = fixture.store();
    assert!(store.namespace_names().is_empty());

    store.get_namespaces().await.unwrap();
    assert_eq!(store.namespace_names(), vec!["Compute".to_string()]);

    fixture.add_namespace("Billing").unwrap();
    store.clear_namespace_cache().await;
    let names: Vec<String> =
        store.get_namespaces().await.unwrap().into_iter().map(|n| n.name).collect();
    assert_eq!(names, vec!["Billing".to_string(), "Compute".to_string()]);
    assert_eq!(store.namespace_names(), names);
}

#[tokio::test]
async fn test_clones_share_caches() {
    let fixture = ModelFixture::compute_vm().unwrap();
    let store = fixture.store();
    let other = store.clone();

    let first = store.get_object_definition("Compute", "VM").await.unwrap();
    std::fs::remove_file(fixture.root().join("Compute/Objects/VM.json")).unwrap();
    let second = other.get_object_definition("Compute", "VM").await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    other.clear_object_definition_cache(Some("Compute"));
    assert!(matches!(
        store.get_object_definition("Compute", "VM").await,
        Err(ModelError::ObjectNotFound { .. })
    ));
}

#[tokio::test]
async fn test_local_clone_dir_is_left_alone_when_namespaces_exist() {
    let fixture = ModelFixture::compute_vm().unwrap();
    let clone = tempfile::tempdir().unwrap();
    let store = fixture.store().with_local_clone(Arc::new(LocalCloneDir::new(clone.path())));

    store.get_namespaces().await.unwrap();
    assert!(clone.path().exists());
}

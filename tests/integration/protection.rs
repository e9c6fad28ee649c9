use serde_json::json;

use crate::common::{ModelFixture, run_modelex};
use modelex::core::ModelError;
use modelex::loader::LoadMode;

/// `Compute` namespace whose `VM` declares a powershell resource outside the
/// protected tree and another one inside it.
fn fixture_with_scripts() -> ModelFixture {
    let fixture = ModelFixture::compute_vm().unwrap();
    fixture
        .add_companion(
            "Compute",
            "VM",
            "ops",
            &json!({ "resources": [{ "relativePath": "Ops\\Restart", "type": "powershell" }] }),
        )
        .unwrap();
    fixture
        .add_protected(
            "Compute/Objects/VM.scripts.json",
            &json!({ "resources": [{ "relativePath": "Ops\\Collect", "type": "powershell" }] }),
        )
        .unwrap();
    fixture
}

#[tokio::test]
async fn test_lenient_load_strips_unprotected_declarations() {
    modelex::test_utils::init_test_logging(None);
    let fixture = fixture_with_scripts();
    let store = fixture.protected_store();

    let vm = store.get_object_definition("Compute", "VM").await.unwrap();
    assert!(vm.resource_by_key("Ops\\Collect.powershell").is_some());
    assert!(vm.resource_by_key("Ops\\Restart.powershell").is_none());
    assert!(vm.resource_by_key("Health\\Dummy.link").is_some());
    assert_eq!(vm.files().len(), 3);
}

#[tokio::test]
async fn test_protection_disabled_keeps_everything() {
    let fixture = fixture_with_scripts();
    let vm = fixture.store().get_object_definition("Compute", "VM").await.unwrap();
    assert!(vm.resource_by_key("Ops\\Restart.powershell").is_some());
}

#[tokio::test]
async fn test_strict_validation_rejects_unprotected_declarations() {
    let fixture = fixture_with_scripts();
    let err = fixture.protected_store().validate_model_files().await.unwrap_err();
    match err {
        ModelError::ProtectionViolation { file, message } => {
            assert!(file.ends_with("VM.ops.json"), "{file}");
            assert!(message.contains("Ops\\Restart"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_powershell_profile_in_namespace_config() {
    let fixture = ModelFixture::compute_vm().unwrap();
    fixture
        .add_namespace_config(
            "Compute",
            &json!({
                "name": "Compute",
                "resourceProfiles": [
                    { "name": "shell", "type": "PowerShell" },
                    { "name": "portal", "type": "link" }
                ]
            }),
        )
        .unwrap();
    let store = fixture.protected_store();

    assert!(store.get_resource_profile("Compute", "portal").await.is_ok());
    assert!(matches!(
        store.get_resource_profile("Compute", "shell").await,
        Err(ModelError::ResourceProfileNotFound { .. })
    ));
    assert!(matches!(
        store.load_namespaces(LoadMode::Strict).await,
        Err(ModelError::ProtectionViolation { .. })
    ));
}

#[test]
fn test_cli_validate_honours_protection_flag() {
    let fixture = fixture_with_scripts();
    run_modelex(fixture.root(), &["validate"]).unwrap().assert_success();

    let config = fixture.root().join(".modelex-test-config.toml");
    std::fs::write(&config, "enable_protected_resource_validation = true\n").unwrap();
    let output = run_modelex(fixture.root(), &["validate"]).unwrap();
    output.assert_failure();
    assert!(output.stderr.contains("Protected declarations"), "{}", output.stderr);
}

use predicates::prelude::*;
use serde_json::{Value, json};

use crate::common::{ModelFixture, run_modelex};

fn compute_with_disks() -> ModelFixture {
    let fixture = ModelFixture::compute_vm().unwrap();
    fixture
        .add_namespace_config(
            "Compute",
            &json!({
                "name": "Compute",
                "requiredBaseProps": [{ "name": "Cloud", "default": "Public" }]
            }),
        )
        .unwrap();
    fixture
        .add_companion(
            "Compute",
            "VM",
            "disks",
            &json!({
                "resources": [{ "relativePath": "Health\\Metrics", "type": "kusto", "showInContextMenu": true }],
                "associations": [{ "relativePath": "Disks", "associatedObjectPath": "Disk" }]
            }),
        )
        .unwrap();
    fixture
        .add_object(
            "Compute",
            "Disk",
            &json!({ "path": "Disk", "key": "Name", "requiredProps": ["Name"] }),
        )
        .unwrap();
    fixture
}

#[test]
fn test_validate_reports_counts() {
    let fixture = compute_with_disks();
    let output = run_modelex(fixture.root(), &["validate"]).unwrap();
    output.assert_success();
    assert!(output.stdout.contains("Model repository is valid"));
    assert!(output.stdout.contains("1 namespaces, 2 objects, 4 files"), "{}", output.stdout);
}

#[test]
fn test_validate_json() {
    let fixture = compute_with_disks();
    let output = run_modelex(fixture.root(), &["validate", "--format", "json"]).unwrap();
    output.assert_success();
    let value: Value = serde_json::from_str(&output.stdout).unwrap();
    assert_eq!(value["valid"], true);
    assert_eq!(value["summary"]["objects"], 2);
}

#[test]
fn test_validate_fails_on_duplicate_namespace() {
    let fixture = ModelFixture::compute_vm().unwrap();
    fixture.add_namespace_config("Other", &json!({ "name": "Compute" })).unwrap();

    let output = run_modelex(fixture.root(), &["validate"]).unwrap();
    output.assert_failure();
    assert_eq!(output.code, Some(1));
    assert!(output.stderr.contains("Duplicate namespace 'Compute'"), "{}", output.stderr);
}

#[test]
fn test_validate_fails_on_invalid_json_in_strict_mode() {
    let fixture = ModelFixture::compute_vm().unwrap();
    std::fs::write(fixture.root().join("Compute/Objects/Broken.json"), "{ not json").unwrap();

    run_modelex(fixture.root(), &["validate"]).unwrap().assert_failure();
    // Lenient listing skips the broken file
    let output = run_modelex(fixture.root(), &["objects", "Compute"]).unwrap();
    output.assert_success();
    assert!(output.stdout.contains("VM"));
}

#[test]
fn test_empty_root_reports_no_namespaces() {
    let fixture = ModelFixture::new().unwrap();
    let output = run_modelex(fixture.root(), &["namespaces"]).unwrap();
    output.assert_failure();
    assert!(output.stderr.contains("No namespaces found"), "{}", output.stderr);
}

#[test]
fn test_namespaces_listing() {
    let fixture = compute_with_disks();
    fixture.add_namespace("Billing").unwrap();

    let output = run_modelex(fixture.root(), &["namespaces"]).unwrap();
    output.assert_success();
    let lines: Vec<&str> = output.stdout.lines().collect();
    assert_eq!(lines, vec!["Billing", "Compute [Cloud]"]);
}

#[test]
fn test_objects_json_merges_companions() {
    let fixture = compute_with_disks();
    let output = run_modelex(fixture.root(), &["objects", "Compute", "--format", "json"]).unwrap();
    output.assert_success();

    let objects: Vec<Value> = serde_json::from_str(&output.stdout).unwrap();
    let vm = objects.iter().find(|o| o["path"] == "VM").unwrap();
    let resources: Vec<&str> = vm["resources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["relativePath"].as_str().unwrap())
        .collect();
    assert!(resources.contains(&"Health\\Dummy"));
    assert!(resources.contains(&"Health\\Metrics"));
    assert_eq!(vm["associations"][0]["associatedObjectPath"], "Disk");
}

#[test]
fn test_objects_unknown_namespace() {
    let fixture = compute_with_disks();
    let output = run_modelex(fixture.root(), &["objects", "Storage"]).unwrap();
    output.assert_failure();
    assert!(output.stderr.contains("Namespace 'Storage' not found"));
}

#[test]
fn test_tree_output() {
    let fixture = compute_with_disks();
    let args = ["tree", "Compute", "VM", "--prop", "Region=eastus"];
    let output = run_modelex(fixture.root(), &args).unwrap();
    output.assert_success();

    let expected = "\
VM/eastus
├── Properties (prop)
├── Health
│   ├── Dummy (link)
│   └── Metrics (kusto)
└── Disks → Disk
";
    assert_eq!(output.stdout, expected);
}

#[test]
fn test_tree_depth_limit() {
    let fixture = compute_with_disks();
    let args = ["tree", "Compute", "VM", "--prop", "Region=eastus", "--depth", "1"];
    let output = run_modelex(fixture.root(), &args).unwrap();
    output.assert_success();
    assert!(output.stdout.contains("Health"));
    assert!(!output.stdout.contains("Dummy"));
}

#[test]
fn test_tree_json_with_base_prop_default() {
    let fixture = compute_with_disks();
    fixture
        .add_companion("Compute", "VM", "name", &json!({ "displayName": "{Region} ({Cloud})" }))
        .unwrap();

    let output = run_modelex(
        fixture.root(),
        &["tree", "Compute", "VM", "--prop", "Region=eastus", "--format", "json"],
    )
    .unwrap();
    output.assert_success();
    let tree: Value = serde_json::from_str(&output.stdout).unwrap();
    assert_eq!(tree["name"], "eastus (Public)");
    assert_eq!(tree["state"], "expanded");
    assert_eq!(tree["children"][0]["path"], "Properties.prop");
}

#[test]
fn test_tree_menu() {
    let fixture = compute_with_disks();
    let args = ["tree", "Compute", "VM", "--prop", "Region=eastus", "--menu"];
    let output = run_modelex(fixture.root(), &args).unwrap();
    output.assert_success();
    assert!(output.stdout.contains("Context menu"));
    assert!(output.stdout.contains("  Health ▸"));
    assert!(output.stdout.contains("    Metrics"));
    assert!(output.stdout.contains("  Properties"));
}

#[test]
fn test_tree_missing_key_prop() {
    let fixture = compute_with_disks();
    let output = run_modelex(fixture.root(), &["tree", "Compute", "VM"]).unwrap();
    output.assert_failure();
    assert!(output.stderr.contains("Required property 'Region' missing"), "{}", output.stderr);
}

#[test]
fn test_tree_unknown_object_suggests_closest() {
    let fixture = compute_with_disks();
    let args = ["tree", "Compute", "Vm", "--prop", "Region=x"];
    let output = run_modelex(fixture.root(), &args).unwrap();
    output.assert_failure();
    assert!(output.stderr.contains("Did you mean 'VM'?"), "{}", output.stderr);
}

#[test]
fn test_tree_rejects_bad_prop_syntax() {
    let fixture = compute_with_disks();
    assert_cmd::Command::cargo_bin("modelex")
        .unwrap()
        .args(["--model-root"])
        .arg(fixture.root())
        .args(["tree", "Compute", "VM", "--prop", "Region"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected NAME=VALUE"));
}

#[test]
fn test_help_lists_commands() {
    assert_cmd::Command::cargo_bin("modelex")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("validate").and(predicate::str::contains("tree")));
}

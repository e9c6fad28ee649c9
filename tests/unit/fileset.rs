use serde_json::json;
use std::path::{Path, PathBuf};

use crate::common::ModelFixture;
use modelex::fileset::{FileSet, is_protected, is_split_file, logical_path};

fn names(paths: &[PathBuf]) -> Vec<String> {
    let mut names: Vec<String> =
        paths.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
    names.sort();
    names
}

#[test]
fn test_split_file_detection() {
    assert!(is_split_file(Path::new("Objects/VM.health.json")));
    assert!(!is_split_file(Path::new("Objects/VM.json")));
    assert!(!is_split_file(Path::new("namespaceConfig.json")));
}

#[test]
fn test_protected_tree_is_case_insensitive_and_top_level_only() {
    let root = Path::new("/models");
    assert!(is_protected(root, Path::new("/models/ProtectedModels/Compute/Objects/VM.x.json")));
    assert!(is_protected(root, Path::new("/models/protectedmodels/Compute/Objects/VM.x.json")));
    assert!(!is_protected(root, Path::new("/models/Compute/ProtectedModels/VM.x.json")));
    assert_eq!(
        logical_path(root, Path::new("/models/ProtectedModels/Compute/Objects/VM.x.json")),
        Some(PathBuf::from("Compute/Objects/VM.x.json"))
    );
}

#[test]
fn test_companions_pair_by_logical_parent() {
    let fixture = ModelFixture::compute_vm().unwrap();
    fixture.add_companion("Compute", "VM", "health", &json!({})).unwrap();
    fixture.add_protected("Compute/Objects/VM.scripts.json", &json!({})).unwrap();
    // Same stem in another folder is not a companion
    fixture.write_json("Compute/Objects/Nested/VM.other.json", &json!({})).unwrap();
    // Protected base files are never listed as bases
    fixture.add_protected("Compute/Objects/Secret.json", &json!({})).unwrap();

    let fileset = FileSet::scan(fixture.root()).unwrap();
    let bases = fileset.list_base_files("**/*.json").unwrap();
    assert_eq!(names(&bases), vec!["VM.json", "namespaceConfig.json"]);

    let base = fixture.root().join("Compute/Objects/VM.json");
    assert_eq!(names(&fileset.list_split_files(&base)), vec!["VM.health.json", "VM.scripts.json"]);
}

#[tokio::test]
async fn test_scan_skips_hidden_entries() {
    let fixture = ModelFixture::compute_vm().unwrap();
    fixture.write_json(".cache/Compute/Objects/VM.json", &json!({})).unwrap();

    let fileset = FileSet::scan_async(fixture.root()).await.unwrap();
    assert_eq!(fileset.files().len(), 2);
}

#[tokio::test]
async fn test_scan_missing_root_fails() {
    let fixture = ModelFixture::new().unwrap();
    let err = FileSet::scan_async(&fixture.root().join("absent")).await.unwrap_err();
    assert!(matches!(err, modelex::core::ModelError::FileAccess(_)));
}

use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::common::ModelFixture;
use modelex::explorer::{
    InMemorySuggestionStore, NodeType, SuggestionStore, TreeGenerator, TreeRequest,
};
use modelex::model::ObjectContext;

fn request() -> TreeRequest {
    TreeRequest::new("Compute", "VM")
        .with_context(ObjectContext::default().with_prop("Region", "eastus"))
}

#[tokio::test]
async fn test_reload_rebuilds_every_open_tree() {
    modelex::test_utils::init_test_logging(None);
    let fixture = ModelFixture::compute_vm().unwrap();
    fixture.add_namespace("Billing").unwrap();
    fixture.add_object("Billing", "Subscription", &json!({ "path": "Subscription" })).unwrap();

    let suggestions = Arc::new(InMemorySuggestionStore::new());
    let generator =
        TreeGenerator::new(fixture.store(), Arc::clone(&suggestions) as Arc<dyn SuggestionStore>);

    let vm = generator.open_tree(request()).await.unwrap();
    let sub = generator.open_tree(TreeRequest::new("Billing", "Subscription")).await.unwrap();
    generator.with_tree_mut(sub, |tree| tree.root_node_mut().children_visible = false).unwrap();

    fixture
        .add_companion(
            "Compute",
            "VM",
            "extra",
            &json!({ "resources": [{ "relativePath": "Health\\Logs", "type": "link" }] }),
        )
        .unwrap();
    fixture
        .add_companion(
            "Billing",
            "Subscription",
            "extra",
            &json!({ "resources": [{ "relativePath": "Invoices", "type": "link" }] }),
        )
        .unwrap();

    assert_eq!(generator.reload_all_trees().await.unwrap(), 2);

    let vm_tree = generator.tree(vm).unwrap();
    assert!(vm_tree.root_node().children_visible);
    assert!(vm_tree.find_by_path("Health\\Logs.link").is_some());
    assert_eq!(suggestions.get("Compute\\Health\\Logs.link").len(), 1);

    let sub_tree = generator.tree(sub).unwrap();
    assert!(!sub_tree.root_node().children_visible);
    assert!(sub_tree.find_by_path("Invoices.link").is_some());

    assert_eq!(generator.open_tree_ids(), vec![vm, sub]);
}

#[tokio::test]
async fn test_association_paging_through_open_tree() {
    let fixture = ModelFixture::compute_vm().unwrap();
    fixture
        .add_companion(
            "Compute",
            "VM",
            "disks",
            &json!({ "associations": [{ "relativePath": "Disks", "associatedObjectPath": "Disk" }] }),
        )
        .unwrap();
    fixture
        .add_object(
            "Compute",
            "Disk",
            &json!({ "path": "Disk", "key": "Name", "requiredProps": ["Name"] }),
        )
        .unwrap();

    let generator = TreeGenerator::new(fixture.store(), Arc::new(InMemorySuggestionStore::new()))
        .with_group_limit(10);
    let id = generator.open_tree(request()).await.unwrap();

    let mut tree = generator.tree(id).unwrap();
    let disks = tree.find_by_path("Disks.association").unwrap();
    let instances: Vec<BTreeMap<String, String>> =
        (0..25).map(|i| BTreeMap::from([("Name".to_string(), format!("d{i:02}"))])).collect();
    generator
        .expand_association_node(&mut tree, disks, instances, generator.group_limit())
        .await
        .unwrap();

    let groups: Vec<String> = tree.children(disks).iter().map(|n| n.name.clone()).collect();
    assert_eq!(groups, vec!["[0..9]", "[10..19]", "[20..24]"]);
    assert!(tree.children(disks).iter().all(|n| n.node_type == NodeType::Group));

    let first = tree.node(disks).unwrap().child_nodes[0];
    generator.expand_group_node(&mut tree, first, generator.group_limit()).await.unwrap();
    let names: Vec<String> = tree.children(first).iter().map(|n| n.name.clone()).collect();
    assert_eq!(names.len(), 10);
    assert_eq!(names[0], "d00");
    assert_eq!(names[9], "d09");

    assert!(generator.update_tree(id, tree));
    assert_eq!(generator.tree(id).unwrap().children(disks).len(), 3);
}

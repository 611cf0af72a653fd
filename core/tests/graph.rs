mod common;

use common::*;
use serde_json::json;
use tessel_core::{EntityRelationGraph, NodeId, Relations, TesselError};

#[test]
fn collections_fan_out_and_objects_give_one_child() {
    let registry = registry();
    let value = json!({
        "name": "p",
        "children": [
            {"name": "a"},
            {"name": "b", "toys": [{"label": "x"}]}
        ]
    });
    let graph = EntityRelationGraph::build(&registry, PARENT, &value).unwrap();

    let entities: Vec<_> = graph.nodes().map(|(_, node)| node.entity).collect();
    assert_eq!(entities, vec![PARENT, CHILD, CHILD, TOY]);
    assert_eq!(graph.root().children, vec![NodeId(1), NodeId(2)]);
    assert_eq!(graph.node(NodeId(3)).parent, Some(NodeId(2)));
    assert_eq!(graph.node(NodeId(2)).index, Some(1));

    let child_value = json!({"parent": {"name": "p"}});
    let child = EntityRelationGraph::build(&registry, CHILD, &child_value).unwrap();
    assert_eq!(child.len(), 2);
    assert_eq!(child.node(NodeId(1)).index, None);
}

#[test]
fn absent_and_null_relations_create_no_nodes() {
    let registry = registry();
    let value = json!({"name": "p", "profile": null});
    let graph = EntityRelationGraph::build(&registry, PARENT, &value).unwrap();

    assert_eq!(graph.len(), 1);
    assert!(graph.relations().is_empty());
}

#[test]
fn scalar_relation_values_are_shape_errors() {
    let registry = registry();
    let error = EntityRelationGraph::build(&registry, PARENT, &json!({"children": 5})).unwrap_err();
    assert!(matches!(error, TesselError::DataShape(_)));

    let error = EntityRelationGraph::build(&registry, PARENT, &json!(5)).unwrap_err();
    assert!(matches!(error, TesselError::DataShape(_)));
}

#[test]
fn nested_values_without_metadata_fail_fast() {
    let registry = registry();
    let error =
        EntityRelationGraph::build(&registry, PARENT, &json!({"pets": [{"name": "rex"}]}))
            .unwrap_err();
    assert!(matches!(
        error,
        TesselError::MetadataResolution { property, .. } if property == "pets"
    ));
}

#[test]
fn key_metas_follow_traversal_order() {
    let registry = registry();
    let value = json!({"children": [{"toys": [{}]}, {}]});
    let graph = EntityRelationGraph::build(&registry, PARENT, &value).unwrap();

    let keys: Vec<_> = graph
        .primary_key_metas()
        .into_iter()
        .map(|(id, column)| (id, column.entity))
        .collect();
    assert_eq!(
        keys,
        vec![
            (NodeId(0), PARENT),
            (NodeId(1), CHILD),
            (NodeId(2), TOY),
            (NodeId(3), CHILD)
        ]
    );
    assert!(graph.scope_key_metas().is_empty());

    let document_value = json!({});
    let document = EntityRelationGraph::build(&registry, DOCUMENT, &document_value).unwrap();
    let scopes = document.scope_key_metas();
    assert_eq!(scopes.len(), 1);
    assert_eq!(scopes[0].1.property_name, "tenant");
}

#[test]
fn paths_resolve_to_nodes() {
    let registry = registry();
    let value = json!({
        "children": [
            {"name": "a"},
            {"name": "b", "toys": [{"label": "x"}, {"label": "y"}]}
        ]
    });
    let graph = EntityRelationGraph::build(&registry, PARENT, &value).unwrap();

    assert_eq!(graph.node_at_path("children.1.toys"), Some(NodeId(3)));
    assert_eq!(graph.node_at_path("children[1].toys[1]"), Some(NodeId(4)));
    assert_eq!(graph.node_at_path("children"), Some(NodeId(1)));
    assert_eq!(graph.node_at_path("children.0.name"), Some(NodeId(1)));
    assert_eq!(graph.node_at_path("children.2"), None);
    assert_eq!(graph.node_at_path("pets"), None);

    assert_eq!(graph.pointer(NodeId(4)), "/children/1/toys/1");
    assert_eq!(graph.pointer(NodeId::ROOT), "");
}

#[test]
fn populated_relations_become_an_inclusion_shape() {
    let registry = registry();
    let value = json!({
        "children": [
            {"name": "a"},
            {"name": "b", "toys": [{"label": "x"}]}
        ]
    });
    let graph = EntityRelationGraph::build(&registry, PARENT, &value).unwrap();

    assert_eq!(
        graph.relations(),
        Relations::new().nest("children", Relations::new().with("toys"))
    );
}

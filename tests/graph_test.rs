use blueprint_forge::compiler::graph::{ancestors, detect_cycle, topological_sort};
use blueprint_forge::dsl::builder::BlueprintBuilder;
use blueprint_forge::dsl::{Blueprint, NodeType};
use serde_json::Value;

fn graph(ids: &[&str], edges: &[(&str, &str)]) -> Blueprint {
    let mut builder = BlueprintBuilder::new("graph");
    for id in ids {
        builder = builder.raw_node(id, NodeType::BackendApi, Value::Null);
    }
    for (s, t) in edges {
        builder = builder.connect(s, t);
    }
    builder.build()
}

fn order_ids(bp: &Blueprint) -> Option<Vec<String>> {
    topological_sort(&bp.nodes, &bp.edges).map(|nodes| nodes.iter().map(|n| n.id.clone()).collect())
}

#[test]
fn test_topological_order_breaks_ties_by_array_position() {
    let bp = graph(&["A", "B", "C", "D"], &[("A", "B"), ("B", "C")]);
    assert_eq!(order_ids(&bp).expect("acyclic"), vec!["A", "D", "B", "C"]);
}

#[test]
fn test_two_node_cycle() {
    let bp = graph(&["A", "B"], &[("A", "B"), ("B", "A")]);

    let cycle = detect_cycle(&bp.nodes, &bp.edges).expect("cycle expected");
    assert_eq!(cycle, vec!["A", "B", "A"]);
    assert!(order_ids(&bp).is_none());
}

#[test]
fn test_cycle_in_disconnected_component_is_found() {
    let bp = graph(
        &["A", "B", "X", "Y", "Z"],
        &[("A", "B"), ("X", "Y"), ("Y", "Z"), ("Z", "Y")],
    );

    let cycle = detect_cycle(&bp.nodes, &bp.edges).expect("cycle expected");
    assert_eq!(cycle, vec!["Y", "Z", "Y"]);
    assert!(order_ids(&bp).is_none());
}

#[test]
fn test_self_loop_is_a_cycle() {
    let bp = graph(&["A"], &[("A", "A")]);
    assert_eq!(detect_cycle(&bp.nodes, &bp.edges), Some(vec!["A".to_string(), "A".to_string()]));
    assert!(order_ids(&bp).is_none());
}

#[test]
fn test_dag_has_no_cycle() {
    let bp = graph(&["A", "B", "C"], &[("A", "B"), ("A", "C"), ("B", "C")]);
    assert!(detect_cycle(&bp.nodes, &bp.edges).is_none());
}

#[test]
fn test_topological_order_respects_every_edge() {
    let edges = [
        ("n5", "n2"),
        ("n5", "n0"),
        ("n4", "n0"),
        ("n4", "n1"),
        ("n2", "n3"),
        ("n3", "n1"),
        ("n6", "n3"),
    ];
    let ids = ["n0", "n1", "n2", "n3", "n4", "n5", "n6"];
    let bp = graph(&ids, &edges);

    let order = order_ids(&bp).expect("acyclic");
    assert_eq!(order.len(), ids.len());
    for id in ids {
        assert!(order.iter().any(|o| o == id), "{} missing from order", id);
    }
    for (s, t) in edges {
        let si = order.iter().position(|o| o == s).expect("source present");
        let ti = order.iter().position(|o| o == t).expect("target present");
        assert!(si < ti, "{} must precede {}", s, t);
    }
}

#[test]
fn test_dangling_edges_do_not_block_sorting() {
    let bp = graph(&["A", "B"], &[("A", "B"), ("ghost", "A")]);
    assert_eq!(order_ids(&bp).expect("acyclic"), vec!["A", "B"]);
}

#[test]
fn test_ancestors_are_transitive() {
    let bp = graph(&["A", "B", "C", "D"], &[("A", "B"), ("B", "C"), ("D", "D")]);
    let up = ancestors(&bp.edges, "C");
    assert!(up.contains("A"));
    assert!(up.contains("B"));
    assert!(!up.contains("C"));
    assert!(!up.contains("D"));
}

use blueprint_forge::dsl::builder::BlueprintBuilder;
use blueprint_forge::dsl::{Blueprint, BlueprintStatus, EdgeType, NodeType};
use serde_json::json;

#[test]
fn test_wire_format_is_camel_case() {
    let bp = BlueprintBuilder::new("bp")
        .node("token", NodeType::Erc20Token)
        .param("initialSupply", "1000")
        .label("Main Token")
        .at(100.0, 50.0)
        .build()
        .node("web", NodeType::FrontendScaffold)
        .build()
        .connect_with("token", "web", EdgeType::ContractLink)
        .build();

    let value = serde_json::to_value(&bp).expect("serialize");
    assert_eq!(value["nodes"][0]["type"], "erc20-token");
    assert_eq!(value["nodes"][0]["config"]["initialSupply"], "1000");
    assert_eq!(value["nodes"][0]["position"], json!({ "x": 100.0, "y": 50.0 }));
    assert_eq!(value["edges"][0]["type"], "contract-link");
    assert_eq!(value["status"], "draft");
    assert!(value.get("name").is_none());
}

#[test]
fn test_defaults_when_fields_are_absent() {
    let bp: Blueprint = serde_json::from_value(json!({
        "id": "bp",
        "nodes": [{ "id": "a", "type": "analytics" }],
        "edges": [{ "id": "e", "source": "a", "target": "a" }]
    }))
    .expect("deserialize");

    assert_eq!(bp.status, BlueprintStatus::Draft);
    assert!(bp.config.is_empty());
    assert!(bp.nodes[0].config.is_null());
    assert_eq!(bp.edges[0].kind, EdgeType::Dependency);
}

#[test]
fn test_project_name_fallbacks() {
    let by_id = BlueprintBuilder::new("my-dapp").build();
    assert_eq!(by_id.project_name(), "my-dapp");

    let by_name = BlueprintBuilder::new("my-dapp").name("My dApp").build();
    assert_eq!(by_name.project_name(), "My dApp");

    let by_config = BlueprintBuilder::new("my-dapp")
        .name("My dApp")
        .config("projectName", "Override")
        .build();
    assert_eq!(by_config.project_name(), "Override");

    let blank_config = BlueprintBuilder::new("my-dapp").config("projectName", "  ").build();
    assert_eq!(blank_config.project_name(), "my-dapp");
}

#[test]
fn test_edge_lookup_helpers() {
    let bp = BlueprintBuilder::new("bp")
        .node("a", NodeType::BackendApi)
        .build()
        .node("b", NodeType::FrontendScaffold)
        .build()
        .node("c", NodeType::Analytics)
        .build()
        .connect("a", "b")
        .connect("b", "c")
        .build();

    assert_eq!(bp.incoming("b").map(|e| e.source.as_str()).collect::<Vec<_>>(), vec!["a"]);
    assert_eq!(bp.outgoing("b").map(|e| e.target.as_str()).collect::<Vec<_>>(), vec!["c"]);
    assert!(bp.node("c").is_some());
    assert!(bp.node("z").is_none());
}

#[test]
fn test_node_type_names() {
    for kind in NodeType::ALL {
        assert_eq!(NodeType::parse(kind.as_str()), Some(kind));
        assert_eq!(kind.to_string(), kind.as_str());
    }
    assert_eq!(NodeType::parse("erc721-token"), None);
    assert!(NodeType::Erc1155Token.is_contract());
    assert!(NodeType::BackendApi.is_backing_service());
    assert!(!NodeType::Analytics.is_backing_service());
}

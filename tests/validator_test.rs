use blueprint_forge::compiler::validator::{IssueCode, Validator};
use blueprint_forge::dsl::builder::BlueprintBuilder;
use blueprint_forge::dsl::{EdgeType, NodeType};
use blueprint_forge::plugins::PluginRegistry;
use serde_json::json;

fn token(builder: BlueprintBuilder, id: &str) -> BlueprintBuilder {
    builder
        .node(id, NodeType::Erc20Token)
        .param("name", "Token")
        .param("symbol", "TKN")
        .build()
}

#[test]
fn test_valid_blueprint_has_no_errors() {
    let registry = PluginRegistry::with_builtins();
    let bp = token(BlueprintBuilder::new("bp"), "token")
        .node("web", NodeType::FrontendScaffold)
        .build()
        .connect_with("token", "web", EdgeType::ContractLink)
        .build();

    let result = Validator::new(&registry).validate(&bp);
    assert!(result.valid, "unexpected errors: {:?}", result.errors);
    assert!(result.errors.is_empty());
    assert!(result.warnings.is_empty(), "unexpected warnings: {:?}", result.warnings);
}

#[test]
fn test_each_config_problem_is_reported_with_node_id() {
    let registry = PluginRegistry::with_builtins();
    let bp = BlueprintBuilder::new("bp")
        .node("token", NodeType::Erc20Token)
        .param("symbol", "lowercase")
        .param("decimals", 99)
        .param("surprise", true)
        .build()
        .build();

    let result = Validator::new(&registry).validate(&bp);
    assert!(!result.valid);

    let paths: Vec<&str> = result.errors.iter().map(|i| i.path.as_str()).collect();
    assert!(paths.contains(&"config.name"), "paths: {:?}", paths);
    assert!(paths.contains(&"config.symbol"), "paths: {:?}", paths);
    assert!(paths.contains(&"config.decimals"), "paths: {:?}", paths);
    assert!(paths.contains(&"config.surprise"), "paths: {:?}", paths);
    assert_eq!(result.errors.len(), 4);
    for issue in &result.errors {
        assert_eq!(issue.code, IssueCode::NodeConfigInvalid);
        assert_eq!(issue.node_id.as_deref(), Some("token"));
    }
}

#[test]
fn test_cycle_is_an_error_with_path() {
    let registry = PluginRegistry::with_builtins();
    let bp = token(token(BlueprintBuilder::new("bp"), "a"), "b")
        .connect("a", "b")
        .connect("b", "a")
        .build();

    let result = Validator::new(&registry).validate(&bp);
    assert!(!result.valid);
    let cycle = result
        .errors
        .iter()
        .find(|i| i.code == IssueCode::CycleDetected)
        .expect("cycle issue");
    assert_eq!(cycle.path, "edges");
    assert_eq!(cycle.message, "cycle detected: a -> b -> a");
}

#[test]
fn test_duplicates_reported_alongside_other_errors() {
    let registry = PluginRegistry::with_builtins();
    let bp = BlueprintBuilder::new("bp")
        .node("x", NodeType::Erc20Token)
        .build()
        .node("x", NodeType::BackendApi)
        .build()
        .build();

    let result = Validator::new(&registry).validate(&bp);
    assert!(!result.valid);
    assert!(result.has_code(IssueCode::DuplicateNodeId));
    assert!(result.has_code(IssueCode::NodeConfigInvalid));

    let dup = result
        .errors
        .iter()
        .find(|i| i.code == IssueCode::DuplicateNodeId)
        .expect("duplicate issue");
    assert_eq!(dup.path, "nodes");
    assert_eq!(dup.message, "duplicate node ids: x");
}

#[test]
fn test_dangling_edge_reference() {
    let registry = PluginRegistry::with_builtins();
    let bp = token(BlueprintBuilder::new("bp"), "token").connect("token", "ghost").build();

    let result = Validator::new(&registry).validate(&bp);
    assert!(!result.valid);
    let issue = result
        .errors
        .iter()
        .find(|i| i.code == IssueCode::InvalidEdgeReference)
        .expect("edge reference issue");
    assert_eq!(issue.path, "edges[0].target");
    assert!(issue.message.contains("ghost"));
}

#[test]
fn test_unusual_connection_is_only_a_warning() {
    let registry = PluginRegistry::with_builtins();
    let bp = BlueprintBuilder::new("bp")
        .node("api", NodeType::BackendApi)
        .build()
        .node("wallet", NodeType::WalletAuth)
        .build()
        .node("web", NodeType::FrontendScaffold)
        .build()
        .connect("api", "wallet")
        .connect("web", "wallet")
        .connect("api", "web")
        .build();

    let result = Validator::new(&registry).validate(&bp);
    assert!(result.valid, "unexpected errors: {:?}", result.errors);
    let unusual: Vec<_> = result
        .warnings
        .iter()
        .filter(|i| i.code == IssueCode::UnusualConnection)
        .collect();
    assert_eq!(unusual.len(), 1);
    assert_eq!(unusual[0].path, "edges[0]");
    assert_eq!(unusual[0].node_id.as_deref(), Some("wallet"));
}

#[test]
fn test_contract_link_from_non_contract_warns() {
    let registry = PluginRegistry::with_builtins();
    let bp = BlueprintBuilder::new("bp")
        .node("api", NodeType::BackendApi)
        .build()
        .node("web", NodeType::FrontendScaffold)
        .build()
        .connect_with("api", "web", EdgeType::ContractLink)
        .build();

    let result = Validator::new(&registry).validate(&bp);
    assert!(result.valid);
    assert!(result.warnings.iter().any(|i| i.code == IssueCode::UnusualConnection && i.path == "edges[0].type"));
}

#[test]
fn test_missing_required_input_and_disconnected_frontend() {
    let registry = PluginRegistry::with_builtins();
    let bp = BlueprintBuilder::new("bp")
        .node("web", NodeType::FrontendScaffold)
        .build()
        .node("stats", NodeType::Analytics)
        .build()
        .build();

    let result = Validator::new(&registry).validate(&bp);
    assert!(result.valid, "warnings must not block: {:?}", result.errors);
    assert!(result.has_code(IssueCode::MissingRequiredInput));
    assert!(result.has_code(IssueCode::DisconnectedFrontend));

    let missing = result
        .warnings
        .iter()
        .find(|i| i.code == IssueCode::MissingRequiredInput)
        .expect("missing input warning");
    assert_eq!(missing.node_id.as_deref(), Some("stats"));
}

#[test]
fn test_required_input_satisfied_by_matching_output() {
    let registry = PluginRegistry::with_builtins();
    let bp = BlueprintBuilder::new("bp")
        .node("api", NodeType::BackendApi)
        .build()
        .node("web", NodeType::FrontendScaffold)
        .build()
        .node("stats", NodeType::Analytics)
        .build()
        .connect("api", "web")
        .connect("web", "stats")
        .build();

    let result = Validator::new(&registry).validate(&bp);
    assert!(!result.has_code(IssueCode::MissingRequiredInput), "{:?}", result.warnings);
    assert!(!result.has_code(IssueCode::DisconnectedFrontend), "{:?}", result.warnings);
}

#[test]
fn test_unknown_plugin_when_registry_lacks_type() {
    let registry = PluginRegistry::new();
    let bp = token(BlueprintBuilder::new("bp"), "token").build();

    let result = Validator::new(&registry).validate(&bp);
    assert!(!result.valid);
    let issue = &result.errors[0];
    assert_eq!(issue.code, IssueCode::UnknownPlugin);
    assert_eq!(issue.path, "nodes[0].type");
}

#[test]
fn test_shape_problems_are_all_reported() {
    let registry = PluginRegistry::with_builtins();
    let raw = json!({
        "id": "",
        "nodes": [
            { "id": "a", "type": "quantum-oracle" },
            { "type": "analytics", "config": 5 }
        ],
        "edges": [{ "id": "e1", "source": "a", "type": "sideways" }]
    });

    let (result, blueprint) = Validator::new(&registry).validate_value(&raw);
    assert!(blueprint.is_none());
    assert!(!result.valid);
    assert!(result.errors.iter().all(|i| i.code == IssueCode::InvalidBlueprint));

    let paths: Vec<&str> = result.errors.iter().map(|i| i.path.as_str()).collect();
    for expected in ["id", "nodes[0].type", "nodes[1].id", "nodes[1].config", "edges[0].target", "edges[0].type"] {
        assert!(paths.contains(&expected), "missing {} in {:?}", expected, paths);
    }
}

#[test]
fn test_empty_node_list_is_rejected() {
    let registry = PluginRegistry::with_builtins();
    let (result, _) = Validator::new(&registry).validate_value(&json!({ "id": "bp", "nodes": [] }));
    assert!(!result.valid);
    assert_eq!(result.errors[0].path, "nodes");
}

#[test]
fn test_validate_value_returns_typed_blueprint() {
    let registry = PluginRegistry::with_builtins();
    let raw = json!({
        "id": "bp",
        "nodes": [{ "id": "token", "type": "erc20-token", "config": { "name": "Token", "symbol": "TKN" } }],
        "edges": []
    });

    let (result, blueprint) = Validator::new(&registry).validate_value(&raw);
    assert!(result.valid, "{:?}", result.errors);
    let blueprint = blueprint.expect("typed blueprint");
    assert_eq!(blueprint.nodes[0].kind, NodeType::Erc20Token);
}

#[test]
fn test_validation_is_deterministic() {
    let registry = PluginRegistry::with_builtins();
    let bp = BlueprintBuilder::new("bp")
        .node("web", NodeType::FrontendScaffold)
        .param("framework", "angular")
        .build()
        .node("stats", NodeType::Analytics)
        .build()
        .connect("stats", "ghost")
        .build();

    let validator = Validator::new(&registry);
    assert_eq!(validator.validate(&bp), validator.validate(&bp));
}

use blueprint_forge::compiler::loader::{
    Format, LoadError, from_json_str, from_yaml_str, load_blueprint, load_value, save_blueprint, to_yaml_string,
};
use blueprint_forge::dsl::builder::BlueprintBuilder;
use blueprint_forge::dsl::{EdgeType, NodeType};
use std::path::Path;

const YAML: &str = r#"
id: marketplace
name: NFT Marketplace
nodes:
  - id: items
    type: erc1155-token
    config:
      name: Items
    position: { x: 10, y: 20 }
  - id: web
    type: frontend-scaffold
    label: Storefront
edges:
  - id: e1
    source: items
    target: web
    type: contract-link
"#;

#[test]
fn test_parse_yaml() {
    let bp = from_yaml_str(YAML).expect("valid yaml");
    assert_eq!(bp.id, "marketplace");
    assert_eq!(bp.nodes.len(), 2);
    assert_eq!(bp.nodes[0].kind, NodeType::Erc1155Token);
    assert_eq!(bp.nodes[0].position.map(|p| p.x), Some(10.0));
    assert_eq!(bp.nodes[1].label.as_deref(), Some("Storefront"));
    assert_eq!(bp.edges[0].kind, EdgeType::ContractLink);
}

#[test]
fn test_yaml_and_json_agree() {
    let from_yaml = from_yaml_str(YAML).expect("yaml");
    let yaml_again = to_yaml_string(&from_yaml).expect("serialize");
    assert_eq!(from_yaml_str(&yaml_again).expect("reparse"), from_yaml);

    let json = serde_json::to_string(&from_yaml).expect("json");
    assert_eq!(from_json_str(&json).expect("json parse"), from_yaml);
}

#[test]
fn test_invalid_inputs() {
    assert!(matches!(from_json_str("{ not json"), Err(LoadError::Json(_))));
    assert!(matches!(from_yaml_str("id: [unclosed"), Err(LoadError::Yaml(_))));
    assert!(matches!(
        from_json_str(r#"{"id":"x","nodes":[{"id":"a","type":"mystery"}]}"#),
        Err(LoadError::Json(_))
    ));
}

#[test]
fn test_format_from_extension() {
    assert_eq!(Format::from_path(Path::new("a.json")).expect("json"), Format::Json);
    assert_eq!(Format::from_path(Path::new("a.yaml")).expect("yaml"), Format::Yaml);
    assert_eq!(Format::from_path(Path::new("a.YML")).expect("yml"), Format::Yaml);
    assert!(matches!(Format::from_path(Path::new("a.toml")), Err(LoadError::UnsupportedFormat(_))));
}

#[test]
fn test_save_and_load_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bp = BlueprintBuilder::new("saved")
        .name("Saved")
        .node("token", NodeType::Erc20Token)
        .param("name", "Saved Token")
        .param("symbol", "SAV")
        .at(1.0, 2.0)
        .build()
        .build();

    for file in ["bp.json", "bp.yaml"] {
        let path = dir.path().join(file);
        save_blueprint(&bp, &path).expect("save");
        assert_eq!(load_blueprint(&path).expect("load"), bp);

        let raw = load_value(&path).expect("raw value");
        assert_eq!(raw["nodes"][0]["type"], "erc20-token");
    }
}

#[test]
fn test_missing_file() {
    let err = load_blueprint("/definitely/not/here.json").expect_err("missing");
    assert!(matches!(err, LoadError::Io { .. }));
}

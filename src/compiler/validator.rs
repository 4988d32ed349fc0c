use crate::compiler::connections;
use crate::compiler::graph::detect_cycle;
use crate::dsl::{Blueprint, EdgeType, Node, NodeType};
use crate::plugins::{PluginRegistry, PortDirection};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    InvalidBlueprint,
    NodeConfigInvalid,
    UnknownPlugin,
    CycleDetected,
    InvalidEdgeReference,
    DuplicateNodeId,
    UnusualConnection,
    MissingRequiredInput,
    DisconnectedFrontend,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::InvalidBlueprint => "INVALID_BLUEPRINT",
            IssueCode::NodeConfigInvalid => "NODE_CONFIG_INVALID",
            IssueCode::UnknownPlugin => "UNKNOWN_PLUGIN",
            IssueCode::CycleDetected => "CYCLE_DETECTED",
            IssueCode::InvalidEdgeReference => "INVALID_EDGE_REFERENCE",
            IssueCode::DuplicateNodeId => "DUPLICATE_NODE_ID",
            IssueCode::UnusualConnection => "UNUSUAL_CONNECTION",
            IssueCode::MissingRequiredInput => "MISSING_REQUIRED_INPUT",
            IssueCode::DisconnectedFrontend => "DISCONNECTED_FRONTEND",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub path: String,
    pub message: String,
    pub code: IssueCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
}

impl Issue {
    fn new(code: IssueCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            code,
            node_id: None,
        }
    }

    fn on_node(mut self, node_id: &str) -> Self {
        self.node_id = Some(node_id.to_string());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
}

impl ValidationResult {
    fn from_issues(errors: Vec<Issue>, warnings: Vec<Issue>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    pub fn has_code(&self, code: IssueCode) -> bool {
        self.errors.iter().chain(&self.warnings).any(|i| i.code == code)
    }

    /// Errors that invalidate the blueprint as a whole, as opposed to one node.
    pub fn blueprint_errors(&self) -> impl Iterator<Item = &Issue> {
        self.errors.iter().filter(|i| i.node_id.is_none())
    }
}

/// Pure validation over a blueprint. Never mutates its input and never
/// fails: every problem is returned as data.
pub struct Validator<'a> {
    registry: &'a PluginRegistry,
}

impl<'a> Validator<'a> {
    pub fn new(registry: &'a PluginRegistry) -> Self {
        Self { registry }
    }

    /// Validates an untyped payload. The typed blueprint is returned when the
    /// base shape parsed, whether or not later checks passed.
    pub fn validate_value(&self, raw: &Value) -> (ValidationResult, Option<Blueprint>) {
        let shape_issues = check_shape(raw);
        if !shape_issues.is_empty() {
            return (ValidationResult::from_issues(shape_issues, Vec::new()), None);
        }

        match serde_json::from_value::<Blueprint>(raw.clone()) {
            Ok(blueprint) => (self.validate(&blueprint), Some(blueprint)),
            Err(e) => (
                ValidationResult::from_issues(vec![Issue::new(IssueCode::InvalidBlueprint, "", e.to_string())], Vec::new()),
                None,
            ),
        }
    }

    pub fn validate(&self, blueprint: &Blueprint) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // First occurrence wins for lookups; duplicates are reported below.
        let mut by_id: HashMap<&str, &Node> = HashMap::new();
        for node in &blueprint.nodes {
            by_id.entry(node.id.as_str()).or_insert(node);
        }

        // Per-node config.
        for (i, node) in blueprint.nodes.iter().enumerate() {
            let Some(plugin) = self.registry.get(node.kind) else {
                errors.push(
                    Issue::new(
                        IssueCode::UnknownPlugin,
                        format!("nodes[{}].type", i),
                        format!("no plugin registered for node type '{}'", node.kind),
                    )
                    .on_node(&node.id),
                );
                continue;
            };
            if let Err(field_issues) = plugin.validate(&node.config) {
                for issue in field_issues {
                    errors.push(Issue::new(IssueCode::NodeConfigInvalid, issue.path, issue.message).on_node(&node.id));
                }
            }
        }

        // Cycles.
        if let Some(cycle) = detect_cycle(&blueprint.nodes, &blueprint.edges) {
            errors.push(Issue::new(
                IssueCode::CycleDetected,
                "edges",
                format!("cycle detected: {}", cycle.join(" -> ")),
            ));
        }

        // Edge references and plausibility.
        for (i, edge) in blueprint.edges.iter().enumerate() {
            let source = by_id.get(edge.source.as_str());
            let target = by_id.get(edge.target.as_str());

            let (source, target) = match (source, target) {
                (Some(s), Some(t)) => (*s, *t),
                (s, t) => {
                    let mut missing = Vec::new();
                    if s.is_none() {
                        missing.push(format!("source '{}'", edge.source));
                    }
                    if t.is_none() {
                        missing.push(format!("target '{}'", edge.target));
                    }
                    let field = if s.is_none() { "source" } else { "target" };
                    errors.push(Issue::new(
                        IssueCode::InvalidEdgeReference,
                        format!("edges[{}].{}", i, field),
                        format!("edge {} references unknown {}", edge.id, missing.join(" and ")),
                    ));
                    continue;
                }
            };

            if !connections::is_plausible(source.kind, target.kind) {
                warnings.push(
                    Issue::new(
                        IssueCode::UnusualConnection,
                        format!("edges[{}]", i),
                        format!("unusual connection: {} -> {}", source.kind, target.kind),
                    )
                    .on_node(&target.id),
                );
            }
            if edge.kind == EdgeType::ContractLink && !source.kind.is_contract() {
                warnings.push(
                    Issue::new(
                        IssueCode::UnusualConnection,
                        format!("edges[{}].type", i),
                        format!("contract-link edge starts at non-contract node type {}", source.kind),
                    )
                    .on_node(&source.id),
                );
            }
        }

        // Likely-incomplete graphs.
        for (i, node) in blueprint.nodes.iter().enumerate() {
            if node.kind.is_ui() {
                let connected = blueprint
                    .incoming(&node.id)
                    .map(|e| e.source.as_str())
                    .chain(blueprint.outgoing(&node.id).map(|e| e.target.as_str()))
                    .filter_map(|id| by_id.get(id))
                    .any(|n| n.kind.is_backing_service());
                if !connected {
                    warnings.push(
                        Issue::new(
                            IssueCode::DisconnectedFrontend,
                            format!("nodes[{}]", i),
                            format!("{} node is not connected to any backend or contract node", node.kind),
                        )
                        .on_node(&node.id),
                    );
                }
            }

            if let Some(plugin) = self.registry.get(node.kind) {
                for port in plugin.ports().iter().filter(|p| p.direction == PortDirection::Input && p.required) {
                    let satisfied = blueprint
                        .incoming(&node.id)
                        .filter_map(|e| by_id.get(e.source.as_str()))
                        .filter_map(|source| self.registry.get(source.kind))
                        .any(|source_plugin| {
                            source_plugin
                                .ports()
                                .iter()
                                .any(|p| p.direction == PortDirection::Output && p.data_type == port.data_type)
                        });
                    if !satisfied {
                        warnings.push(
                            Issue::new(
                                IssueCode::MissingRequiredInput,
                                format!("nodes[{}]", i),
                                format!("required input '{}' ({}) has no incoming connection", port.id, port.data_type),
                            )
                            .on_node(&node.id),
                        );
                    }
                }
            }
        }

        // Duplicate ids, reported once for the whole list.
        let duplicates = duplicate_ids(&blueprint.nodes);
        if !duplicates.is_empty() {
            errors.push(Issue::new(
                IssueCode::DuplicateNodeId,
                "nodes",
                format!("duplicate node ids: {}", duplicates.join(", ")),
            ));
        }

        ValidationResult::from_issues(errors, warnings)
    }
}

/// Ids seen more than once, in order of first appearance.
pub fn duplicate_ids(nodes: &[Node]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for node in nodes {
        *counts.entry(node.id.as_str()).or_default() += 1;
    }
    let mut seen = Vec::new();
    for node in nodes {
        if counts[node.id.as_str()] > 1 && !seen.contains(&node.id) {
            seen.push(node.id.clone());
        }
    }
    seen
}

// --- Base shape ---

fn shape_issue(path: impl Into<String>, message: impl Into<String>) -> Issue {
    Issue::new(IssueCode::InvalidBlueprint, path, message)
}

fn check_string(obj: &serde_json::Map<String, Value>, key: &str, path: &str, required: bool, issues: &mut Vec<Issue>) {
    match obj.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => {}
        Some(Value::String(_)) => issues.push(shape_issue(path, "must not be empty")),
        None | Some(Value::Null) if !required => {}
        None => issues.push(shape_issue(path, "is required")),
        Some(other) => issues.push(shape_issue(
            path,
            format!("expected a string, found {}", crate::schema::type_name(other)),
        )),
    }
}

/// Structural check of a raw payload, reporting every violation.
fn check_shape(raw: &Value) -> Vec<Issue> {
    let mut issues = Vec::new();
    let Some(root) = raw.as_object() else {
        return vec![shape_issue("", "blueprint must be a JSON object")];
    };

    check_string(root, "id", "id", true, &mut issues);
    check_string(root, "name", "name", false, &mut issues);
    check_string(root, "description", "description", false, &mut issues);

    match root.get("config") {
        None | Some(Value::Null) | Some(Value::Object(_)) => {}
        Some(_) => issues.push(shape_issue("config", "must be an object")),
    }
    match root.get("status") {
        None => {}
        Some(Value::String(s))
            if ["draft", "validated", "generating", "completed", "failed"].contains(&s.as_str()) => {}
        Some(_) => issues.push(shape_issue(
            "status",
            "must be one of: draft, validated, generating, completed, failed",
        )),
    }

    match root.get("nodes") {
        Some(Value::Array(nodes)) if nodes.is_empty() => {
            issues.push(shape_issue("nodes", "must contain at least one node"));
        }
        Some(Value::Array(nodes)) => {
            for (i, node) in nodes.iter().enumerate() {
                let base = format!("nodes[{}]", i);
                let Some(obj) = node.as_object() else {
                    issues.push(shape_issue(base, "must be an object"));
                    continue;
                };
                check_string(obj, "id", &format!("{}.id", base), true, &mut issues);
                check_string(obj, "label", &format!("{}.label", base), false, &mut issues);
                match obj.get("type") {
                    Some(Value::String(t)) if NodeType::parse(t).is_some() => {}
                    Some(Value::String(t)) => {
                        issues.push(shape_issue(format!("{}.type", base), format!("unknown node type '{}'", t)))
                    }
                    None => issues.push(shape_issue(format!("{}.type", base), "is required")),
                    Some(_) => issues.push(shape_issue(format!("{}.type", base), "must be a string")),
                }
                match obj.get("config") {
                    None | Some(Value::Null) | Some(Value::Object(_)) => {}
                    Some(_) => issues.push(shape_issue(format!("{}.config", base), "must be an object")),
                }
                match obj.get("position") {
                    None | Some(Value::Null) => {}
                    Some(Value::Object(p)) if p.get("x").is_some_and(Value::is_number) && p.get("y").is_some_and(Value::is_number) => {}
                    Some(_) => issues.push(shape_issue(
                        format!("{}.position", base),
                        "must be an object with numeric x and y",
                    )),
                }
            }
        }
        None => issues.push(shape_issue("nodes", "is required")),
        Some(_) => issues.push(shape_issue("nodes", "must be an array")),
    }

    match root.get("edges") {
        None | Some(Value::Null) => {}
        Some(Value::Array(edges)) => {
            for (i, edge) in edges.iter().enumerate() {
                let base = format!("edges[{}]", i);
                let Some(obj) = edge.as_object() else {
                    issues.push(shape_issue(base, "must be an object"));
                    continue;
                };
                check_string(obj, "id", &format!("{}.id", base), true, &mut issues);
                check_string(obj, "source", &format!("{}.source", base), true, &mut issues);
                check_string(obj, "target", &format!("{}.target", base), true, &mut issues);
                match obj.get("type") {
                    None => {}
                    Some(Value::String(t)) if EdgeType::parse(t).is_some() => {}
                    Some(_) => issues.push(shape_issue(
                        format!("{}.type", base),
                        "must be one of: dependency, data-flow, contract-link",
                    )),
                }
            }
        }
        Some(_) => issues.push(shape_issue("edges", "must be an array")),
    }

    issues
}

use crate::dsl::{Blueprint, BlueprintStatus, Edge, EdgeType, Node, NodeType, Position};
use serde_json::{Map, Value};
use uuid::Uuid;

pub struct BlueprintBuilder {
    id: String,
    name: Option<String>,
    description: Option<String>,
    config: Map<String, Value>,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl BlueprintBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: None,
            description: None,
            config: Map::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn config(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.config.insert(key.to_string(), value.into());
        self
    }

    pub fn node(self, id: &str, kind: NodeType) -> NodeBuilder {
        NodeBuilder {
            blueprint_builder: self,
            id: id.to_string(),
            kind,
            config: Map::new(),
            label: None,
            position: None,
        }
    }

    /// Adds a node whose config is given as one raw JSON value.
    pub fn raw_node(mut self, id: &str, kind: NodeType, config: Value) -> Self {
        self.nodes.push(Node {
            id: id.to_string(),
            kind,
            config,
            label: None,
            position: None,
        });
        self
    }

    pub fn connect(self, source: &str, target: &str) -> Self {
        self.connect_with(source, target, EdgeType::Dependency)
    }

    pub fn connect_with(mut self, source: &str, target: &str, kind: EdgeType) -> Self {
        self.edges.push(Edge {
            id: Uuid::new_v4().to_string(),
            source: source.to_string(),
            target: target.to_string(),
            kind,
        });
        self
    }

    pub fn build(self) -> Blueprint {
        Blueprint {
            id: self.id,
            name: self.name,
            description: self.description,
            nodes: self.nodes,
            edges: self.edges,
            config: self.config,
            status: BlueprintStatus::Draft,
        }
    }
}

pub struct NodeBuilder {
    blueprint_builder: BlueprintBuilder,
    id: String,
    kind: NodeType,
    config: Map<String, Value>,
    label: Option<String>,
    position: Option<Position>,
}

impl NodeBuilder {
    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.config.insert(key.to_string(), value.into());
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Position { x, y });
        self
    }

    pub fn build(mut self) -> BlueprintBuilder {
        self.blueprint_builder.nodes.push(Node {
            id: self.id,
            kind: self.kind,
            config: Value::Object(self.config),
            label: self.label,
            position: self.position,
        });
        self.blueprint_builder
    }
}

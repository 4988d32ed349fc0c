pub mod builder;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A declarative component graph describing the project to generate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub config: Map<String, Value>,
    #[serde(default)]
    pub status: BlueprintStatus,
}

impl Blueprint {
    /// Project name exposed to plugins: `config.projectName`, then `name`, then `id`.
    pub fn project_name(&self) -> String {
        self.config
            .get("projectName")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| self.id.clone())
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Edges pointing at `node_id`, in declaration order.
    pub fn incoming<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.target == node_id)
    }

    /// Edges leaving `node_id`, in declaration order.
    pub fn outgoing<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == node_id)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlueprintStatus {
    #[default]
    Draft,
    Validated,
    Generating,
    Completed,
    Failed,
}

/// One configured component on the canvas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeType,
    #[serde(default)]
    pub config: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

/// Canvas coordinates, carried through import/export untouched.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Component kinds. The tag selects the plugin and therefore the config schema.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    FrontendScaffold,
    Erc20Token,
    Erc1155Token,
    WalletAuth,
    IpfsStorage,
    Analytics,
    BackendApi,
}

impl NodeType {
    pub const ALL: [NodeType; 7] = [
        NodeType::FrontendScaffold,
        NodeType::Erc20Token,
        NodeType::Erc1155Token,
        NodeType::WalletAuth,
        NodeType::IpfsStorage,
        NodeType::Analytics,
        NodeType::BackendApi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::FrontendScaffold => "frontend-scaffold",
            NodeType::Erc20Token => "erc20-token",
            NodeType::Erc1155Token => "erc1155-token",
            NodeType::WalletAuth => "wallet-auth",
            NodeType::IpfsStorage => "ipfs-storage",
            NodeType::Analytics => "analytics",
            NodeType::BackendApi => "backend-api",
        }
    }

    pub fn parse(s: &str) -> Option<NodeType> {
        NodeType::ALL.into_iter().find(|t| t.as_str() == s)
    }

    pub fn is_contract(&self) -> bool {
        matches!(self, NodeType::Erc20Token | NodeType::Erc1155Token)
    }

    /// Node kinds that produce user-facing UI.
    pub fn is_ui(&self) -> bool {
        matches!(self, NodeType::FrontendScaffold)
    }

    /// Node kinds that can serve a UI: backends and contracts.
    pub fn is_backing_service(&self) -> bool {
        self.is_contract() || matches!(self, NodeType::BackendApi)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed relation; the source is always processed before the target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type", default)]
    pub kind: EdgeType,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeType {
    #[default]
    Dependency,
    DataFlow,
    ContractLink,
}

impl EdgeType {
    pub const ALL: [EdgeType; 3] = [EdgeType::Dependency, EdgeType::DataFlow, EdgeType::ContractLink];

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Dependency => "dependency",
            EdgeType::DataFlow => "data-flow",
            EdgeType::ContractLink => "contract-link",
        }
    }

    pub fn parse(s: &str) -> Option<EdgeType> {
        EdgeType::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

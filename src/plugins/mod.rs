use crate::dsl::{Node, NodeType};
use crate::runtime::context::ExecutionContext;
use crate::schema::{ConfigSchema, FieldIssue};
use crate::template::TemplateError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use thiserror::Error;

pub mod builtin;
pub mod output;

pub use output::CodegenOutput;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PluginMetadata {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl PluginMetadata {
    pub fn new(id: &str, name: &str, category: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: String::new(),
            category: category.to_string(),
            tags: Vec::new(),
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
}

/// Typed socket used by the validator to judge whether connections make sense.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub direction: PortDirection,
    pub data_type: String,
    pub required: bool,
}

impl Port {
    pub fn input(id: &str, data_type: &str, required: bool) -> Self {
        Self {
            id: id.to_string(),
            name: id.replace('-', " "),
            direction: PortDirection::Input,
            data_type: data_type.to_string(),
            required,
        }
    }

    pub fn output(id: &str, data_type: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.replace('-', " "),
            direction: PortDirection::Output,
            data_type: data_type.to_string(),
            required: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("invalid config for node {node_id}: {}", join_issues(.issues))]
    InvalidConfig { node_id: String, issues: Vec<FieldIssue> },
    #[error("template error: {0}")]
    Template(#[from] TemplateError),
    #[error("{0}")]
    Generation(String),
    #[error("panicked: {0}")]
    Panicked(String),
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("{}: {}", i.path, i.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// The generation capability bound to one node type.
///
/// `generate` must be referentially transparent: identical `node.config` and
/// `ctx` produce identical output. Wall-clock time, randomness and global
/// mutable state are off limits.
#[async_trait]
pub trait Plugin: Send + Sync + Debug {
    fn metadata(&self) -> &PluginMetadata;
    fn node_type(&self) -> NodeType;
    fn config_schema(&self) -> &ConfigSchema;
    fn ports(&self) -> &[Port];

    fn validate(&self, config: &serde_json::Value) -> Result<(), Vec<FieldIssue>> {
        self.config_schema().validate(config).map(|_| ())
    }

    async fn generate(&self, node: &Node, ctx: &ExecutionContext) -> Result<CodegenOutput, PluginError>;
}

/// Parses `node.config` into the plugin's typed config.
pub fn typed_config<T: DeserializeOwned>(plugin: &dyn Plugin, node: &Node) -> Result<T, PluginError> {
    crate::schema::parse_config(plugin.config_schema(), &node.config).map_err(|issues| PluginError::InvalidConfig {
        node_id: node.id.clone(),
        issues,
    })
}

/// Plugin lookup by node type.
#[derive(Debug, Default, Clone)]
pub struct PluginRegistry {
    plugins: HashMap<NodeType, Arc<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in plugin.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    /// Registers `plugin`, replacing any previous plugin for the same node type.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.insert(plugin.node_type(), plugin);
    }

    pub fn get(&self, kind: NodeType) -> Option<&Arc<dyn Plugin>> {
        self.plugins.get(&kind)
    }

    /// Registered plugins ordered by node type.
    pub fn list(&self) -> Vec<&Arc<dyn Plugin>> {
        let mut plugins: Vec<_> = self.plugins.values().collect();
        plugins.sort_by_key(|p| p.node_type());
        plugins
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

use crate::dsl::{Blueprint, Node, NodeType};
use crate::merge::router::slugify;
use crate::template::{self, DEFAULT_MAX_DEPTH, TemplateError};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use uuid::Uuid;

/// Everything a plugin may look at besides its own node.
///
/// Cheap to build per node; all fields are plain data so that identical
/// inputs give identical generator output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    pub run_id: Uuid,
    pub blueprint_id: String,
    pub project_name: String,
    pub project_slug: String,
    /// Zero-based position of the node in the execution order.
    pub position: usize,
    /// Nodes this node (transitively) depends on, in execution order.
    pub upstream: Vec<UpstreamNode>,
    /// Paths already materialized in the output tree.
    pub existing_files: BTreeSet<String>,
    #[serde(skip)]
    pub template_max_depth: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeType,
    pub config: Value,
    /// True when an edge connects it straight to the current node.
    pub direct: bool,
}

impl ExecutionContext {
    /// A context outside of any run, for previews and tests.
    pub fn detached(blueprint: &Blueprint) -> Self {
        let project_name = blueprint.project_name();
        Self {
            run_id: Uuid::nil(),
            blueprint_id: blueprint.id.clone(),
            project_slug: slugify(&project_name),
            project_name,
            position: 0,
            upstream: Vec::new(),
            existing_files: BTreeSet::new(),
            template_max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub(crate) fn for_node(
        run_id: Uuid,
        blueprint: &Blueprint,
        node: &Node,
        order: &[&Node],
        position: usize,
        existing_files: BTreeSet<String>,
        template_max_depth: usize,
    ) -> Self {
        let ancestors = crate::compiler::graph::ancestors(&blueprint.edges, &node.id);
        let upstream = order[..position]
            .iter()
            .filter(|n| ancestors.contains(n.id.as_str()))
            .map(|n| UpstreamNode {
                id: n.id.clone(),
                kind: n.kind,
                config: n.config.clone(),
                direct: blueprint.incoming(&node.id).any(|e| e.source == n.id),
            })
            .collect();

        let project_name = blueprint.project_name();
        Self {
            run_id,
            blueprint_id: blueprint.id.clone(),
            project_slug: slugify(&project_name),
            project_name,
            position,
            upstream,
            existing_files,
            template_max_depth,
        }
    }

    pub fn with_existing_file(mut self, path: &str) -> Self {
        self.existing_files.insert(path.to_string());
        self
    }

    pub fn with_upstream(mut self, node: &Node) -> Self {
        self.upstream.push(UpstreamNode {
            id: node.id.clone(),
            kind: node.kind,
            config: node.config.clone(),
            direct: true,
        });
        self
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.existing_files.contains(path)
    }

    pub fn upstream_of(&self, kind: NodeType) -> impl Iterator<Item = &UpstreamNode> {
        self.upstream.iter().filter(move |u| u.kind == kind)
    }

    /// Renders a template with this context's nesting bound.
    pub fn render(&self, template: &str, vars: &Value) -> Result<String, TemplateError> {
        template::render_with_depth(template, vars, self.template_max_depth)
    }
}

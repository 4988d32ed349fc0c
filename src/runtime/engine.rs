use crate::compiler::graph::{adjacency, topological_sort};
use crate::compiler::validator::{Issue, ValidationResult, Validator};
use crate::config::EngineConfig;
use crate::dsl::{Blueprint, NodeType};
use crate::merge::{GeneratedRepository, MergeEngine, MergeError};
use crate::plugins::{PluginError, PluginRegistry};
use crate::runtime::context::ExecutionContext;
use crate::runtime::run::{Artifact, LogEntry, LogLevel, Run, RunStatus};
use crate::runtime::storage::{RunStore, StoreError, StoreResult};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinError;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("blueprint failed validation with {} error(s)", .0.len())]
    Validation(Vec<Issue>),
    #[error("blueprint graph contains a cycle")]
    Cycle,
    #[error("no plugin registered for node type '{kind}' (node {node_id})")]
    MissingPlugin { node_id: String, kind: NodeType },
    #[error("plugin {plugin_id} failed on node {node_id}: {source}")]
    Plugin {
        node_id: String,
        plugin_id: String,
        #[source]
        source: PluginError,
    },
    #[error("plugin {plugin_id} timed out on node {node_id} after {secs}s")]
    Timeout {
        node_id: String,
        plugin_id: String,
        secs: u64,
    },
    #[error("merge failed: {0}")]
    Merge(#[from] MergeError),
    #[error("{} node(s) skipped because of invalid configuration: {}", .0.len(), .0.join(", "))]
    Skipped(Vec<String>),
    #[error("run was cancelled")]
    Cancelled,
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for GenerationError {
    /// A run that became terminal underneath us can only have been cancelled.
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Finalized(_) => GenerationError::Cancelled,
            StoreError::InvalidTransition {
                from: RunStatus::Cancelled,
                ..
            } => GenerationError::Cancelled,
            other => GenerationError::Store(other),
        }
    }
}

/// A finished inline generation.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run: Run,
    /// Present only when the run completed.
    pub repository: Option<GeneratedRepository>,
}

/// Drives runs: validation, ordering, plugin dispatch, merging and status
/// bookkeeping. Nodes of one run execute one at a time; separate runs are
/// independent tasks.
pub struct Orchestrator {
    registry: Arc<PluginRegistry>,
    store: Arc<dyn RunStore>,
    config: EngineConfig,
}

impl Orchestrator {
    pub fn new(registry: Arc<PluginRegistry>, store: Arc<dyn RunStore>) -> Self {
        Self {
            registry,
            store,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &Arc<dyn RunStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Creates a pending run and executes it in the background.
    pub async fn submit(self: &Arc<Self>, blueprint: Blueprint) -> StoreResult<Run> {
        let run = self.store.create(&blueprint.id).await?;
        info!(run_id = %run.id, blueprint_id = %blueprint.id, "Run submitted");

        let this = Arc::clone(self);
        let run_id = run.id;
        tokio::spawn(async move {
            this.execute(run_id, &blueprint).await;
        });
        Ok(run)
    }

    /// Creates a run and executes it to the end before returning.
    pub async fn generate(&self, blueprint: &Blueprint) -> StoreResult<RunOutcome> {
        let run = self.store.create(&blueprint.id).await?;
        let repository = self.execute(run.id, blueprint).await;
        let run = self.store.get(run.id).await?.ok_or(StoreError::NotFound(run.id))?;
        Ok(RunOutcome { run, repository })
    }

    pub async fn cancel(&self, run_id: Uuid) -> StoreResult<Run> {
        let run = self.store.cancel(run_id).await?;
        info!(run_id = %run_id, "Run cancelled");
        Ok(run)
    }

    /// Executes an existing pending run. Failures end up in the run record;
    /// the repository is returned only on completion.
    pub async fn execute(&self, run_id: Uuid, blueprint: &Blueprint) -> Option<GeneratedRepository> {
        match self.run_pipeline(run_id, blueprint).await {
            Ok(repository) => {
                info!(run_id = %run_id, files = repository.files.len(), "Run completed");
                Some(repository)
            }
            Err(GenerationError::Cancelled) => {
                info!(run_id = %run_id, "Run stopped after cancellation");
                None
            }
            Err(e) => {
                let reason = e.to_string();
                // Best effort: the run may already be terminal.
                let _ = self.log(run_id, LogEntry::error(reason.clone())).await;
                match self.store.fail(run_id, &reason).await {
                    Ok(_) => {}
                    Err(StoreError::InvalidTransition { from, .. }) => {
                        debug!(run_id = %run_id, status = %from, "Run already terminal, failure not recorded");
                    }
                    Err(store_err) => {
                        error!(run_id = %run_id, error = %store_err, "Failed to record run failure");
                    }
                }
                None
            }
        }
    }

    async fn run_pipeline(&self, run_id: Uuid, blueprint: &Blueprint) -> Result<GeneratedRepository, GenerationError> {
        let validation = Validator::new(&self.registry).validate(blueprint);
        for issue in &validation.warnings {
            self.log(run_id, issue_entry(LogLevel::Warn, issue)).await?;
        }
        for issue in &validation.errors {
            self.log(run_id, issue_entry(LogLevel::Error, issue)).await?;
        }
        if validation.blueprint_errors().next().is_some() {
            return Err(GenerationError::Validation(validation.errors));
        }

        let order = topological_sort(&blueprint.nodes, &blueprint.edges).ok_or(GenerationError::Cycle)?;
        let blocked = blocked_nodes(&validation, blueprint);
        let runnable = order.iter().filter(|n| !blocked.contains_key(n.id.as_str())).count();
        if runnable == 0 {
            return Err(GenerationError::Validation(validation.errors));
        }

        self.store.update_status(run_id, RunStatus::Running).await?;
        let message = if blocked.is_empty() {
            format!("Generating {} node(s)", runnable)
        } else {
            format!("Generating {} node(s), skipping {}", runnable, blocked.len())
        };
        self.log(run_id, LogEntry::info(message)).await?;

        let node_timeout = Duration::from_secs(self.config.node_timeout_secs);
        let mut merge = MergeEngine::new();
        let mut skipped = Vec::new();

        for (position, node) in order.iter().enumerate() {
            if self.store.status(run_id).await? == RunStatus::Cancelled {
                return Err(GenerationError::Cancelled);
            }

            if let Some(reason) = blocked.get(node.id.as_str()) {
                let message = match reason {
                    Blocked::InvalidConfig => "Skipped: invalid configuration".to_string(),
                    Blocked::Upstream(upstream) => format!("Skipped: depends on skipped node {}", upstream),
                };
                self.log(run_id, LogEntry::warn(message).for_node(&node.id)).await?;
                skipped.push(node.id.clone());
                continue;
            }

            let plugin = self
                .registry
                .get(node.kind)
                .cloned()
                .ok_or_else(|| GenerationError::MissingPlugin {
                    node_id: node.id.clone(),
                    kind: node.kind,
                })?;
            let plugin_id = plugin.metadata().id.clone();

            let ctx = ExecutionContext::for_node(
                run_id,
                blueprint,
                node,
                &order,
                position,
                merge.tree().paths(),
                self.config.template_max_depth,
            );

            self.log(run_id, LogEntry::info(format!("Running plugin {}", plugin_id)).for_node(&node.id))
                .await?;

            // Own task per call so a panicking plugin surfaces as a JoinError.
            let owned = (*node).clone();
            let task = tokio::spawn(async move { plugin.generate(&owned, &ctx).await });
            let abort = task.abort_handle();

            let output = match timeout(node_timeout, task).await {
                Ok(Ok(Ok(output))) => output,
                Ok(Ok(Err(source))) => {
                    return Err(GenerationError::Plugin {
                        node_id: node.id.clone(),
                        plugin_id,
                        source,
                    });
                }
                Ok(Err(join)) => {
                    return Err(GenerationError::Plugin {
                        node_id: node.id.clone(),
                        plugin_id,
                        source: PluginError::Panicked(panic_message(join)),
                    });
                }
                Err(_) => {
                    abort.abort();
                    return Err(GenerationError::Timeout {
                        node_id: node.id.clone(),
                        plugin_id,
                        secs: self.config.node_timeout_secs,
                    });
                }
            };

            let report = merge.merge(node, &output)?;
            let message = format!(
                "Merged {} file(s), patched {} file(s)",
                report.files.len(),
                report.patched.len()
            );
            self.store
                .add_artifact(
                    run_id,
                    Artifact::node_output(&node.id, &plugin_id, report.files, report.patched),
                )
                .await?;
            self.log(run_id, LogEntry::info(message).for_node(&node.id)).await?;
        }

        if !skipped.is_empty() {
            return Err(GenerationError::Skipped(skipped));
        }

        let repository = merge.finish();
        self.store.add_artifact(run_id, Artifact::repository(&repository)).await?;
        self.log(
            run_id,
            LogEntry::info(format!("Generated repository with {} file(s)", repository.files.len())),
        )
        .await?;
        self.store.update_status(run_id, RunStatus::Completed).await?;

        Ok(repository)
    }

    /// Appends to the run log and mirrors the entry to tracing.
    async fn log(&self, run_id: Uuid, entry: LogEntry) -> Result<(), GenerationError> {
        let node_id = entry.node_id.as_deref().unwrap_or("-");
        match entry.level {
            LogLevel::Debug => debug!(run_id = %run_id, node_id, "{}", entry.message),
            LogLevel::Info => info!(run_id = %run_id, node_id, "{}", entry.message),
            LogLevel::Warn => warn!(run_id = %run_id, node_id, "{}", entry.message),
            LogLevel::Error => error!(run_id = %run_id, node_id, "{}", entry.message),
        }
        self.store.add_log(run_id, entry).await?;
        Ok(())
    }
}

/// Why a node will not run.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Blocked {
    InvalidConfig,
    /// Inherited from this (nearest) skipped upstream node.
    Upstream(String),
}

/// Nodes with node-scoped validation errors, plus everything downstream of
/// them since their inputs will never be produced.
fn blocked_nodes<'a>(validation: &'a ValidationResult, blueprint: &'a Blueprint) -> HashMap<&'a str, Blocked> {
    let mut blocked: HashMap<&str, Blocked> = HashMap::new();
    let mut queue = VecDeque::new();
    for id in validation.errors.iter().filter_map(|i| i.node_id.as_deref()) {
        if blocked.insert(id, Blocked::InvalidConfig).is_none() {
            queue.push_back(id);
        }
    }

    let adj = adjacency(&blueprint.edges);
    while let Some(id) = queue.pop_front() {
        for &next in adj.get(id).map(Vec::as_slice).unwrap_or_default() {
            if !blocked.contains_key(next) {
                blocked.insert(next, Blocked::Upstream(id.to_string()));
                queue.push_back(next);
            }
        }
    }
    blocked
}

fn panic_message(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn issue_entry(level: LogLevel, issue: &Issue) -> LogEntry {
    let code = issue.code.as_str();
    let message = if issue.path.is_empty() {
        format!("[{}] {}", code, issue.message)
    } else {
        format!("[{}] {}: {}", code, issue.path, issue.message)
    };
    let entry = LogEntry::new(level, message);
    match &issue.node_id {
        Some(id) => entry.for_node(id),
        None => entry,
    }
}

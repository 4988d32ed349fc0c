use crate::merge::{GeneratedRepository, Manifest};
use crate::plugins::output::CodegenFile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled)
    }

    /// Transitions only move forward: `pending → running → terminal`, with
    /// `pending` allowed to fail or be cancelled before dispatch.
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        use RunStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Pending, Failed)
                | (Pending, Cancelled)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<RunStatus> {
        match s {
            "pending" => Some(RunStatus::Pending),
            "running" => Some(RunStatus::Running),
            "completed" => Some(RunStatus::Completed),
            "failed" => Some(RunStatus::Failed),
            "cancelled" => Some(RunStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            node_id: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warn, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    pub fn for_node(mut self, node_id: &str) -> Self {
        self.node_id = Some(node_id.to_string());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub body: ArtifactBody,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ArtifactBody {
    /// What one node contributed, recorded as soon as it merged.
    #[serde(rename_all = "camelCase")]
    NodeOutput {
        node_id: String,
        plugin_id: String,
        files: Vec<String>,
        patched: Vec<String>,
    },
    /// The complete generated tree, recorded once on success.
    Repository { files: Vec<CodegenFile>, manifest: Manifest },
}

impl Artifact {
    pub fn node_output(node_id: &str, plugin_id: &str, files: Vec<String>, patched: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            body: ArtifactBody::NodeOutput {
                node_id: node_id.to_string(),
                plugin_id: plugin_id.to_string(),
                files,
                patched,
            },
        }
    }

    pub fn repository(repo: &GeneratedRepository) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            body: ArtifactBody::Repository {
                files: repo.files.clone(),
                manifest: repo.manifest.clone(),
            },
        }
    }
}

/// One generation request, tracked from submission to a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub id: Uuid,
    pub blueprint_id: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

impl Run {
    pub fn new(blueprint_id: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            blueprint_id: blueprint_id.to_string(),
            status: RunStatus::Pending,
            started_at: Utc::now(),
            completed_at: None,
            error: None,
            logs: Vec::new(),
            artifacts: Vec::new(),
        }
    }

    /// Moves to `next` if the transition is allowed. Terminal states stamp
    /// `completed_at`; `error` is recorded only for failures.
    pub fn transition(&mut self, next: RunStatus, error: Option<String>) -> Result<(), (RunStatus, RunStatus)> {
        if !self.status.can_transition_to(next) {
            return Err((self.status, next));
        }
        self.status = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        if next == RunStatus::Failed {
            self.error = error;
        }
        Ok(())
    }

    /// Log entries strictly after `since` (all of them when `since` is `None`).
    pub fn logs_since(&self, since: Option<DateTime<Utc>>) -> Vec<LogEntry> {
        match since {
            Some(t) => self.logs.iter().filter(|l| l.timestamp > t).cloned().collect(),
            None => self.logs.clone(),
        }
    }

    /// The full generated tree, present only once the run completed.
    pub fn repository(&self) -> Option<GeneratedRepository> {
        self.artifacts.iter().rev().find_map(|a| match &a.body {
            ArtifactBody::Repository { files, manifest } => Some(GeneratedRepository {
                files: files.clone(),
                manifest: manifest.clone(),
            }),
            _ => None,
        })
    }
}

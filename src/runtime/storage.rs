use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;
use crate::runtime::run::{Artifact, LogEntry, Run, RunStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("run not found: {0}")]
    NotFound(Uuid),
    #[error("run {id}: invalid status transition {from} -> {to}")]
    InvalidTransition { id: Uuid, from: RunStatus, to: RunStatus },
    #[error("run {0} is finalized and can no longer change")]
    Finalized(Uuid),
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

// --- Interface ---

/// Persistence contract for runs. Implementations must make every method
/// atomic per run and must enforce the forward-only status transitions of
/// [`RunStatus::can_transition_to`].
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Creates a new `pending` run.
    async fn create(&self, blueprint_id: &str) -> StoreResult<Run>;
    async fn get(&self, id: Uuid) -> StoreResult<Option<Run>>;
    async fn update_status(&self, id: Uuid, status: RunStatus) -> StoreResult<Run>;
    /// Terminal `failed` transition that records `reason`. Logs and artifacts
    /// accumulated so far are kept.
    async fn fail(&self, id: Uuid, reason: &str) -> StoreResult<Run>;
    async fn add_log(&self, id: Uuid, entry: LogEntry) -> StoreResult<()>;
    async fn add_artifact(&self, id: Uuid, artifact: Artifact) -> StoreResult<()>;
    /// Cancels a `pending` or `running` run.
    async fn cancel(&self, id: Uuid) -> StoreResult<Run>;

    /// Current status only; backends may answer this cheaper than `get`.
    async fn status(&self, id: Uuid) -> StoreResult<RunStatus> {
        self.get(id).await?.map(|r| r.status).ok_or(StoreError::NotFound(id))
    }
}

// --- In-Memory Implementation ---

#[derive(Default)]
pub struct InMemoryRunStore {
    runs: DashMap<Uuid, Run>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self { runs: DashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    fn transition(&self, id: Uuid, status: RunStatus, error: Option<String>, note: Option<LogEntry>) -> StoreResult<Run> {
        // The entry guard holds the shard lock, so check-and-set is atomic.
        let mut run = self.runs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        let from = run.status;
        run.transition(status, error)
            .map_err(|(from, to)| StoreError::InvalidTransition { id, from, to })?;
        if let Some(note) = note {
            run.logs.push(note);
        }
        tracing::debug!(run_id = %id, from = %from, to = %status, "Run status changed");
        Ok(run.clone())
    }
}

#[async_trait]
impl RunStore for InMemoryRunStore {
    async fn create(&self, blueprint_id: &str) -> StoreResult<Run> {
        let run = Run::new(blueprint_id);
        self.runs.insert(run.id, run.clone());
        Ok(run)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Run>> {
        Ok(self.runs.get(&id).map(|r| r.value().clone()))
    }

    async fn update_status(&self, id: Uuid, status: RunStatus) -> StoreResult<Run> {
        self.transition(id, status, None, None)
    }

    async fn fail(&self, id: Uuid, reason: &str) -> StoreResult<Run> {
        self.transition(id, RunStatus::Failed, Some(reason.to_string()), None)
    }

    async fn add_log(&self, id: Uuid, entry: LogEntry) -> StoreResult<()> {
        let mut run = self.runs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if run.status.is_terminal() {
            return Err(StoreError::Finalized(id));
        }
        run.logs.push(entry);
        Ok(())
    }

    async fn add_artifact(&self, id: Uuid, artifact: Artifact) -> StoreResult<()> {
        let mut run = self.runs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if run.status.is_terminal() {
            return Err(StoreError::Finalized(id));
        }
        run.artifacts.push(artifact);
        Ok(())
    }

    async fn cancel(&self, id: Uuid) -> StoreResult<Run> {
        self.transition(id, RunStatus::Cancelled, None, Some(LogEntry::warn("Run cancelled")))
    }

    async fn status(&self, id: Uuid) -> StoreResult<RunStatus> {
        self.runs.get(&id).map(|r| r.status).ok_or(StoreError::NotFound(id))
    }
}

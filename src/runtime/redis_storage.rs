use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use std::collections::HashMap;
use uuid::Uuid;
use crate::runtime::run::{Artifact, LogEntry, Run, RunStatus};
use crate::runtime::storage::{RunStore, StoreError, StoreResult};

const STATUSES: [RunStatus; 5] = [
    RunStatus::Pending,
    RunStatus::Running,
    RunStatus::Completed,
    RunStatus::Failed,
    RunStatus::Cancelled,
];

// KEYS[1] = run hash, KEYS[2] = log list
// ARGV[1] = new status, ARGV[2] = completed_at or "", ARGV[3] = error or "",
// ARGV[4] = log entry json or "", ARGV[5..] = statuses allowed to move to ARGV[1]
const TRANSITION_SCRIPT: &str = r#"
    local current = redis.call("HGET", KEYS[1], "status")
    if not current then
        return {"missing", ""}
    end
    for i = 5, #ARGV do
        if ARGV[i] == current then
            redis.call("HSET", KEYS[1], "status", ARGV[1])
            if ARGV[2] ~= "" then
                redis.call("HSET", KEYS[1], "completed_at", ARGV[2])
            end
            if ARGV[3] ~= "" then
                redis.call("HSET", KEYS[1], "error", ARGV[3])
            end
            if ARGV[4] ~= "" then
                redis.call("RPUSH", KEYS[2], ARGV[4])
            end
            return {"ok", current}
        end
    end
    return {"rejected", current}
"#;

// KEYS[1] = run hash, KEYS[2] = list to append to, ARGV[1] = json item
const APPEND_SCRIPT: &str = r#"
    local current = redis.call("HGET", KEYS[1], "status")
    if not current then
        return "missing"
    end
    if current == "completed" or current == "failed" or current == "cancelled" then
        return "finalized"
    end
    redis.call("RPUSH", KEYS[2], ARGV[1])
    return "ok"
"#;

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// Run store backed by Redis: one hash per run plus log and artifact lists.
pub struct RedisRunStore {
    client: redis::Client,
    prefix: String,
}

impl RedisRunStore {
    pub fn new(client: redis::Client, prefix: &str) -> Self {
        Self {
            client,
            prefix: prefix.to_string(),
        }
    }

    fn run_key(&self, id: Uuid) -> String {
        format!("{}:run:{}", self.prefix, id)
    }

    fn logs_key(&self, id: Uuid) -> String {
        format!("{}:run:{}:logs", self.prefix, id)
    }

    fn artifacts_key(&self, id: Uuid) -> String {
        format!("{}:run:{}:artifacts", self.prefix, id)
    }

    async fn transition(&self, id: Uuid, status: RunStatus, error: Option<&str>, note: Option<LogEntry>) -> StoreResult<Run> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let completed_at = if status.is_terminal() {
            Utc::now().to_rfc3339()
        } else {
            String::new()
        };
        let note = match note {
            Some(entry) => serde_json::to_string(&entry)?,
            None => String::new(),
        };

        let script = redis::Script::new(TRANSITION_SCRIPT);
        let mut invocation = script.key(self.run_key(id));
        invocation
            .key(self.logs_key(id))
            .arg(status.as_str())
            .arg(completed_at)
            .arg(error.unwrap_or(""))
            .arg(note);
        for from in STATUSES.iter().filter(|s| s.can_transition_to(status)) {
            invocation.arg(from.as_str());
        }

        let result: Vec<String> = invocation.invoke_async(&mut conn).await?;
        match result.first().map(String::as_str) {
            Some("ok") => {}
            Some("missing") => return Err(StoreError::NotFound(id)),
            _ => {
                let from = result
                    .get(1)
                    .and_then(|s| RunStatus::parse(s))
                    .ok_or_else(|| StoreError::Backend(format!("unexpected script reply: {:?}", result)))?;
                return Err(StoreError::InvalidTransition { id, from, to: status });
            }
        }

        self.get(id).await?.ok_or(StoreError::NotFound(id))
    }

    async fn append(&self, id: Uuid, list_key: String, item: String) -> StoreResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let reply: String = redis::Script::new(APPEND_SCRIPT)
            .key(self.run_key(id))
            .key(list_key)
            .arg(item)
            .invoke_async(&mut conn)
            .await?;

        match reply.as_str() {
            "ok" => Ok(()),
            "missing" => Err(StoreError::NotFound(id)),
            "finalized" => Err(StoreError::Finalized(id)),
            other => Err(StoreError::Backend(format!("unexpected script reply: {}", other))),
        }
    }
}

fn parse_time(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Backend(format!("bad timestamp '{}': {}", raw, e)))
}

#[async_trait]
impl RunStore for RedisRunStore {
    async fn create(&self, blueprint_id: &str) -> StoreResult<Run> {
        let run = Run::new(blueprint_id);
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let fields = [
            ("blueprint_id", run.blueprint_id.clone()),
            ("status", run.status.as_str().to_string()),
            ("started_at", run.started_at.to_rfc3339()),
        ];
        let _: () = conn.hset_multiple(self.run_key(run.id), &fields[..]).await?;
        Ok(run)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Run>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let (fields, logs, artifacts): (HashMap<String, String>, Vec<String>, Vec<String>) = redis::pipe()
            .atomic()
            .hgetall(self.run_key(id))
            .lrange(self.logs_key(id), 0, -1)
            .lrange(self.artifacts_key(id), 0, -1)
            .query_async(&mut conn)
            .await?;

        if fields.is_empty() {
            return Ok(None);
        }

        let status = fields
            .get("status")
            .and_then(|s| RunStatus::parse(s))
            .ok_or_else(|| StoreError::Backend(format!("run {} has no valid status", id)))?;
        let started_at = parse_time(fields.get("started_at").map(String::as_str).unwrap_or(""))?;
        let completed_at = match fields.get("completed_at") {
            Some(raw) => Some(parse_time(raw)?),
            None => None,
        };

        let mut run = Run {
            id,
            blueprint_id: fields.get("blueprint_id").cloned().unwrap_or_default(),
            status,
            started_at,
            completed_at,
            error: fields.get("error").cloned(),
            logs: Vec::with_capacity(logs.len()),
            artifacts: Vec::with_capacity(artifacts.len()),
        };
        for raw in logs {
            run.logs.push(serde_json::from_str(&raw)?);
        }
        for raw in artifacts {
            run.artifacts.push(serde_json::from_str(&raw)?);
        }
        Ok(Some(run))
    }

    async fn update_status(&self, id: Uuid, status: RunStatus) -> StoreResult<Run> {
        self.transition(id, status, None, None).await
    }

    async fn fail(&self, id: Uuid, reason: &str) -> StoreResult<Run> {
        self.transition(id, RunStatus::Failed, Some(reason), None).await
    }

    async fn add_log(&self, id: Uuid, entry: LogEntry) -> StoreResult<()> {
        let item = serde_json::to_string(&entry)?;
        self.append(id, self.logs_key(id), item).await
    }

    async fn add_artifact(&self, id: Uuid, artifact: Artifact) -> StoreResult<()> {
        let item = serde_json::to_string(&artifact)?;
        self.append(id, self.artifacts_key(id), item).await
    }

    async fn cancel(&self, id: Uuid) -> StoreResult<Run> {
        self.transition(id, RunStatus::Cancelled, None, Some(LogEntry::warn("Run cancelled"))).await
    }

    async fn status(&self, id: Uuid) -> StoreResult<RunStatus> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.hget(self.run_key(id), "status").await?;
        let raw = raw.ok_or(StoreError::NotFound(id))?;
        RunStatus::parse(&raw).ok_or_else(|| StoreError::Backend(format!("run {} has invalid status '{}'", id, raw)))
    }
}

use super::error::{ApiError, ApiResult};
use super::state::AppState;
use crate::compiler::validator::{ValidationResult, Validator};
use crate::dsl::NodeType;
use crate::plugins::{PluginMetadata, Port};
use crate::runtime::run::{Artifact, LogEntry, Run, RunStatus};
use crate::schema::ConfigSchema;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRef {
    pub id: Uuid,
    pub status: RunStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsResponse {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub logs: Vec<LogEntry>,
    /// More entries may still arrive.
    pub has_more: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactsResponse {
    pub run_id: Uuid,
    pub artifacts: Vec<Artifact>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginInfo {
    #[serde(flatten)]
    pub metadata: PluginMetadata,
    pub node_type: NodeType,
    pub ports: Vec<Port>,
    pub config_schema: ConfigSchema,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: String,
    pub uptime_secs: i64,
}

/// Malformed ids cannot name an existing run.
fn parse_run_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(format!("run {} not found", raw)))
}

async fn load_run(state: &AppState, raw_id: &str) -> ApiResult<Run> {
    let id = parse_run_id(raw_id)?;
    state
        .orchestrator
        .store()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("run {} not found", id)))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: state.version.clone(),
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    })
}

pub async fn list_plugins(State(state): State<AppState>) -> Json<Vec<PluginInfo>> {
    let plugins = state
        .orchestrator
        .registry()
        .list()
        .into_iter()
        .map(|p| PluginInfo {
            metadata: p.metadata().clone(),
            node_type: p.node_type(),
            ports: p.ports().to_vec(),
            config_schema: p.config_schema().clone(),
        })
        .collect();
    Json(plugins)
}

pub async fn validate_blueprint(State(state): State<AppState>, Json(raw): Json<Value>) -> Json<ValidationResult> {
    let (result, _) = Validator::new(state.orchestrator.registry()).validate_value(&raw);
    Json(result)
}

/// Accepts a blueprint and starts a run for it. Only an unusable base shape
/// is rejected here; every other problem fails the run itself.
pub async fn submit_run(
    State(state): State<AppState>,
    Json(raw): Json<Value>,
) -> ApiResult<(StatusCode, Json<RunRef>)> {
    let (result, blueprint) = Validator::new(state.orchestrator.registry()).validate_value(&raw);
    let Some(blueprint) = blueprint else {
        return Err(ApiError::InvalidBlueprint(result.errors));
    };

    let run = state.orchestrator.submit(blueprint).await?;
    tracing::info!(run_id = %run.id, blueprint_id = %run.blueprint_id, "Accepted run");

    Ok((
        StatusCode::ACCEPTED,
        Json(RunRef {
            id: run.id,
            status: run.status,
        }),
    ))
}

pub async fn get_run(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Run>> {
    Ok(Json(load_run(&state, &id).await?))
}

pub async fn get_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> ApiResult<Json<LogsResponse>> {
    let run = load_run(&state, &id).await?;
    Ok(Json(LogsResponse {
        run_id: run.id,
        status: run.status,
        logs: run.logs_since(query.since),
        has_more: !run.status.is_terminal(),
    }))
}

pub async fn get_artifacts(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<ArtifactsResponse>> {
    let run = load_run(&state, &id).await?;
    if run.status != RunStatus::Completed {
        return Err(ApiError::BadRequest(format!(
            "run {} is {}; artifacts are available once it has completed",
            run.id, run.status
        )));
    }
    Ok(Json(ArtifactsResponse {
        run_id: run.id,
        artifacts: run.artifacts,
    }))
}

pub async fn cancel_run(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<RunRef>> {
    let run = load_run(&state, &id).await?;
    if run.status.is_terminal() {
        return Err(ApiError::BadRequest(format!("run {} is already {}", run.id, run.status)));
    }
    let run = state.orchestrator.cancel(run.id).await?;
    Ok(Json(RunRef {
        id: run.id,
        status: run.status,
    }))
}

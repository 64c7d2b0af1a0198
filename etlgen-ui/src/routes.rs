//! HTTP route handlers for the UI API.

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use etlgen::core::fence::strip_code_fences;
use etlgen::io::instructions::{SAMPLE_FILE_NAME, SAMPLE_INSTRUCTIONS, validate_instructions};
use etlgen::io::pipeline::{PipelineRequest, run_pipeline};
use tracing::{error, info, warn};

use crate::sse;
use crate::state::{AppState, RunRecord, RunSummary};

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/sample", get(get_sample))
        .route("/generate", post(generate))
        .route("/runs", get(list_runs))
        .route("/runs/latest", get(get_latest_run))
        .route("/runs/{run_id}", get(get_run))
        .route("/runs/{run_id}/archive", get(get_archive))
        .route("/runs/{run_id}/code", get(sse::code_handler))
}

/// Handler error rendered as a plain-text body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(run_id: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("run {run_id} not found"))
    }

    fn internal(err: &anyhow::Error) -> Self {
        error!(error = %format!("{err:#}"), "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

async fn health() -> &'static str {
    "ok"
}

/// GET /api/sample - bundled sample instructions as a download.
async fn get_sample() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{SAMPLE_FILE_NAME}\""),
            ),
        ],
        SAMPLE_INSTRUCTIONS,
    )
}

/// POST /api/generate - generate, run and package code for the request body.
///
/// The model call and the pipeline run on the blocking pool. Model failures map
/// to 502, pipeline failures (filesystem, missing interpreter) to 500.
pub async fn generate(
    State(state): State<AppState>,
    instructions: String,
) -> Result<Json<RunSummary>, ApiError> {
    validate_instructions(&instructions)
        .map_err(|err| ApiError::new(StatusCode::BAD_REQUEST, err.to_string()))?;

    let generator = state.generator.clone();
    let raw = tokio::task::spawn_blocking(move || generator.generate(&instructions))
        .await
        .map_err(|err| ApiError::internal(&err.into()))?
        .map_err(|err| {
            warn!(error = %format!("{err:#}"), "code generation failed");
            ApiError::new(
                StatusCode::BAD_GATEWAY,
                format!("code generation failed: {err:#}"),
            )
        })?;
    let code = strip_code_fences(&raw);

    let request = PipelineRequest::from_config(&state.base_dir, &state.config);
    let pipeline_code = code.clone();
    let outcome = tokio::task::spawn_blocking(move || run_pipeline(&request, &pipeline_code))
        .await
        .map_err(|err| ApiError::internal(&err.into()))?
        .map_err(|err| ApiError::internal(&err))?;

    let record = state.record_run(RunRecord::new(code, outcome)).await;
    info!(run_id = %record.run_id, "run recorded");
    Ok(Json(record.summary()))
}

/// GET /api/runs - summaries of all runs in this server's lifetime.
async fn list_runs(State(state): State<AppState>) -> Json<Vec<RunSummary>> {
    let runs = state.list_runs().await;
    Json(runs.iter().map(|run| run.summary()).collect())
}

async fn get_latest_run(State(state): State<AppState>) -> Result<Json<RunSummary>, ApiError> {
    state
        .latest_run()
        .await
        .map(|run| Json(run.summary()))
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "no runs yet"))
}

async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<RunSummary>, ApiError> {
    state
        .get_run(&run_id)
        .await
        .map(|run| Json(run.summary()))
        .ok_or_else(|| ApiError::not_found(&run_id))
}

/// GET /api/runs/:run_id/archive - zip bytes as an attachment.
pub async fn get_archive(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Response, ApiError> {
    let run = state
        .get_run(&run_id)
        .await
        .ok_or_else(|| ApiError::not_found(&run_id))?;
    let archive = run.outcome.archive.as_ref().ok_or_else(|| {
        ApiError::new(
            StatusCode::NOT_FOUND,
            format!("run {run_id} produced no archive"),
        )
    })?;

    let bytes = tokio::fs::read(&archive.path).await.map_err(|err| {
        let err = anyhow::Error::new(err)
            .context(format!("read archive {}", archive.path.display()));
        ApiError::internal(&err)
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", archive.file_name()),
            ),
        ],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use etlgen::io::generator::CodeGenerator;
    use etlgen::test_support::{ScriptedGenerator, TestWorkspace, sh_config};

    fn state(workspace: &TestWorkspace, generator: ScriptedGenerator) -> AppState {
        let generator: Arc<dyn CodeGenerator> = Arc::new(generator);
        AppState::new(workspace.path().to_path_buf(), sh_config(), generator)
    }

    #[tokio::test]
    async fn generate_records_run_and_serves_archive() {
        let workspace = TestWorkspace::new().expect("workspace");
        let state = state(&workspace, ScriptedGenerator::always("```python\necho hi > out.txt\n```"));

        let Json(summary) = generate(State(state.clone()), "Project Title: Demo".to_string())
            .await
            .expect("generate");

        assert!(summary.execution.status.is_success());
        assert_eq!(summary.tree, vec!["out.txt", "run.sh"]);
        assert_eq!(summary.line_count, 1);
        let latest = state.latest_run().await.expect("latest");
        assert_eq!(latest.run_id, summary.run_id);
        assert_eq!(latest.code, "echo hi > out.txt");

        let response = get_archive(State(state), Path(summary.run_id.clone()))
            .await
            .expect("archive");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/zip"
        );
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .expect("header");
        assert!(disposition.contains(&format!("{}.zip", summary.run_id)));
    }

    #[tokio::test]
    async fn blank_instructions_are_bad_request() {
        let workspace = TestWorkspace::new().expect("workspace");
        let generator = ScriptedGenerator::new(Vec::new());
        let state = state(&workspace, generator);

        let err = generate(State(state), "   \n".to_string())
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn generator_failure_is_bad_gateway() {
        let workspace = TestWorkspace::new().expect("workspace");
        let state = state(
            &workspace,
            ScriptedGenerator::new(vec![Err("rate limited".to_string())]),
        );

        let err = generate(State(state.clone()), "build".to_string())
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert!(err.message.contains("rate limited"));
        assert!(state.latest_run().await.is_none());
    }

    #[tokio::test]
    async fn unknown_run_is_not_found() {
        let workspace = TestWorkspace::new().expect("workspace");
        let state = state(&workspace, ScriptedGenerator::new(Vec::new()));

        let err = get_archive(State(state), Path("missing".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}

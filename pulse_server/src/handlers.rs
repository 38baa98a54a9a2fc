//! HTTP handlers for the REST API.
//!
//! Each forecast handler parses the request, then prepares and trains its
//! series on the blocking pool under the configured deadline and publishes the
//! composed report. Preparation still rejects bad data before any training.

use axum::{body::Bytes, extract::State, Json};
use pulse_forecast::events::{commit_dates, parse_issues, pull_dates, ActivityKind};
use pulse_forecast::models::{CancellationFlag, DenseNetwork, NaiveLastValue};
use pulse_forecast::pipeline::{prepare_issues, prepare_monthly, PipelineConfig};
use pulse_forecast::report::{compose_issue_report, compose_monthly_report, Report};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::ModelKind;
use crate::dto::{
    parse_body, validated_repo, CommitsForecastRequest, ForecastResponse, HealthResponse,
    IssueForecastRequest, PullsForecastRequest,
};
use crate::error::AppError;
use crate::publish::publish_report;
use crate::state::AppState;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

/// Run `job` on the blocking pool, cancelling it once `deadline` passes
pub async fn run_with_deadline<T, F>(deadline: Duration, job: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&CancellationFlag) -> pulse_forecast::Result<T> + Send + 'static,
{
    let cancel = CancellationFlag::new();
    let worker_cancel = cancel.clone();
    let handle = tokio::task::spawn_blocking(move || job(&worker_cancel));

    match tokio::time::timeout(deadline, handle).await {
        Ok(Ok(result)) => Ok(result?),
        Ok(Err(e)) => Err(AppError::Internal(format!("training task failed: {}", e))),
        Err(_) => {
            cancel.cancel();
            warn!(?deadline, "training deadline exceeded, cancelling");
            Err(AppError::Timeout(deadline))
        }
    }
}

async fn respond(state: &AppState, report: Report) -> HandlerResult<ForecastResponse> {
    let response = publish_report(
        report,
        state.renderer.clone(),
        state.store.clone(),
        &state.config.base_image_path,
    )
    .await?;
    Ok(Json(response))
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /api/forecast
///
/// Forecast the daily issue series selected by `type` and chart issue activity.
pub async fn forecast_issues(
    State(state): State<AppState>,
    body: Bytes,
) -> HandlerResult<ForecastResponse> {
    let request: IssueForecastRequest = parse_body(&body)?;
    let repo = validated_repo(&request.repo)?.to_string();
    let issues = parse_issues(&request.issues)?;
    let field = request.field;
    info!(repo = %repo, field = %field, issues = issues.len(), "issue forecast requested");

    let model = state.config.forecast_model;
    let analysis = run_with_deadline(state.config.training_timeout(), move |cancel| {
        let prepared = prepare_issues(&issues, field, &PipelineConfig::daily_issues())?;
        match model {
            ModelKind::Dense => prepared.run(&DenseNetwork::default(), cancel),
            ModelKind::Naive => prepared.run(&NaiveLastValue, cancel),
        }
    })
    .await?;

    respond(&state, compose_issue_report(&analysis, &repo)).await
}

async fn forecast_monthly(
    state: AppState,
    kind: ActivityKind,
    repo: &str,
    dates: Vec<chrono::NaiveDate>,
) -> HandlerResult<ForecastResponse> {
    let repo = validated_repo(repo)?.to_string();
    info!(repo = %repo, kind = kind.noun(), events = dates.len(), "monthly forecast requested");

    let model = state.config.forecast_model;
    let analysis = run_with_deadline(state.config.training_timeout(), move |cancel| {
        let prepared = prepare_monthly(kind, &dates, &PipelineConfig::monthly_activity())?;
        match model {
            ModelKind::Dense => prepared.run(&DenseNetwork::default(), cancel),
            ModelKind::Naive => prepared.run(&NaiveLastValue, cancel),
        }
    })
    .await?;

    respond(&state, compose_monthly_report(&analysis, &repo)).await
}

/// POST /api/pulls
pub async fn forecast_pulls(
    State(state): State<AppState>,
    body: Bytes,
) -> HandlerResult<ForecastResponse> {
    let request: PullsForecastRequest = parse_body(&body)?;
    let dates = pull_dates(&request.pulls)?;
    forecast_monthly(state, ActivityKind::Pulls, &request.repo, dates).await
}

/// POST /api/commits
pub async fn forecast_commits(
    State(state): State<AppState>,
    body: Bytes,
) -> HandlerResult<ForecastResponse> {
    let request: CommitsForecastRequest = parse_body(&body)?;
    let dates = commit_dates(&request.commits)?;
    forecast_monthly(state, ActivityKind::Commits, &request.repo, dates).await
}

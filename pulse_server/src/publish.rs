//! Rendering and upload of a report's charts.
//!
//! Publishing is all or nothing. Every chart is rendered before anything is
//! uploaded, and when an upload fails the objects it replaced are restored.
//! The URLs in a successful response therefore always name stored objects,
//! and a failed request leaves the previously returned URLs intact.

use futures::future::join_all;
use pulse_forecast::report::{ChartRenderer, RenderedChart, Report};
use pulse_forecast::ForecastError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::dto::ForecastResponse;
use crate::error::AppError;
use crate::storage::{ObjectStore, StorageError};

/// Render every chart on the blocking pool, in parallel
pub async fn render_charts(
    report: &Report,
    renderer: Arc<dyn ChartRenderer>,
) -> Result<Vec<RenderedChart>, AppError> {
    let tasks = report.charts.iter().cloned().map(|chart| {
        let renderer = Arc::clone(&renderer);
        tokio::task::spawn_blocking(move || {
            let bytes = renderer.render(&chart);
            (chart, bytes)
        })
    });

    let mut rendered = Vec::with_capacity(report.charts.len());
    let mut failures = Vec::new();
    for outcome in join_all(tasks).await {
        match outcome {
            Ok((chart, Ok(bytes))) => rendered.push(RenderedChart {
                key: chart.key,
                artifact: chart.artifact,
                bytes,
            }),
            Ok((chart, Err(e))) => failures.push(format!("{}: {}", chart.artifact, e)),
            Err(e) => failures.push(format!("render task failed: {}", e)),
        }
    }

    if failures.is_empty() {
        Ok(rendered)
    } else {
        Err(ForecastError::Render(failures.join("; ")).into())
    }
}

/// Upload rendered charts concurrently, restoring the previous objects on any failure
///
/// Existing objects under the chart names are read first. When an upload
/// fails, every name this call overwrote gets its previous contents back, and
/// names that did not exist before are deleted. Returns the stored artifact
/// names keyed by response field.
pub async fn upload_charts(
    charts: Vec<RenderedChart>,
    store: Arc<dyn ObjectStore>,
    content_type: &str,
) -> Result<Vec<(String, String)>, AppError> {
    let snapshots = join_all(charts.iter().map(|chart| {
        let store = Arc::clone(&store);
        async move { (chart.artifact.clone(), store.fetch(&chart.artifact).await) }
    }))
    .await;

    let mut previous: HashMap<String, Option<Vec<u8>>> = HashMap::new();
    let mut unreadable = Vec::new();
    for (artifact, result) in snapshots {
        match result {
            Ok(bytes) => {
                previous.insert(artifact, bytes);
            }
            Err(e) => unreadable.push((artifact, e)),
        }
    }
    if !unreadable.is_empty() {
        warn!(failed = unreadable.len(), "could not read existing charts, nothing uploaded");
        return Err(persistence_error(unreadable, "nothing uploaded".to_string()));
    }

    let uploads = charts.into_iter().map(|chart| {
        let store = Arc::clone(&store);
        async move {
            let result = store.put(&chart.artifact, chart.bytes, content_type).await;
            (chart.key, chart.artifact, result)
        }
    });

    let mut stored = Vec::new();
    let mut failed = Vec::new();
    for (key, artifact, result) in join_all(uploads).await {
        match result {
            Ok(()) => stored.push((key, artifact)),
            Err(e) => failed.push((artifact, e)),
        }
    }

    if failed.is_empty() {
        info!(count = stored.len(), store = %store.describe(), "charts uploaded");
        return Ok(stored);
    }

    let restores = stored.iter().map(|(_, artifact)| {
        let store = Arc::clone(&store);
        let earlier = previous.remove(artifact).flatten();
        async move {
            let result = match earlier {
                Some(bytes) => store.put(artifact, bytes, content_type).await,
                None => store.delete(artifact).await,
            };
            (artifact, result)
        }
    });
    for (artifact, result) in join_all(restores.collect::<Vec<_>>()).await {
        if let Err(e) = result {
            warn!(artifact = %artifact, error = %e, "failed to roll back upload");
        }
    }

    let rolled_back = stored.len();
    warn!(failed = failed.len(), rolled_back, "chart upload failed");
    Err(persistence_error(
        failed,
        format!("rolled back {} uploaded charts", rolled_back),
    ))
}

fn persistence_error(failed: Vec<(String, StorageError)>, outcome: String) -> AppError {
    let details = failed
        .iter()
        .map(|(artifact, e)| format!("{}: {}", artifact, e))
        .collect::<Vec<_>>()
        .join("; ");
    AppError::Persistence {
        failed: failed.into_iter().map(|(artifact, _)| artifact).collect(),
        details: format!("{} ({})", details, outcome),
    }
}

/// Render, upload and describe a report as a response body
pub async fn publish_report(
    report: Report,
    renderer: Arc<dyn ChartRenderer>,
    store: Arc<dyn ObjectStore>,
    base_image_path: &str,
) -> Result<ForecastResponse, AppError> {
    let content_type = renderer.content_type();
    let rendered = render_charts(&report, renderer).await?;
    let stored = upload_charts(rendered, store, content_type).await?;

    let mut response = ForecastResponse {
        fields: report.summary,
    };
    for (key, artifact) in stored {
        response
            .fields
            .insert(key, Value::String(format!("{}{}", base_image_path, artifact)));
    }
    Ok(response)
}

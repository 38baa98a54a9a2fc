//! Chart composition for forecast reports
//!
//! The composer only shapes analysis results into [`ChartSpec`]s and summary
//! fields. Turning a chart description into an image is the job of a [`ChartRenderer`].

use crate::aggregate::Aggregate;
use crate::error::Result;
use crate::events::IssueField;
use crate::models::TrainingHistory;
use crate::pipeline::{IssueAnalysis, MonthlyAnalysis, SeriesForecast};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// File extension of rendered artifacts
pub const IMAGE_EXTENSION: &str = "png";

/// How a series is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SeriesKind {
    Line,
    /// Line with a marker at every point
    Markers,
    /// Bar from `base` up to `y`
    Bar,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub x: f64,
    pub y: f64,
    pub base: f64,
}

impl ChartPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, base: 0.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub label: String,
    pub kind: SeriesKind,
    pub points: Vec<ChartPoint>,
}

impl ChartSeries {
    fn indexed(label: &str, kind: SeriesKind, offset: usize, values: &[f64]) -> Self {
        Self {
            label: label.to_string(),
            kind,
            points: values
                .iter()
                .enumerate()
                .map(|(i, &y)| ChartPoint::new((offset + i) as f64, y))
                .collect(),
        }
    }
}

/// Renderable description of one chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    /// Response field carrying the chart URL
    pub key: String,
    /// Object name the rendered image is stored under
    pub artifact: String,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Category labels by integer x position, empty for a numeric axis
    pub x_ticks: Vec<String>,
    pub series: Vec<ChartSeries>,
}

/// Chart specs plus scalar fields of one response
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Report {
    pub charts: Vec<ChartSpec>,
    pub summary: BTreeMap<String, Value>,
}

/// Image bytes for one chart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedChart {
    pub key: String,
    pub artifact: String,
    pub bytes: Vec<u8>,
}

/// Turns chart specs into encoded images
pub trait ChartRenderer: Send + Sync {
    fn render(&self, chart: &ChartSpec) -> Result<Vec<u8>>;

    /// MIME type of the produced images
    fn content_type(&self) -> &'static str {
        "image/png"
    }
}


/// Last path segment of `owner/name`
pub fn repo_short_name(repo: &str) -> &str {
    repo.trim_end_matches('/').rsplit('/').next().unwrap_or(repo)
}

/// `<artifact>_<field>_<repo>.png`
pub fn issue_artifact_name(artifact: &str, field: IssueField, repo: &str) -> String {
    format!("{}_{}_{}.{}", artifact, field, repo, IMAGE_EXTENSION)
}

/// `<artifact>_<repo name>.png`
pub fn activity_artifact_name(artifact: &str, repo: &str) -> String {
    format!("{}_{}.{}", artifact, repo_short_name(repo), IMAGE_EXTENSION)
}

fn loss_series(history: &TrainingHistory) -> Vec<ChartSeries> {
    vec![
        ChartSeries::indexed("Train Loss", SeriesKind::Line, 0, &history.train_losses()),
        ChartSeries::indexed("Test Loss", SeriesKind::Line, 0, &history.validation_losses()),
    ]
}

fn bucket_line(label: &str, aggregate: &Aggregate) -> ChartSeries {
    ChartSeries::indexed(label, SeriesKind::Line, 0, &aggregate.values())
}

fn insert_peak(summary: &mut BTreeMap<String, Value>, key: &str, aggregate: &Aggregate) {
    let (label, count) = match aggregate.peak() {
        Some(bucket) => (Value::from(bucket.label.clone()), Value::from(bucket.count)),
        None => (Value::Null, Value::Null),
    };
    summary.insert(format!("{}1", key), label);
    summary.insert(format!("{}2", key), count);
}

fn forecast_overlay(forecast: &SeriesForecast) -> Vec<ChartSeries> {
    let train_len = forecast.train_targets.len();
    vec![
        ChartSeries::indexed("history", SeriesKind::Line, 0, &forecast.train_targets),
        ChartSeries::indexed("true", SeriesKind::Markers, train_len, &forecast.test_targets),
        ChartSeries::indexed(
            "prediction",
            SeriesKind::Line,
            train_len,
            forecast.predictions.values(),
        ),
    ]
}

/// Charts and summary fields for the issue endpoint
pub fn compose_issue_report(analysis: &IssueAnalysis, repo: &str) -> Report {
    let field = analysis.field;
    let aggregates = &analysis.aggregates;
    let spec = |key: &str, artifact: &str, title: String, x_label: &str, y_label: &str| ChartSpec {
        key: key.to_string(),
        artifact: issue_artifact_name(artifact, field, repo),
        title,
        x_label: x_label.to_string(),
        y_label: y_label.to_string(),
        x_ticks: Vec::new(),
        series: Vec::new(),
    };

    let model_loss = ChartSpec {
        series: loss_series(&analysis.forecast.history),
        ..spec(
            "model_loss_image_url",
            "model_loss",
            format!("Model Loss For {}", field),
            "Epochs",
            "Loss",
        )
    };

    let generated = ChartSpec {
        series: forecast_overlay(&analysis.forecast),
        ..spec(
            "lstm_generated_image_url",
            "lstm_generated_data",
            format!("Forecast Generated Data For {}", field),
            "Time Steps",
            "Issues",
        )
    };

    let all_issues = ChartSpec {
        x_ticks: analysis
            .daily
            .dates()
            .iter()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .collect(),
        series: vec![ChartSeries::indexed(
            "Issues",
            SeriesKind::Markers,
            0,
            &analysis.daily.values(),
        )],
        ..spec(
            "all_issues_data_image",
            "all_issues_data",
            "All Issues Data".to_string(),
            "Date",
            "Issues",
        )
    };

    let created = aggregates.created_by_month.values();
    let closed = aggregates.closed_by_month.values();
    let stacked = ChartSpec {
        x_ticks: aggregates.created_by_month.labels(),
        series: vec![
            ChartSeries::indexed("Created Issues", SeriesKind::Bar, 0, &created),
            ChartSeries {
                label: "Closed Issues".to_string(),
                kind: SeriesKind::Bar,
                points: closed
                    .iter()
                    .zip(&created)
                    .enumerate()
                    .map(|(i, (&c, &base))| ChartPoint {
                        x: i as f64,
                        y: base + c,
                        base,
                    })
                    .collect(),
            },
        ],
        ..spec(
            "stacked_bar_chart",
            "stacked_bar_chart",
            "Created and Closed Issues per Month".to_string(),
            "Month",
            "Issues",
        )
    };

    let week_created = ChartSpec {
        x_ticks: aggregates.created_by_weekday.labels(),
        series: vec![bucket_line("Issues", &aggregates.created_by_weekday)],
        ..spec(
            "week_line_chart",
            "week_line_chart",
            "Number of Issues Created for particular Week Days.".to_string(),
            "Week Days",
            "Number of Issues",
        )
    };

    let week_closed = ChartSpec {
        x_ticks: aggregates.closed_by_weekday.labels(),
        series: vec![bucket_line("Issues", &aggregates.closed_by_weekday)],
        ..spec(
            "week_line_chart_closed",
            "week_line_chart_closed",
            "Number of Issues Closed for particular Week Days.".to_string(),
            "Week Days",
            "Number of Issues",
        )
    };

    let month_closed = ChartSpec {
        x_ticks: aggregates.closed_by_month_name.labels(),
        series: vec![bucket_line("Issues", &aggregates.closed_by_month_name)],
        ..spec(
            "month_line_chart_closed",
            "month_line_chart_closed",
            "Number of Issues Closed for particular Month.".to_string(),
            "Month Names",
            "Number of Issues",
        )
    };

    let mut summary = BTreeMap::new();
    insert_peak(&mut summary, "week_line_chart", &aggregates.created_by_weekday);
    insert_peak(&mut summary, "week_line_chart_closed", &aggregates.closed_by_weekday);
    insert_peak(&mut summary, "month_line_chart_closed", &aggregates.closed_by_month_name);

    Report {
        charts: vec![
            model_loss,
            generated,
            all_issues,
            stacked,
            week_created,
            week_closed,
            month_closed,
        ],
        summary,
    }
}

/// Charts for the pull and commit endpoints
pub fn compose_monthly_report(analysis: &MonthlyAnalysis, repo: &str) -> Report {
    let prefix = analysis.kind.artifact_prefix();
    let noun = analysis.kind.noun();
    let spec = |suffix: &str, title: String, x_label: &str, y_label: &str| {
        let artifact = format!("{}_chart{}", prefix, suffix);
        ChartSpec {
            key: artifact.clone(),
            artifact: activity_artifact_name(&artifact, repo),
            title,
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            x_ticks: Vec::new(),
            series: Vec::new(),
        }
    };

    let counts = ChartSpec {
        x_ticks: analysis.monthly.labels(),
        series: vec![bucket_line(noun, &analysis.monthly)],
        ..spec(
            "",
            format!("Number of {} Created for particular Month.", noun),
            "Time",
            &format!("Number of {}", noun),
        )
    };

    let loss = ChartSpec {
        series: loss_series(&analysis.forecast.history),
        ..spec("_loss", format!("Model Loss For {}", noun), "Epochs", "Loss")
    };

    let predictions = ChartSpec {
        x_ticks: analysis.test_labels(),
        series: vec![
            ChartSeries::indexed("Count", SeriesKind::Markers, 0, &analysis.forecast.test_targets),
            ChartSeries::indexed(
                "Predictions",
                SeriesKind::Line,
                0,
                analysis.forecast.predictions.values(),
            ),
        ],
        ..spec(
            "_predictions",
            format!("Predicted {} per Month", noun),
            "Time",
            &format!("Number of {}", noun),
        )
    };

    Report {
        charts: vec![counts, loss, predictions],
        summary: BTreeMap::new(),
    }
}

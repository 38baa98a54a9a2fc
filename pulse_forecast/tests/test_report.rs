use chrono::{Duration, NaiveDate};
use pretty_assertions::assert_eq;
use pulse_forecast::events::{ActivityKind, Issue, IssueField};
use pulse_forecast::models::{CancellationFlag, NaiveLastValue};
use pulse_forecast::pipeline::{prepare_issues, prepare_monthly, IssueAnalysis, PipelineConfig};
use pulse_forecast::report::{
    activity_artifact_name, compose_issue_report, compose_monthly_report, issue_artifact_name,
    repo_short_name, SeriesKind,
};
use serde_json::Value;

fn issue_analysis() -> IssueAnalysis {
    // 2023-01-02 is a Monday
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let mut issues = Vec::new();
    for d in 0..45i64 {
        let created = start + Duration::days(d);
        let count = if d % 7 == 2 { 4 } else { (d % 3) + 1 };
        for _ in 0..count {
            issues.push(Issue {
                number: issues.len() as u64,
                created,
                closed: (d % 2 == 0).then(|| created + Duration::days(3)),
            });
        }
    }

    prepare_issues(&issues, IssueField::CreatedAt, &PipelineConfig::daily_issues())
        .unwrap()
        .run(&NaiveLastValue, &CancellationFlag::new())
        .unwrap()
}

#[test]
fn test_artifact_names() {
    assert_eq!(
        issue_artifact_name("model_loss", IssueField::ClosedAt, "angular"),
        "model_loss_closed_at_angular.png"
    );
    assert_eq!(
        activity_artifact_name("pull_chart", "angular/angular-cli"),
        "pull_chart_angular-cli.png"
    );
    assert_eq!(repo_short_name("golang/go/"), "go");
    assert_eq!(repo_short_name("standalone"), "standalone");
}

#[test]
fn test_issue_report_charts() {
    let report = compose_issue_report(&issue_analysis(), "angular");

    let keys: Vec<&str> = report.charts.iter().map(|c| c.key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "model_loss_image_url",
            "lstm_generated_image_url",
            "all_issues_data_image",
            "stacked_bar_chart",
            "week_line_chart",
            "week_line_chart_closed",
            "month_line_chart_closed",
        ]
    );
    assert_eq!(report.charts[0].artifact, "model_loss_created_at_angular.png");
    assert_eq!(report.charts[1].artifact, "lstm_generated_data_created_at_angular.png");
    assert_eq!(report.charts[2].artifact, "all_issues_data_created_at_angular.png");

    let weekday = &report.charts[4];
    assert_eq!(weekday.x_ticks.len(), 7);
    assert_eq!(weekday.series[0].points.len(), 7);
    assert_eq!(report.charts[6].x_ticks.len(), 12);
}

#[test]
fn test_forecast_overlay_is_aligned() {
    let analysis = issue_analysis();
    let report = compose_issue_report(&analysis, "angular");
    let overlay = &report.charts[1];

    let history = &overlay.series[0];
    let truth = &overlay.series[1];
    let prediction = &overlay.series[2];
    let train_len = analysis.forecast.train_targets.len();

    assert_eq!(history.points.len(), train_len);
    assert_eq!(truth.kind, SeriesKind::Markers);
    assert_eq!(truth.points[0].x, train_len as f64);
    assert_eq!(prediction.points.len(), truth.points.len());
    assert_eq!(prediction.points[0].x, truth.points[0].x);
}

#[test]
fn test_stacked_bars_start_on_created() {
    let analysis = issue_analysis();
    let report = compose_issue_report(&analysis, "angular");
    let stacked = &report.charts[3];
    let created = analysis.aggregates.created_by_month.values();
    let closed = analysis.aggregates.closed_by_month.values();

    assert_eq!(stacked.x_ticks, analysis.aggregates.created_by_month.labels());
    for (i, point) in stacked.series[1].points.iter().enumerate() {
        assert_eq!(point.base, created[i]);
        assert_eq!(point.y, created[i] + closed[i]);
    }
}

#[test]
fn test_issue_summary_fields() {
    let analysis = issue_analysis();
    let report = compose_issue_report(&analysis, "angular");
    let summary = &report.summary;

    let created_peak = analysis.aggregates.created_by_weekday.peak().unwrap();
    assert_eq!(
        summary["week_line_chart1"],
        Value::from(created_peak.label.clone())
    );
    assert_eq!(summary["week_line_chart2"], Value::from(created_peak.count));
    assert!(summary["week_line_chart_closed1"].is_string());
    assert!(summary["month_line_chart_closed2"].is_u64());
    assert_eq!(summary.len(), 6);
}

#[test]
fn test_summary_is_null_without_closed_issues() {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let issues: Vec<Issue> = (0..45i64)
        .flat_map(|d| {
            (0..(d % 4) + 1).map(move |n| Issue {
                number: (d * 10 + n) as u64,
                created: start + Duration::days(d),
                closed: None,
            })
        })
        .collect();
    let analysis = prepare_issues(&issues, IssueField::CreatedAt, &PipelineConfig::daily_issues())
        .unwrap()
        .run(&NaiveLastValue, &CancellationFlag::new())
        .unwrap();

    let report = compose_issue_report(&analysis, "angular");
    assert_eq!(report.summary["week_line_chart_closed1"], Value::Null);
    assert_eq!(report.summary["month_line_chart_closed2"], Value::Null);
    assert!(report.summary["week_line_chart1"].is_string());
}

#[test]
fn test_monthly_report() {
    let dates: Vec<NaiveDate> = (1..=10u32)
        .flat_map(|m| (0..(m % 4) + 1).map(move |d| NaiveDate::from_ymd_opt(2022, m, d + 1).unwrap()))
        .collect();
    let analysis = prepare_monthly(ActivityKind::Pulls, &dates, &PipelineConfig::monthly_activity())
        .unwrap()
        .run(&NaiveLastValue, &CancellationFlag::new())
        .unwrap();

    let report = compose_monthly_report(&analysis, "facebook/react");
    let names: Vec<(&str, &str)> = report
        .charts
        .iter()
        .map(|c| (c.key.as_str(), c.artifact.as_str()))
        .collect();

    assert_eq!(
        names,
        vec![
            ("pull_chart", "pull_chart_react.png"),
            ("pull_chart_loss", "pull_chart_loss_react.png"),
            ("pull_chart_predictions", "pull_chart_predictions_react.png"),
        ]
    );
    assert!(report.summary.is_empty());
    assert_eq!(report.charts[0].x_ticks.len(), 10);
    assert_eq!(report.charts[2].x_ticks, analysis.test_labels());
}

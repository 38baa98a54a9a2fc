//! End-to-end forecasting pipelines
//!
//! Each pipeline has two phases. Preparation aggregates the events, plans the
//! window split and fits the scaler, so every data problem surfaces before any
//! training happens. Running a prepared pipeline trains the model and
//! produces forecasts in count units.

use crate::aggregate::{Aggregate, Grouping, YearMonth};
use crate::data::DailySeries;
use crate::error::{ForecastError, Result};
use crate::events::{ActivityKind, Issue, IssueField};
use crate::metrics::{evaluate_forecast, ErrorMetrics};
use crate::models::{
    CancellationFlag, ForecastModel, ForecastResult, TrainedForecastModel, TrainingConfig,
    TrainingHistory,
};
use chrono::NaiveDate;
use pulse_math::{MinMaxScaler, SplitPlan, WindowDataset};
use tracing::info;

/// How test-period predictions are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionMode {
    /// Predict each test target from its true preceding window
    OneStep,
    /// Seed with the first test window and feed predictions back in
    Autoregressive,
}

/// Windowing and training settings for one pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub look_back: usize,
    pub train_ratio: f64,
    pub mode: PredictionMode,
    pub training: TrainingConfig,
    /// Longest accepted span between the first and last event, in days
    pub max_days: usize,
}

impl PipelineConfig {
    /// Daily issue series: one month of look-back, 80/20 split
    pub fn daily_issues() -> Self {
        Self {
            look_back: 30,
            train_ratio: 0.8,
            mode: PredictionMode::OneStep,
            training: TrainingConfig::daily_issues(),
            max_days: 20 * 366,
        }
    }

    /// Monthly pull and commit series: one quarter of look-back, 50/50 split
    pub fn monthly_activity() -> Self {
        Self {
            look_back: 3,
            train_ratio: 0.5,
            mode: PredictionMode::Autoregressive,
            training: TrainingConfig::monthly_activity(),
            max_days: 50 * 366,
        }
    }

    /// Reject event spans longer than `max_days` before any series is built
    pub fn check_span<I>(&self, dates: I) -> Result<()>
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let mut bounds: Option<(NaiveDate, NaiveDate)> = None;
        for date in dates {
            bounds = Some(match bounds {
                Some((first, last)) => (first.min(date), last.max(date)),
                None => (date, date),
            });
        }

        if let Some((first, last)) = bounds {
            let days = (last - first).num_days() + 1;
            if days > self.max_days as i64 {
                return Err(ForecastError::MalformedRequest(format!(
                    "events span {} days from {} to {}, at most {} are supported",
                    days, first, last, self.max_days
                )));
            }
        }
        Ok(())
    }
}

/// A series that passed every data check and is ready for training
#[derive(Debug, Clone)]
pub struct PreparedSeries {
    values: Vec<f64>,
    plan: SplitPlan,
    scaler: MinMaxScaler,
    dataset: WindowDataset,
    config: PipelineConfig,
}

/// Plan the split, fit the scaler on the training span and build the windows
pub fn prepare_series(values: &[f64], config: &PipelineConfig) -> Result<PreparedSeries> {
    config.training.validate()?;
    let plan = SplitPlan::new(values.len(), config.look_back, config.train_ratio)?;
    let scaler = MinMaxScaler::fit(&values[..plan.train_span()])?;
    let dataset = WindowDataset::build(&scaler.transform_all(values), config.look_back)?;

    Ok(PreparedSeries {
        values: values.to_vec(),
        plan,
        scaler,
        dataset,
        config: config.clone(),
    })
}

impl PreparedSeries {
    pub fn plan(&self) -> &SplitPlan {
        &self.plan
    }

    pub fn scaler(&self) -> &MinMaxScaler {
        &self.scaler
    }

    /// Train `model` and forecast the test period
    pub fn fit_and_forecast<M: ForecastModel>(
        &self,
        model: &M,
        cancel: &CancellationFlag,
    ) -> Result<SeriesForecast> {
        let (train, test) = self.dataset.split(&self.plan)?;
        info!(
            model = model.name(),
            look_back = self.plan.look_back(),
            train = train.len(),
            test = test.len(),
            "training forecast model"
        );

        let (trained, history) = model.train(train, test, &self.config.training, cancel)?;

        let scaled = match self.config.mode {
            PredictionMode::OneStep => {
                let values = test
                    .iter()
                    .map(|s| trained.predict(&s.input))
                    .collect::<Result<Vec<f64>>>()?;
                ForecastResult::new(values, test.len())?
            }
            PredictionMode::Autoregressive => {
                let seed = test.first().ok_or_else(|| {
                    ForecastError::InsufficientData("No test window to seed the forecast".to_string())
                })?;
                trained.forecast(&seed.input, test.len())?
            }
        };
        let predictions = scaled.map_values(|v| self.scaler.inverse(v));

        let look_back = self.plan.look_back();
        let first_test = self.plan.first_test_target();
        let train_targets = self.values[look_back..first_test].to_vec();
        let test_targets = self.values[first_test..first_test + test.len()].to_vec();

        let metrics = evaluate_forecast(predictions.values(), &test_targets)?;
        info!(
            epochs = history.len(),
            mae = metrics.mae,
            rmse = metrics.rmse,
            "forecast evaluated"
        );

        Ok(SeriesForecast {
            model_name: trained.name().to_string(),
            look_back,
            first_test_target: first_test,
            history,
            train_targets,
            test_targets,
            predictions,
            metrics,
        })
    }
}

/// Forecast of a series' test period with its training record
#[derive(Debug, Clone)]
pub struct SeriesForecast {
    pub model_name: String,
    pub look_back: usize,
    /// Series index of the first test target
    pub first_test_target: usize,
    pub history: TrainingHistory,
    /// Training targets in count units, series indices `look_back..first_test_target`
    pub train_targets: Vec<f64>,
    /// True test targets in count units
    pub test_targets: Vec<f64>,
    /// Predictions aligned one-to-one with `test_targets`
    pub predictions: ForecastResult,
    pub metrics: ErrorMetrics,
}

/// Calendar summaries of an issue batch
#[derive(Debug, Clone, PartialEq)]
pub struct IssueAggregates {
    /// Created issues per calendar month, over the created/closed union range
    pub created_by_month: Aggregate,
    /// Closed issues per calendar month, over the same range
    pub closed_by_month: Aggregate,
    pub created_by_weekday: Aggregate,
    pub closed_by_weekday: Aggregate,
    pub closed_by_month_name: Aggregate,
}

impl IssueAggregates {
    pub fn from_issues(issues: &[Issue]) -> Self {
        let created: Vec<NaiveDate> = issues.iter().map(|i| i.created).collect();
        let closed: Vec<NaiveDate> = issues.iter().filter_map(|i| i.closed).collect();

        let first = created.iter().chain(&closed).min().copied();
        let last = created.iter().chain(&closed).max().copied();
        let (created_by_month, closed_by_month) = match (first, last) {
            (Some(first), Some(last)) => {
                let first = YearMonth::from_date(first);
                let last = YearMonth::from_date(last);
                (
                    Aggregate::calendar_months_between(&created, first, last),
                    Aggregate::calendar_months_between(&closed, first, last),
                )
            }
            _ => (
                Aggregate::group(&[], Grouping::CalendarMonth),
                Aggregate::group(&[], Grouping::CalendarMonth),
            ),
        };

        Self {
            created_by_month,
            closed_by_month,
            created_by_weekday: Aggregate::group(&created, Grouping::Weekday),
            closed_by_weekday: Aggregate::group(&closed, Grouping::Weekday),
            closed_by_month_name: Aggregate::group(&closed, Grouping::MonthName),
        }
    }
}

/// Issue batch that passed validation
#[derive(Debug, Clone)]
pub struct PreparedIssues {
    pub field: IssueField,
    pub daily: DailySeries,
    pub aggregates: IssueAggregates,
    pub series: PreparedSeries,
}

/// Validate an issue batch and prepare its daily series for training
pub fn prepare_issues(
    issues: &[Issue],
    field: IssueField,
    config: &PipelineConfig,
) -> Result<PreparedIssues> {
    if issues.is_empty() {
        return Err(ForecastError::EmptyInput("Request contains no issues".to_string()));
    }

    let dates: Vec<NaiveDate> = issues.iter().filter_map(|i| i.date(field)).collect();
    if dates.is_empty() {
        return Err(ForecastError::EmptyInput(format!(
            "No issue has a {} date",
            field
        )));
    }
    let all_dates = issues.iter().flat_map(|i| std::iter::once(i.created).chain(i.closed));
    config.check_span(all_dates)?;

    let daily = DailySeries::from_dates(dates)?;
    info!(
        field = field.as_str(),
        issues = issues.len(),
        days = daily.len(),
        "daily issue series built"
    );
    let series = prepare_series(&daily.values(), config)?;

    Ok(PreparedIssues {
        field,
        daily,
        aggregates: IssueAggregates::from_issues(issues),
        series,
    })
}

/// Everything the issue report is built from
#[derive(Debug, Clone)]
pub struct IssueAnalysis {
    pub field: IssueField,
    pub daily: DailySeries,
    pub aggregates: IssueAggregates,
    pub forecast: SeriesForecast,
}

impl PreparedIssues {
    pub fn run<M: ForecastModel>(
        self,
        model: &M,
        cancel: &CancellationFlag,
    ) -> Result<IssueAnalysis> {
        let forecast = self.series.fit_and_forecast(model, cancel)?;
        Ok(IssueAnalysis {
            field: self.field,
            daily: self.daily,
            aggregates: self.aggregates,
            forecast,
        })
    }
}

/// Monthly activity stream that passed validation
#[derive(Debug, Clone)]
pub struct PreparedMonthly {
    pub kind: ActivityKind,
    pub monthly: Aggregate,
    pub series: PreparedSeries,
}

/// Validate pull or commit dates and prepare their monthly series
pub fn prepare_monthly(
    kind: ActivityKind,
    dates: &[NaiveDate],
    config: &PipelineConfig,
) -> Result<PreparedMonthly> {
    if dates.is_empty() {
        return Err(ForecastError::EmptyInput(format!(
            "Request contains no {}",
            kind.noun().to_lowercase()
        )));
    }

    config.check_span(dates.iter().copied())?;

    let monthly = Aggregate::group(dates, Grouping::CalendarMonth);
    info!(
        kind = kind.noun(),
        events = dates.len(),
        months = monthly.len(),
        "monthly series built"
    );
    let series = prepare_series(&monthly.values(), config)?;

    Ok(PreparedMonthly {
        kind,
        monthly,
        series,
    })
}

/// Everything a pull or commit report is built from
#[derive(Debug, Clone)]
pub struct MonthlyAnalysis {
    pub kind: ActivityKind,
    pub monthly: Aggregate,
    pub forecast: SeriesForecast,
}

impl MonthlyAnalysis {
    /// Month labels of the forecast test period
    pub fn test_labels(&self) -> Vec<String> {
        let start = self.forecast.first_test_target;
        let end = start + self.forecast.test_targets.len();
        self.monthly.buckets()[start..end]
            .iter()
            .map(|b| b.label.clone())
            .collect()
    }
}

impl PreparedMonthly {
    pub fn run<M: ForecastModel>(
        self,
        model: &M,
        cancel: &CancellationFlag,
    ) -> Result<MonthlyAnalysis> {
        let forecast = self.series.fit_and_forecast(model, cancel)?;
        Ok(MonthlyAnalysis {
            kind: self.kind,
            monthly: self.monthly,
            forecast,
        })
    }
}

//! # Pulse Forecast
//!
//! Turns a repository's issue, pull request and commit history into dense
//! time series, forecasts near-term activity with a windowed sequence
//! regressor and composes the charts describing the result.
//!
//! ## Pipeline
//!
//! raw records → [`events`] → [`data::DailySeries`] / [`aggregate::Aggregate`]
//! → scaling and windowing (`pulse_math`) → [`models`] → [`report`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pulse_forecast::events::{parse_issues, IssueField, IssueRecord};
//! use pulse_forecast::models::{CancellationFlag, DenseNetwork};
//! use pulse_forecast::pipeline::{prepare_issues, PipelineConfig};
//! use pulse_forecast::report::compose_issue_report;
//!
//! # fn main() -> pulse_forecast::Result<()> {
//! let records: Vec<IssueRecord> = Vec::new();
//! let issues = parse_issues(&records)?;
//!
//! // Every data check happens here, before training
//! let prepared = prepare_issues(&issues, IssueField::CreatedAt, &PipelineConfig::daily_issues())?;
//!
//! let analysis = prepared.run(&DenseNetwork::default(), &CancellationFlag::new())?;
//! let report = compose_issue_report(&analysis, "angular");
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod data;
pub mod error;
pub mod events;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod report;

// Re-export commonly used types
pub use crate::aggregate::{Aggregate, AggregateBucket, Grouping, YearMonth};
pub use crate::data::{DailyCount, DailySeries};
pub use crate::error::{ForecastError, Result};
pub use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};
pub use crate::report::{ChartRenderer, ChartSpec, Report};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

//! # Pulse Math
//!
//! Numeric building blocks for activity forecasting.
//! This crate provides the min-max scaler used to normalise count series and
//! the sliding-window dataset builder that frames a series as a supervised
//! learning problem.

use thiserror::Error;

pub mod scaling;
pub mod windowing;

pub use scaling::MinMaxScaler;
pub use windowing::{SplitPlan, WindowDataset, WindowSample};

/// Errors that can occur in series calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Degenerate range: every fitted value equals {value}")]
    DegenerateRange { value: f64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for series math operations
pub type Result<T> = std::result::Result<T, MathError>;

//! Error types for the pulse_forecast crate

use pulse_math::MathError;
use thiserror::Error;

/// Custom error types for the pulse_forecast crate
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    /// Request body is missing fields or carries invalid values
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// No events to work with
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Too little history to build even one training sample
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Constant training span, scaling is undefined
    #[error("Degenerate range: the training span is constant at {value}")]
    DegenerateRange { value: f64 },

    /// Training raised or produced a non-finite loss
    #[error("Model training error: {0}")]
    ModelTraining(String),

    /// Training was stopped through its cancellation flag
    #[error("Training cancelled")]
    Cancelled,

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Chart could not be rendered
    #[error("Render error: {0}")]
    Render(String),
}

impl ForecastError {
    /// Name of the pipeline stage the error belongs to
    pub fn stage(&self) -> &'static str {
        match self {
            ForecastError::MalformedRequest(_) => "validation",
            ForecastError::EmptyInput(_) => "aggregation",
            ForecastError::InsufficientData(_) => "windowing",
            ForecastError::DegenerateRange { .. } => "scaling",
            ForecastError::ModelTraining(_) | ForecastError::Cancelled => "training",
            ForecastError::InvalidParameter(_) => "configuration",
            ForecastError::Render(_) => "rendering",
        }
    }

    /// Whether the error stems from the data the client sent
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ForecastError::MalformedRequest(_)
                | ForecastError::EmptyInput(_)
                | ForecastError::InsufficientData(_)
                | ForecastError::DegenerateRange { .. }
        )
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<MathError> for ForecastError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::EmptyInput(msg) => ForecastError::EmptyInput(msg),
            MathError::InsufficientData(msg) => ForecastError::InsufficientData(msg),
            MathError::DegenerateRange { value } => ForecastError::DegenerateRange { value },
            MathError::InvalidInput(msg) => ForecastError::InvalidParameter(msg),
        }
    }
}

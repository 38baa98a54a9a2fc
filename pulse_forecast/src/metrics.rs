//! Metrics for evaluating forecast performance

use crate::error::{ForecastError, Result};
use serde::Serialize;
use statrs::statistics::Statistics;

/// Error metrics for forecast evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
}

/// Evaluate forecast accuracy against actual values
pub fn evaluate_forecast(forecast: &[f64], actual: &[f64]) -> Result<ErrorMetrics> {
    if forecast.len() != actual.len() || forecast.is_empty() {
        return Err(ForecastError::InvalidParameter(
            "Forecast and actual values must have the same non-zero length".to_string(),
        ));
    }

    let abs_errors: Vec<f64> = forecast
        .iter()
        .zip(actual)
        .map(|(f, a)| (a - f).abs())
        .collect();
    let squared_errors: Vec<f64> = abs_errors.iter().map(|e| e * e).collect();

    let mae: f64 = Statistics::mean(abs_errors.iter());
    let mse: f64 = Statistics::mean(squared_errors.iter());

    Ok(ErrorMetrics {
        mae,
        mse,
        rmse: mse.sqrt(),
    })
}

//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pulse_forecast::ForecastError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, warn};

use crate::config::ConfigError;

/// API error response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Validation, pipeline or rendering failure
    #[error(transparent)]
    Forecast(#[from] ForecastError),

    /// Training did not finish before the deadline
    #[error("Training did not finish within {0:?}")]
    Timeout(Duration),

    /// Chart upload failed, replaced objects were restored
    #[error("Failed to persist {}", .failed.join(", "))]
    Persistence { failed: Vec<String>, details: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the request itself was at fault
    pub fn is_client_error(&self) -> bool {
        match self {
            AppError::Forecast(e) => e.is_client_error(),
            _ => false,
        }
    }

    fn parts(&self) -> (StatusCode, ApiError) {
        match self {
            AppError::Forecast(e) => {
                let (status, code) = match e {
                    ForecastError::MalformedRequest(_) => {
                        (StatusCode::BAD_REQUEST, "MALFORMED_REQUEST")
                    }
                    ForecastError::EmptyInput(_) => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "EMPTY_INPUT")
                    }
                    ForecastError::InsufficientData(_) => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_DATA")
                    }
                    ForecastError::DegenerateRange { .. } => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "DEGENERATE_RANGE")
                    }
                    ForecastError::ModelTraining(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "MODEL_TRAINING_ERROR")
                    }
                    ForecastError::Cancelled => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "TRAINING_CANCELLED")
                    }
                    ForecastError::InvalidParameter(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "INVALID_PARAMETER")
                    }
                    ForecastError::Render(_) => (StatusCode::INTERNAL_SERVER_ERROR, "RENDER_ERROR"),
                };
                let body = ApiError::new(code, e.to_string())
                    .with_details(format!("stage: {}", e.stage()));
                (status, body)
            }
            AppError::Timeout(_) => (
                StatusCode::GATEWAY_TIMEOUT,
                ApiError::new("TRAINING_TIMEOUT", self.to_string()),
            ),
            AppError::Persistence { details, .. } => (
                StatusCode::BAD_GATEWAY,
                ApiError::new("PERSISTENCE_ERROR", self.to_string()).with_details(details.clone()),
            ),
            AppError::Config(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("CONFIGURATION_ERROR", e.to_string()),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("INTERNAL_ERROR", msg.clone()),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.parts();
        if self.is_client_error() {
            warn!(status = status.as_u16(), code = %body.code, "{}", body.message);
        } else {
            error!(status = status.as_u16(), code = %body.code, "{}", body.message);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_4xx() {
        let cases = [
            AppError::Forecast(ForecastError::MalformedRequest("repo".into())),
            AppError::Forecast(ForecastError::EmptyInput("none".into())),
            AppError::Forecast(ForecastError::DegenerateRange { value: 1.0 }),
            AppError::Forecast(ForecastError::Render("font".into())),
            AppError::Timeout(Duration::from_secs(1)),
            AppError::Persistence {
                failed: vec!["a.png".into()],
                details: "503".into(),
            },
            AppError::Internal("join".into()),
        ];
        for err in cases {
            let (status, _) = err.parts();
            assert_eq!(err.is_client_error(), status.is_client_error(), "{:?}", err);
        }
    }
}

//! Application state for the HTTP server.

use pulse_forecast::report::ChartRenderer;
use std::sync::Arc;
use tracing::info;

use crate::config::ServiceConfig;
use crate::error::AppError;
use crate::render::PlottersRenderer;
use crate::storage::{build_store, ObjectStore};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    /// Destination of rendered charts
    pub store: Arc<dyn ObjectStore>,
    pub renderer: Arc<dyn ChartRenderer>,
}

impl AppState {
    pub fn new(
        config: ServiceConfig,
        store: Arc<dyn ObjectStore>,
        renderer: Arc<dyn ChartRenderer>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            renderer,
        }
    }

    /// Build the store and renderer the configuration selects.
    pub fn from_config(config: ServiceConfig) -> Result<Self, AppError> {
        let store = build_store(&config)?;
        info!(store = %store.describe(), "object store ready");

        let renderer = match &config.chart_font_path {
            Some(path) => {
                let font = std::fs::read(path).map_err(|e| {
                    crate::config::ConfigError::IoError(format!("{}: {}", path.display(), e))
                })?;
                PlottersRenderer::default().with_font(font)?
            }
            None => {
                info!("no chart font configured, charts are drawn without text");
                PlottersRenderer::default()
            }
        };

        Ok(Self::new(config, store, Arc::new(renderer)))
    }
}

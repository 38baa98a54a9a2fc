//! # Pulse Server
//!
//! HTTP service around `pulse_forecast`. Each endpoint accepts a repository's
//! event history, trains a forecast model on it and answers with public URLs
//! of the rendered charts.
//!
//! ## Endpoints
//!
//! | method | path | body |
//! |--------|------|------|
//! | `POST` | `/api/forecast` | `{issues, type, repo}` |
//! | `POST` | `/api/pulls` | `{pulls, repo}` |
//! | `POST` | `/api/commits` | `{commits, repo}` |
//! | `GET` | `/health` | |

pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod publish;
pub mod render;
pub mod router;
pub mod state;
pub mod storage;

pub use config::{ConfigError, ServiceConfig};
pub use error::{ApiError, AppError};
pub use router::create_router;
pub use state::AppState;

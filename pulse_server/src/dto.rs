//! Request and response bodies.

use pulse_forecast::events::{CommitRecord, IssueField, IssueRecord, PullRecord};
use pulse_forecast::ForecastError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// POST /api/forecast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueForecastRequest {
    pub issues: Vec<IssueRecord>,
    /// Issue timestamp the daily series is built from
    #[serde(rename = "type")]
    pub field: IssueField,
    pub repo: String,
}

/// POST /api/pulls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullsForecastRequest {
    pub pulls: Vec<PullRecord>,
    pub repo: String,
}

/// POST /api/commits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitsForecastRequest {
    pub commits: Vec<CommitRecord>,
    pub repo: String,
}

/// Chart URLs keyed by response field, plus scalar summary fields
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForecastResponse {
    pub fields: BTreeMap<String, Value>,
}

impl ForecastResponse {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// GET /health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Deserialize a JSON body, naming the offending path on failure
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ForecastError> {
    let deserializer = &mut serde_json::Deserializer::from_slice(body);
    serde_path_to_error::deserialize(deserializer).map_err(|e| {
        ForecastError::MalformedRequest(format!("{}: {}", e.path(), e.inner()))
    })
}

/// Repository name used in artifact names
pub fn validated_repo(repo: &str) -> Result<&str, ForecastError> {
    let repo = repo.trim();
    if repo.is_empty() || repo.trim_matches('/').is_empty() {
        return Err(ForecastError::MalformedRequest(
            "repo: must not be empty".to_string(),
        ));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/');
    if let Some(c) = repo.chars().find(|&c| !allowed(c)) {
        return Err(ForecastError::MalformedRequest(format!(
            "repo: '{}' contains '{}', only letters, digits and . _ - / are allowed",
            repo, c
        )));
    }
    if repo.split('/').any(|segment| segment == "..") {
        return Err(ForecastError::MalformedRequest(format!(
            "repo: '{}' is not a repository name",
            repo
        )));
    }
    Ok(repo)
}

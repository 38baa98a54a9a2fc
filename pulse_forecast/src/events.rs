//! Repository event records and their conversion to calendar dates

use crate::error::{ForecastError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Issue as received from the collector service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub issue_number: u64,
    pub created_at: String,
    #[serde(default)]
    pub closed_at: Option<String>,
}

/// Pull request as received from the collector service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRecord {
    pub created_at: String,
}

/// Commit in the GitHub commits API shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub commit: CommitDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDetails {
    pub committer: CommitSignature,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSignature {
    pub date: String,
}

/// Issue timestamp used to build the daily series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueField {
    CreatedAt,
    ClosedAt,
}

impl IssueField {
    /// Field name as it appears in requests and artifact names
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueField::CreatedAt => "created_at",
            IssueField::ClosedAt => "closed_at",
        }
    }
}

impl std::fmt::Display for IssueField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monthly activity streams forecast with the autoregressive pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    Pulls,
    Commits,
}

impl ActivityKind {
    /// Prefix used for artifact names
    pub fn artifact_prefix(&self) -> &'static str {
        match self {
            ActivityKind::Pulls => "pull",
            ActivityKind::Commits => "commit",
        }
    }

    /// Plural noun for chart titles
    pub fn noun(&self) -> &'static str {
        match self {
            ActivityKind::Pulls => "Pulls",
            ActivityKind::Commits => "Commits",
        }
    }
}

/// Issue reduced to calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Issue {
    pub number: u64,
    pub created: NaiveDate,
    pub closed: Option<NaiveDate>,
}

impl Issue {
    /// Date selected by `field`, `None` for an open issue asked for its closing date
    pub fn date(&self, field: IssueField) -> Option<NaiveDate> {
        match field {
            IssueField::CreatedAt => Some(self.created),
            IssueField::ClosedAt => self.closed,
        }
    }
}

/// Parse a timestamp into its UTC calendar date
///
/// Accepts RFC 3339, naive date-times and plain dates with `-` or `/`.
pub fn parse_event_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc).date_naive());
    }
    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts.date());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }

    None
}

fn required_date(raw: &str, collection: &str, index: usize, field: &str) -> Result<NaiveDate> {
    parse_event_date(raw).ok_or_else(|| {
        ForecastError::MalformedRequest(format!(
            "{}[{}].{}: unrecognised timestamp '{}'",
            collection, index, field, raw
        ))
    })
}

/// Convert issue records, rejecting any unparseable timestamp
pub fn parse_issues(records: &[IssueRecord]) -> Result<Vec<Issue>> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let created = required_date(&record.created_at, "issues", i, "created_at")?;
            let closed = match record.closed_at.as_deref().map(str::trim) {
                None | Some("") => None,
                Some(raw) => Some(required_date(raw, "issues", i, "closed_at")?),
            };

            Ok(Issue {
                number: record.issue_number,
                created,
                closed,
            })
        })
        .collect()
}

/// Creation dates of pull requests
pub fn pull_dates(records: &[PullRecord]) -> Result<Vec<NaiveDate>> {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| required_date(&r.created_at, "pulls", i, "created_at"))
        .collect()
}

/// Committer dates of commits
pub fn commit_dates(records: &[CommitRecord]) -> Result<Vec<NaiveDate>> {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| required_date(&r.commit.committer.date, "commits", i, "commit.committer.date"))
        .collect()
}

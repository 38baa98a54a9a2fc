//! Dense daily count series

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Number of events on one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

/// Gapless daily series from the first to the last observed day
///
/// Consecutive entries are exactly one day apart, in ascending order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySeries {
    entries: Vec<DailyCount>,
}

impl DailySeries {
    /// Build a dense series from sparse `(date, count)` observations
    ///
    /// Counts sharing a date are summed and days without observations are
    /// filled with zero.
    pub fn densify(observations: &[(NaiveDate, u64)]) -> Result<Self> {
        let mut totals: BTreeMap<NaiveDate, u64> = BTreeMap::new();
        for &(date, count) in observations {
            let total = totals.entry(date).or_insert(0);
            *total = total.saturating_add(count);
        }

        let (first_day, last_day) = match (totals.keys().next(), totals.keys().next_back()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => {
                return Err(ForecastError::EmptyInput(
                    "No observations to build a daily series from".to_string(),
                ))
            }
        };

        let days = (last_day - first_day).num_days() as usize + 1;
        let entries = first_day
            .iter_days()
            .take(days)
            .map(|date| DailyCount {
                date,
                count: totals.get(&date).copied().unwrap_or(0),
            })
            .collect();

        Ok(Self { entries })
    }

    /// Build a dense series counting one event per date
    pub fn from_dates<I>(dates: I) -> Result<Self>
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let observations: Vec<(NaiveDate, u64)> = dates.into_iter().map(|d| (d, 1)).collect();
        Self::densify(&observations)
    }

    pub fn entries(&self) -> &[DailyCount] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        self.entries.first().map(|e| e.date)
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        self.entries.last().map(|e| e.date)
    }

    /// Counts as floating point values, in date order
    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.count as f64).collect()
    }

    /// Dates in ascending order
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.entries.iter().map(|e| e.date).collect()
    }

    /// Total number of events
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|e| e.count).sum()
    }
}

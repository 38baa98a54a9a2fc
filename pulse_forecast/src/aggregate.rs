//! Grouping of event dates into calendar buckets
//!
//! Every grouping is reindexed against its full label set, so buckets without
//! events still appear with a zero count.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Weekday labels in chart order
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Month labels in chart order
pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Calendar unit used as grouping key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Grouping {
    /// Day-of-week name, always seven buckets
    Weekday,
    /// Month name regardless of year, always twelve buckets
    MonthName,
    /// Calendar month period, one bucket per month between first and last event
    CalendarMonth,
}

/// A calendar month period such as `2023-01`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Create a period, `month` is 1-based
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The following month
    pub fn succ(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Every month from `first` to `last` inclusive
pub fn month_range(first: YearMonth, last: YearMonth) -> Vec<YearMonth> {
    let mut months = Vec::new();
    let mut current = first;
    while current <= last {
        months.push(current);
        current = current.succ();
    }
    months
}

/// Count of events in one period
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateBucket {
    pub label: String,
    pub count: u64,
}

/// Ordered, reindexed counts for one grouping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Aggregate {
    grouping: Grouping,
    buckets: Vec<AggregateBucket>,
}

impl Aggregate {
    /// Group `dates` by `grouping`
    ///
    /// Calendar months span the first to the last date. Without any dates the
    /// calendar-month aggregate is empty while the named groupings keep all
    /// their zero buckets.
    pub fn group(dates: &[NaiveDate], grouping: Grouping) -> Self {
        match grouping {
            Grouping::Weekday => {
                let mut counts = [0u64; 7];
                for date in dates {
                    counts[date.weekday().num_days_from_monday() as usize] += 1;
                }
                Self::named(grouping, &WEEKDAY_NAMES, &counts)
            }
            Grouping::MonthName => {
                let mut counts = [0u64; 12];
                for date in dates {
                    counts[date.month0() as usize] += 1;
                }
                Self::named(grouping, &MONTH_NAMES, &counts)
            }
            Grouping::CalendarMonth => {
                let first = dates.iter().min().copied().map(YearMonth::from_date);
                let last = dates.iter().max().copied().map(YearMonth::from_date);
                match (first, last) {
                    (Some(first), Some(last)) => Self::calendar_months_between(dates, first, last),
                    _ => Self {
                        grouping,
                        buckets: Vec::new(),
                    },
                }
            }
        }
    }

    /// Calendar-month counts reindexed over `first..=last`
    ///
    /// Dates outside the range are ignored.
    pub fn calendar_months_between(dates: &[NaiveDate], first: YearMonth, last: YearMonth) -> Self {
        let mut counts: BTreeMap<YearMonth, u64> = BTreeMap::new();
        for date in dates {
            *counts.entry(YearMonth::from_date(*date)).or_insert(0) += 1;
        }

        let buckets = month_range(first, last)
            .into_iter()
            .map(|month| AggregateBucket {
                label: month.to_string(),
                count: counts.get(&month).copied().unwrap_or(0),
            })
            .collect();

        Self {
            grouping: Grouping::CalendarMonth,
            buckets,
        }
    }

    fn named(grouping: Grouping, labels: &[&str], counts: &[u64]) -> Self {
        let buckets = labels
            .iter()
            .zip(counts)
            .map(|(label, &count)| AggregateBucket {
                label: label.to_string(),
                count,
            })
            .collect();

        Self { grouping, buckets }
    }

    pub fn grouping(&self) -> Grouping {
        self.grouping
    }

    pub fn buckets(&self) -> &[AggregateBucket] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn labels(&self) -> Vec<String> {
        self.buckets.iter().map(|b| b.label.clone()).collect()
    }

    pub fn counts(&self) -> Vec<u64> {
        self.buckets.iter().map(|b| b.count).collect()
    }

    /// Counts as floating point values for the forecasting pipeline
    pub fn values(&self) -> Vec<f64> {
        self.buckets.iter().map(|b| b.count as f64).collect()
    }

    pub fn total(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).sum()
    }

    /// Bucket with the highest count, earliest label on ties
    ///
    /// `None` when no events were grouped.
    pub fn peak(&self) -> Option<&AggregateBucket> {
        if self.total() == 0 {
            return None;
        }

        let mut best: Option<&AggregateBucket> = None;
        for bucket in &self.buckets {
            match best {
                Some(current) if bucket.count <= current.count => {}
                _ => best = Some(bucket),
            }
        }
        best
    }
}

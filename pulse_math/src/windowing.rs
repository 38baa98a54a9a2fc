//! Sliding-window framing of a series for one-step-ahead regression
//!
//! Sample `i` takes `series[i..i + look_back]` as input and `series[i + look_back]`
//! as target. A series of length `n` yields `n - look_back - 1` samples: the
//! final point is held back and never used as a target.

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// A single look-back window and the value that follows it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSample {
    /// Consecutive values, oldest first
    pub input: Vec<f64>,
    /// The value immediately after the window
    pub target: f64,
}

/// Number of window samples a series of `len` points yields
pub fn window_count(len: usize, look_back: usize) -> Result<usize> {
    if look_back == 0 {
        return Err(MathError::InvalidInput(
            "Look-back window must be at least 1".to_string(),
        ));
    }
    if len <= look_back + 1 {
        return Err(MathError::InsufficientData(format!(
            "Need more than {} points for a look-back of {}, got {}",
            look_back + 1,
            look_back,
            len
        )));
    }

    Ok(len - look_back - 1)
}

/// How the samples of a series divide into a training prefix and a test suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitPlan {
    look_back: usize,
    sample_count: usize,
    train_count: usize,
}

impl SplitPlan {
    /// Plan the split for a series of `len` points
    ///
    /// The first `floor(train_ratio * samples)` samples are training samples.
    /// Both sides must end up non-empty.
    pub fn new(len: usize, look_back: usize, train_ratio: f64) -> Result<Self> {
        if !(train_ratio > 0.0 && train_ratio < 1.0) {
            return Err(MathError::InvalidInput(format!(
                "Train ratio must be between 0 and 1, got {}",
                train_ratio
            )));
        }

        let sample_count = window_count(len, look_back)?;
        let train_count = (sample_count as f64 * train_ratio).floor() as usize;

        if train_count == 0 || train_count == sample_count {
            return Err(MathError::InsufficientData(format!(
                "{} window samples cannot be split {:.0}/{:.0} into non-empty training and test sets",
                sample_count,
                train_ratio * 100.0,
                (1.0 - train_ratio) * 100.0
            )));
        }

        Ok(Self {
            look_back,
            sample_count,
            train_count,
        })
    }

    pub fn look_back(&self) -> usize {
        self.look_back
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn train_count(&self) -> usize {
        self.train_count
    }

    pub fn test_count(&self) -> usize {
        self.sample_count - self.train_count
    }

    /// Number of leading series points touched by training samples
    pub fn train_span(&self) -> usize {
        self.train_count + self.look_back
    }

    /// Series index of the first test target
    pub fn first_test_target(&self) -> usize {
        self.train_span()
    }
}

/// Ordered set of window samples built from one series
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WindowDataset {
    look_back: usize,
    samples: Vec<WindowSample>,
}

impl WindowDataset {
    /// Slice `series` into look-back windows, ordered by start index
    pub fn build(series: &[f64], look_back: usize) -> Result<Self> {
        let count = window_count(series.len(), look_back)?;

        let samples = (0..count)
            .map(|i| WindowSample {
                input: series[i..i + look_back].to_vec(),
                target: series[i + look_back],
            })
            .collect();

        Ok(Self { look_back, samples })
    }

    pub fn look_back(&self) -> usize {
        self.look_back
    }

    pub fn samples(&self) -> &[WindowSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Targets in sample order
    pub fn targets(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.target).collect()
    }

    /// Split into training prefix and test suffix according to `plan`
    pub fn split(&self, plan: &SplitPlan) -> Result<(&[WindowSample], &[WindowSample])> {
        if plan.sample_count() != self.samples.len() || plan.look_back() != self.look_back {
            return Err(MathError::InvalidInput(format!(
                "Split plan for {} samples (look-back {}) does not match dataset of {} samples (look-back {})",
                plan.sample_count(),
                plan.look_back(),
                self.samples.len(),
                self.look_back
            )));
        }

        Ok(self.samples.split_at(plan.train_count()))
    }
}

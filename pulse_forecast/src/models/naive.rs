//! Last-value baseline

use crate::error::Result;
use crate::models::{
    check_window, sample_look_back, CancellationFlag, EpochLoss, ForecastModel,
    TrainedForecastModel, TrainingConfig, TrainingHistory,
};
use pulse_math::WindowSample;

/// Predicts that the next value repeats the last one in the window
#[derive(Debug, Clone, Default)]
pub struct NaiveLastValue;

/// Trained last-value baseline
#[derive(Debug, Clone)]
pub struct TrainedNaiveLastValue {
    look_back: usize,
}

fn baseline_mse(samples: &[WindowSample]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let sum: f64 = samples
        .iter()
        .map(|s| {
            let last = s.input.last().copied().unwrap_or(0.0);
            (last - s.target).powi(2)
        })
        .sum();
    Some(sum / samples.len() as f64)
}

impl ForecastModel for NaiveLastValue {
    type Trained = TrainedNaiveLastValue;

    fn train(
        &self,
        train: &[WindowSample],
        validation: &[WindowSample],
        config: &TrainingConfig,
        cancel: &CancellationFlag,
    ) -> Result<(Self::Trained, TrainingHistory)> {
        config.validate()?;
        cancel.check()?;
        let look_back = sample_look_back(train, validation)?;

        // Nothing to fit, a single epoch records the baseline losses
        let train_loss = baseline_mse(train).unwrap_or(0.0);
        let validation_loss = baseline_mse(validation).unwrap_or(train_loss);
        let history = TrainingHistory::new(
            vec![EpochLoss {
                epoch: 0,
                train_loss,
                validation_loss,
            }],
            Some(0),
            false,
        );

        Ok((TrainedNaiveLastValue { look_back }, history))
    }

    fn name(&self) -> &str {
        "Naive Last Value"
    }
}

impl TrainedForecastModel for TrainedNaiveLastValue {
    fn predict(&self, window: &[f64]) -> Result<f64> {
        check_window(window, self.look_back)?;
        Ok(window[window.len() - 1])
    }

    fn look_back(&self) -> usize {
        self.look_back
    }

    fn name(&self) -> &str {
        "Naive Last Value"
    }
}

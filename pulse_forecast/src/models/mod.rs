//! Forecasting models for windowed activity series
//!
//! A [`ForecastModel`] is an untrained configuration. Training it on window
//! samples yields a [`TrainedForecastModel`] together with the per-epoch
//! [`TrainingHistory`].

use crate::error::{ForecastError, Result};
use pulse_math::WindowSample;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub mod dense;
pub mod naive;

pub use dense::{DenseNetwork, TrainedDenseNetwork};
pub use naive::{NaiveLastValue, TrainedNaiveLastValue};

/// Hyper-parameters shared by every trainable model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingConfig {
    /// Upper bound on training epochs
    pub max_epochs: usize,
    /// Epochs without validation improvement before stopping
    pub patience: usize,
    /// Samples per optimizer step, taken in temporal order
    pub batch_size: usize,
    /// Optimizer step size
    pub learning_rate: f64,
}

impl TrainingConfig {
    /// Settings for the daily issue series
    pub fn daily_issues() -> Self {
        Self {
            max_epochs: 20,
            patience: 10,
            batch_size: 70,
            learning_rate: 0.01,
        }
    }

    /// Settings for monthly pull and commit series
    pub fn monthly_activity() -> Self {
        Self {
            max_epochs: 20,
            patience: 20,
            batch_size: 1,
            learning_rate: 0.01,
        }
    }

    /// Check the parameters are usable
    pub fn validate(&self) -> Result<()> {
        if self.max_epochs == 0 {
            return Err(ForecastError::InvalidParameter(
                "max_epochs must be positive".to_string(),
            ));
        }
        if self.patience == 0 {
            return Err(ForecastError::InvalidParameter(
                "patience must be positive".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ForecastError::InvalidParameter(
                "batch_size must be positive".to_string(),
            ));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "learning_rate must be a positive number, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self::daily_issues()
    }
}

/// Losses recorded after one epoch
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpochLoss {
    pub epoch: usize,
    pub train_loss: f64,
    pub validation_loss: f64,
}

/// Per-epoch training and validation loss
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TrainingHistory {
    epochs: Vec<EpochLoss>,
    best_epoch: Option<usize>,
    stopped_early: bool,
}

impl TrainingHistory {
    pub fn new(epochs: Vec<EpochLoss>, best_epoch: Option<usize>, stopped_early: bool) -> Self {
        Self {
            epochs,
            best_epoch,
            stopped_early,
        }
    }

    pub fn epochs(&self) -> &[EpochLoss] {
        &self.epochs
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn train_losses(&self) -> Vec<f64> {
        self.epochs.iter().map(|e| e.train_loss).collect()
    }

    pub fn validation_losses(&self) -> Vec<f64> {
        self.epochs.iter().map(|e| e.validation_loss).collect()
    }

    /// Epoch whose parameters the trained model kept
    pub fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }

    pub fn stopped_early(&self) -> bool {
        self.stopped_early
    }
}

/// Shared flag that asks a running training loop to stop
///
/// Training checks it between epochs.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Fail with [`ForecastError::Cancelled`] once the flag is set
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ForecastError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Outcome of observing one epoch's validation loss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarlyStop {
    /// New best loss, keep these parameters
    Improved,
    /// No improvement yet, patience not exhausted
    Waiting,
    /// Patience exhausted
    Stop,
}

/// Patience-based early stopping on validation loss
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    best_loss: f64,
    best_epoch: Option<usize>,
    wait: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            best_loss: f64::INFINITY,
            best_epoch: None,
            wait: 0,
        }
    }

    pub fn observe(&mut self, epoch: usize, loss: f64) -> EarlyStop {
        if loss < self.best_loss {
            self.best_loss = loss;
            self.best_epoch = Some(epoch);
            self.wait = 0;
            return EarlyStop::Improved;
        }

        self.wait += 1;
        if self.wait >= self.patience {
            EarlyStop::Stop
        } else {
            EarlyStop::Waiting
        }
    }

    pub fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }

    pub fn best_loss(&self) -> f64 {
        self.best_loss
    }
}

/// Forecast values, one per horizon step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    values: Vec<f64>,
    horizons: usize,
}

impl ForecastResult {
    /// Create a new forecast result
    pub fn new(values: Vec<f64>, horizons: usize) -> Result<Self> {
        if values.len() != horizons {
            return Err(ForecastError::InvalidParameter(format!(
                "Values length ({}) doesn't match horizons ({})",
                values.len(),
                horizons
            )));
        }

        Ok(Self { values, horizons })
    }

    /// Get the forecasted values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the number of periods forecasted
    pub fn horizons(&self) -> usize {
        self.horizons
    }

    /// Apply `f` to every value, e.g. to undo scaling
    pub fn map_values<F: Fn(f64) -> f64>(&self, f: F) -> Self {
        Self {
            values: self.values.iter().map(|&v| f(v)).collect(),
            horizons: self.horizons,
        }
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug + Send + Sync {
    /// Predict the value following `window`
    fn predict(&self, window: &[f64]) -> Result<f64>;

    /// Window length the model was trained on
    fn look_back(&self) -> usize;

    /// Name of the model
    fn name(&self) -> &str;

    /// Autoregressive multi-step forecast
    ///
    /// Each prediction is appended to the rolling window, dropping the oldest
    /// value, and fed back as input for the next step. Errors compound with
    /// the horizon since later steps are conditioned on earlier predictions.
    fn forecast(&self, seed: &[f64], horizon: usize) -> Result<ForecastResult> {
        if seed.len() != self.look_back() {
            return Err(ForecastError::InvalidParameter(format!(
                "Seed window has {} values, model expects {}",
                seed.len(),
                self.look_back()
            )));
        }

        let mut window: VecDeque<f64> = seed.iter().copied().collect();
        let mut values = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let next = self.predict(window.make_contiguous())?;
            values.push(next);
            window.pop_front();
            window.push_back(next);
        }

        ForecastResult::new(values, horizon)
    }
}

/// Forecast model that can be trained on window samples
pub trait ForecastModel: Debug + Clone + Send + Sync {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train on `train`, monitoring `validation` for early stopping
    fn train(
        &self,
        train: &[WindowSample],
        validation: &[WindowSample],
        config: &TrainingConfig,
        cancel: &CancellationFlag,
    ) -> Result<(Self::Trained, TrainingHistory)>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

/// Common look-back of a sample set, rejecting ragged windows
pub(crate) fn sample_look_back(train: &[WindowSample], validation: &[WindowSample]) -> Result<usize> {
    let look_back = match train.first() {
        Some(sample) => sample.input.len(),
        None => {
            return Err(ForecastError::InsufficientData(
                "No training samples".to_string(),
            ))
        }
    };
    if look_back == 0 {
        return Err(ForecastError::InvalidParameter(
            "Window samples have empty inputs".to_string(),
        ));
    }
    if train
        .iter()
        .chain(validation)
        .any(|s| s.input.len() != look_back)
    {
        return Err(ForecastError::InvalidParameter(format!(
            "All window samples must have {} inputs",
            look_back
        )));
    }

    Ok(look_back)
}

pub(crate) fn check_window(window: &[f64], look_back: usize) -> Result<()> {
    if window.len() != look_back {
        return Err(ForecastError::InvalidParameter(format!(
            "Window has {} values, model expects {}",
            window.len(),
            look_back
        )));
    }
    Ok(())
}

//! Single hidden layer network trained with Adam on mean squared error

use crate::error::{ForecastError, Result};
use crate::models::{
    check_window, sample_look_back, CancellationFlag, EarlyStop, EarlyStopping, EpochLoss,
    ForecastModel, TrainedForecastModel, TrainingConfig, TrainingHistory,
};
use pulse_math::WindowSample;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tracing::{debug, info};

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const EPSILON: f64 = 1e-7;

/// Feed-forward regressor over a look-back window
#[derive(Debug, Clone)]
pub struct DenseNetwork {
    /// Name of the model
    name: String,
    /// Units in the hidden layer
    hidden_units: usize,
    /// Probability of dropping a hidden unit while training
    dropout: f64,
    /// Seed for weight initialisation and dropout masks
    seed: u64,
}

/// Trained dense network
#[derive(Debug, Clone)]
pub struct TrainedDenseNetwork {
    name: String,
    layout: Layout,
    params: Vec<f64>,
}

/// Positions of each weight group inside the flat parameter vector
#[derive(Debug, Clone, Copy)]
struct Layout {
    inputs: usize,
    hidden: usize,
}

impl Layout {
    fn len(&self) -> usize {
        self.hidden * (self.inputs + 2) + 1
    }

    fn w1(&self, h: usize, j: usize) -> usize {
        h * self.inputs + j
    }

    fn b1(&self, h: usize) -> usize {
        self.hidden * self.inputs + h
    }

    fn w2(&self, h: usize) -> usize {
        self.hidden * (self.inputs + 1) + h
    }

    fn b2(&self) -> usize {
        self.hidden * (self.inputs + 2)
    }

    /// Forward pass. Fills `activations` with tanh outputs before dropout.
    fn forward(&self, params: &[f64], input: &[f64], mask: &[f64], activations: &mut [f64]) -> f64 {
        let mut output = params[self.b2()];
        for h in 0..self.hidden {
            let mut z = params[self.b1(h)];
            for (j, x) in input.iter().enumerate() {
                z += params[self.w1(h, j)] * x;
            }
            let a = z.tanh();
            activations[h] = a;
            output += params[self.w2(h)] * a * mask[h];
        }
        output
    }
}

/// Adam optimizer state
#[derive(Debug, Clone)]
struct Adam {
    learning_rate: f64,
    m: Vec<f64>,
    v: Vec<f64>,
    step: i32,
}

impl Adam {
    fn new(len: usize, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            m: vec![0.0; len],
            v: vec![0.0; len],
            step: 0,
        }
    }

    fn update(&mut self, params: &mut [f64], grads: &[f64]) {
        self.step += 1;
        let correction1 = 1.0 - BETA1.powi(self.step);
        let correction2 = 1.0 - BETA2.powi(self.step);

        for i in 0..params.len() {
            self.m[i] = BETA1 * self.m[i] + (1.0 - BETA1) * grads[i];
            self.v[i] = BETA2 * self.v[i] + (1.0 - BETA2) * grads[i] * grads[i];
            let m_hat = self.m[i] / correction1;
            let v_hat = self.v[i] / correction2;
            params[i] -= self.learning_rate * m_hat / (v_hat.sqrt() + EPSILON);
        }
    }
}

impl DenseNetwork {
    /// Create a new dense network
    pub fn new(hidden_units: usize, dropout: f64) -> Result<Self> {
        if hidden_units == 0 {
            return Err(ForecastError::InvalidParameter(
                "Hidden layer must have at least one unit".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&dropout) {
            return Err(ForecastError::InvalidParameter(
                "Dropout must be in [0, 1)".to_string(),
            ));
        }

        Ok(Self {
            name: format!("Dense Network (hidden={}, dropout={})", hidden_units, dropout),
            hidden_units,
            dropout,
            seed: 42,
        })
    }

    /// Use a different seed for initialisation and dropout
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn initial_params(&self, layout: Layout, rng: &mut StdRng) -> Result<Vec<f64>> {
        let hidden_std = (2.0 / (layout.inputs + layout.hidden) as f64).sqrt();
        let output_std = (2.0 / (layout.hidden + 1) as f64).sqrt();
        let hidden_dist = Normal::new(0.0, hidden_std)
            .map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;
        let output_dist = Normal::new(0.0, output_std)
            .map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;

        let mut params = vec![0.0; layout.len()];
        for h in 0..layout.hidden {
            for j in 0..layout.inputs {
                params[layout.w1(h, j)] = hidden_dist.sample(rng);
            }
            params[layout.w2(h)] = output_dist.sample(rng);
        }
        Ok(params)
    }

    fn dropout_mask(&self, rng: &mut StdRng, mask: &mut [f64]) {
        let keep_scale = 1.0 / (1.0 - self.dropout);
        for m in mask.iter_mut() {
            *m = if self.dropout > 0.0 && rng.gen::<f64>() < self.dropout {
                0.0
            } else {
                keep_scale
            };
        }
    }
}

impl Default for DenseNetwork {
    fn default() -> Self {
        Self {
            name: "Dense Network (hidden=32, dropout=0.2)".to_string(),
            hidden_units: 32,
            dropout: 0.2,
            seed: 42,
        }
    }
}

fn mean_squared_error(layout: &Layout, params: &[f64], samples: &[WindowSample]) -> f64 {
    if samples.is_empty() {
        return f64::NAN;
    }
    let mask = vec![1.0; layout.hidden];
    let mut activations = vec![0.0; layout.hidden];
    let sum: f64 = samples
        .iter()
        .map(|s| {
            let err = layout.forward(params, &s.input, &mask, &mut activations) - s.target;
            err * err
        })
        .sum();
    sum / samples.len() as f64
}

impl ForecastModel for DenseNetwork {
    type Trained = TrainedDenseNetwork;

    fn train(
        &self,
        train: &[WindowSample],
        validation: &[WindowSample],
        config: &TrainingConfig,
        cancel: &CancellationFlag,
    ) -> Result<(Self::Trained, TrainingHistory)> {
        config.validate()?;
        let look_back = sample_look_back(train, validation)?;
        let layout = Layout {
            inputs: look_back,
            hidden: self.hidden_units,
        };

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut params = self.initial_params(layout, &mut rng)?;
        let mut best_params = params.clone();
        let mut optimizer = Adam::new(layout.len(), config.learning_rate);
        let mut early_stopping = EarlyStopping::new(config.patience);

        let mut grads = vec![0.0; layout.len()];
        let mut mask = vec![1.0; layout.hidden];
        let mut activations = vec![0.0; layout.hidden];
        let mut epochs = Vec::with_capacity(config.max_epochs);
        let mut stopped_early = false;

        for epoch in 0..config.max_epochs {
            cancel.check()?;

            let mut loss_sum = 0.0;
            for batch in train.chunks(config.batch_size) {
                grads.iter_mut().for_each(|g| *g = 0.0);
                let scale = 2.0 / batch.len() as f64;

                for sample in batch {
                    self.dropout_mask(&mut rng, &mut mask);
                    let prediction = layout.forward(&params, &sample.input, &mask, &mut activations);
                    let err = prediction - sample.target;
                    loss_sum += err * err;

                    let d_out = scale * err;
                    grads[layout.b2()] += d_out;
                    for h in 0..layout.hidden {
                        let a = activations[h];
                        grads[layout.w2(h)] += d_out * a * mask[h];
                        let d_z = d_out * params[layout.w2(h)] * mask[h] * (1.0 - a * a);
                        grads[layout.b1(h)] += d_z;
                        for (j, x) in sample.input.iter().enumerate() {
                            grads[layout.w1(h, j)] += d_z * x;
                        }
                    }
                }

                optimizer.update(&mut params, &grads);
            }

            let train_loss = loss_sum / train.len() as f64;
            let validation_loss = if validation.is_empty() {
                train_loss
            } else {
                mean_squared_error(&layout, &params, validation)
            };

            if !train_loss.is_finite() || !validation_loss.is_finite() {
                return Err(ForecastError::ModelTraining(format!(
                    "Non-finite loss at epoch {} (train={}, validation={})",
                    epoch, train_loss, validation_loss
                )));
            }

            debug!(epoch, train_loss, validation_loss, "epoch finished");
            epochs.push(EpochLoss {
                epoch,
                train_loss,
                validation_loss,
            });

            match early_stopping.observe(epoch, validation_loss) {
                EarlyStop::Improved => best_params.copy_from_slice(&params),
                EarlyStop::Waiting => {}
                EarlyStop::Stop => {
                    info!(
                        epoch,
                        best_epoch = ?early_stopping.best_epoch(),
                        "validation loss stopped improving"
                    );
                    stopped_early = true;
                    break;
                }
            }
        }

        let history = TrainingHistory::new(epochs, early_stopping.best_epoch(), stopped_early);
        let trained = TrainedDenseNetwork {
            name: self.name.clone(),
            layout,
            params: best_params,
        };

        Ok((trained, history))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedForecastModel for TrainedDenseNetwork {
    fn predict(&self, window: &[f64]) -> Result<f64> {
        check_window(window, self.layout.inputs)?;

        let mask = vec![1.0; self.layout.hidden];
        let mut activations = vec![0.0; self.layout.hidden];
        let value = self.layout.forward(&self.params, window, &mask, &mut activations);

        if value.is_finite() {
            Ok(value)
        } else {
            Err(ForecastError::ModelTraining(
                "Network produced a non-finite prediction".to_string(),
            ))
        }
    }

    fn look_back(&self) -> usize {
        self.layout.inputs
    }

    fn name(&self) -> &str {
        &self.name
    }
}

use approx::assert_relative_eq;
use pretty_assertions::assert_eq;
use pulse_forecast::models::{
    CancellationFlag, DenseNetwork, EarlyStop, EarlyStopping, ForecastModel, NaiveLastValue,
    TrainedForecastModel, TrainingConfig,
};
use pulse_forecast::{ForecastError, Result};
use pulse_math::{WindowDataset, WindowSample};

fn sine_samples(points: usize, look_back: usize) -> Vec<WindowSample> {
    let series: Vec<f64> = (0..points)
        .map(|i| 0.5 + 0.4 * (i as f64 / 3.0).sin())
        .collect();
    WindowDataset::build(&series, look_back)
        .unwrap()
        .samples()
        .to_vec()
}

fn quick_config(max_epochs: usize, patience: usize) -> TrainingConfig {
    TrainingConfig {
        max_epochs,
        patience,
        batch_size: 8,
        learning_rate: 0.01,
    }
}

/// Averages its window, used to observe the autoregressive feedback loop
#[derive(Debug)]
struct MeanOfWindow {
    look_back: usize,
}

impl TrainedForecastModel for MeanOfWindow {
    fn predict(&self, window: &[f64]) -> Result<f64> {
        Ok(window.iter().sum::<f64>() / window.len() as f64)
    }

    fn look_back(&self) -> usize {
        self.look_back
    }

    fn name(&self) -> &str {
        "Mean Of Window"
    }
}

#[test]
fn test_training_config_presets() {
    let daily = TrainingConfig::daily_issues();
    assert_eq!((daily.max_epochs, daily.patience, daily.batch_size), (20, 10, 70));

    let monthly = TrainingConfig::monthly_activity();
    assert_eq!((monthly.max_epochs, monthly.patience, monthly.batch_size), (20, 20, 1));

    let bad = TrainingConfig {
        batch_size: 0,
        ..TrainingConfig::default()
    };
    assert!(matches!(bad.validate(), Err(ForecastError::InvalidParameter(_))));
}

#[test]
fn test_early_stopping_patience() {
    let mut stopper = EarlyStopping::new(2);

    assert_eq!(stopper.observe(0, 1.0), EarlyStop::Improved);
    assert_eq!(stopper.observe(1, 1.5), EarlyStop::Waiting);
    assert_eq!(stopper.observe(2, 0.8), EarlyStop::Improved);
    assert_eq!(stopper.observe(3, 0.9), EarlyStop::Waiting);
    assert_eq!(stopper.observe(4, 0.8), EarlyStop::Stop);

    assert_eq!(stopper.best_epoch(), Some(2));
    assert_relative_eq!(stopper.best_loss(), 0.8);
}

#[test]
fn test_dense_network_learns() {
    let samples = sine_samples(80, 5);
    let (train, validation) = samples.split_at(60);
    let model = DenseNetwork::new(16, 0.0).unwrap();

    let (trained, history) = model
        .train(train, validation, &quick_config(60, 60), &CancellationFlag::new())
        .unwrap();

    assert_eq!(history.len(), 60);
    assert!(!history.stopped_early());
    let losses = history.train_losses();
    assert!(losses.iter().all(|l| l.is_finite()));
    assert!(losses[losses.len() - 1] < losses[0]);
    assert_eq!(trained.look_back(), 5);
}

#[test]
fn test_dense_network_keeps_best_parameters() {
    let samples = sine_samples(60, 4);
    let (train, validation) = samples.split_at(40);
    let model = DenseNetwork::new(8, 0.2).unwrap().with_seed(7);

    let (trained, history) = model
        .train(train, validation, &quick_config(30, 5), &CancellationFlag::new())
        .unwrap();

    let best = history.best_epoch().expect("at least one epoch ran");
    let recorded = history.validation_losses()[best];
    let minimum = history
        .validation_losses()
        .into_iter()
        .fold(f64::INFINITY, f64::min);
    assert_relative_eq!(recorded, minimum);

    let sum: f64 = validation
        .iter()
        .map(|s| {
            let err = trained.predict(&s.input).unwrap() - s.target;
            err * err
        })
        .sum();
    assert_relative_eq!(sum / validation.len() as f64, recorded, max_relative = 1e-9);

    if history.stopped_early() {
        assert!(history.len() < 30);
    }
}

#[test]
fn test_dense_network_is_deterministic() {
    let samples = sine_samples(40, 3);
    let (train, validation) = samples.split_at(30);
    let model = DenseNetwork::default();
    let config = quick_config(10, 10);

    let (_, first) = model
        .train(train, validation, &config, &CancellationFlag::new())
        .unwrap();
    let (_, second) = model
        .train(train, validation, &config, &CancellationFlag::new())
        .unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_non_finite_loss_is_a_training_error() {
    let mut samples = sine_samples(20, 3);
    samples[0].target = f64::NAN;
    let (train, validation) = samples.split_at(12);

    let result = DenseNetwork::default().train(
        train,
        validation,
        &quick_config(5, 5),
        &CancellationFlag::new(),
    );

    assert!(matches!(result, Err(ForecastError::ModelTraining(_))));
}

#[test]
fn test_cancelled_training() {
    let samples = sine_samples(20, 3);
    let cancel = CancellationFlag::new();
    cancel.cancel();

    let dense = DenseNetwork::default().train(&samples, &[], &quick_config(5, 5), &cancel);
    assert_eq!(dense.unwrap_err(), ForecastError::Cancelled);

    let naive = NaiveLastValue.train(&samples, &[], &quick_config(5, 5), &cancel);
    assert_eq!(naive.unwrap_err(), ForecastError::Cancelled);
}

#[test]
fn test_rejects_bad_samples() {
    let empty = NaiveLastValue.train(&[], &[], &quick_config(5, 5), &CancellationFlag::new());
    assert!(matches!(empty, Err(ForecastError::InsufficientData(_))));

    let ragged = vec![
        WindowSample { input: vec![0.1, 0.2], target: 0.3 },
        WindowSample { input: vec![0.1], target: 0.3 },
    ];
    let result = DenseNetwork::default().train(
        &ragged,
        &[],
        &quick_config(5, 5),
        &CancellationFlag::new(),
    );
    assert!(matches!(result, Err(ForecastError::InvalidParameter(_))));
}

#[test]
fn test_naive_last_value() {
    let samples = vec![
        WindowSample { input: vec![0.0, 0.5], target: 1.0 },
        WindowSample { input: vec![0.5, 1.0], target: 0.5 },
    ];
    let (trained, history) = NaiveLastValue
        .train(&samples, &[], &quick_config(5, 5), &CancellationFlag::new())
        .unwrap();

    assert_eq!(history.len(), 1);
    assert_eq!(history.best_epoch(), Some(0));
    assert_relative_eq!(history.train_losses()[0], 0.25);
    assert_relative_eq!(trained.predict(&[0.2, 0.7]).unwrap(), 0.7);
    assert!(trained.predict(&[0.2]).is_err());
}

#[test]
fn test_autoregressive_forecast_feeds_predictions_back() {
    let model = MeanOfWindow { look_back: 3 };
    let forecast = model.forecast(&[1.0, 2.0, 3.0], 3).unwrap();

    assert_eq!(forecast.horizons(), 3);
    let values = forecast.values();
    // [1,2,3] -> 2, [2,3,2] -> 7/3, [3,2,7/3] -> 22/9
    assert_relative_eq!(values[0], 2.0);
    assert_relative_eq!(values[1], 7.0 / 3.0);
    assert_relative_eq!(values[2], 22.0 / 9.0);
}

#[test]
fn test_forecast_rejects_wrong_seed_length() {
    let model = MeanOfWindow { look_back: 3 };
    assert!(matches!(
        model.forecast(&[1.0, 2.0], 2),
        Err(ForecastError::InvalidParameter(_))
    ));
    assert!(model.forecast(&[1.0, 2.0, 3.0], 0).unwrap().values().is_empty());
}

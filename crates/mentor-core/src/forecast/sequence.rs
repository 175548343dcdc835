//! Trainable sequence forecaster
//!
//! Training slices one series into overlapping windows of `window` values,
//! each paired with the value that follows it, min-max scales everything with
//! bounds taken from the training series, and fits an LSTM regressor with
//! mini-batch Adam on mean squared error.
//!
//! Prediction is autoregressive: the last `window` values of `recent` form the
//! first input, and each prediction is appended while the oldest value drops
//! out. Errors compound over the horizon; long horizons drift.
//!
//! Weight initialisation and batch shuffling draw from an RNG seeded with
//! `seed`, so the same config and series always yield the same model.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info};

use super::lstm::{clip_gradients, Adam, Lstm};
use super::{ensure_finite, ensure_periods, BusyPolicy, NegativePolicy, DEFAULT_MAX_HORIZON};
use crate::error::{Error, Result};

/// Sequence model settings
#[derive(Debug, Clone)]
pub struct SequenceConfig {
    /// Input length of each training example and of a prediction
    pub window: usize,
    pub hidden_size: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Maximum L2 norm of a batch gradient
    pub clip_norm: f64,
    pub seed: u64,
    /// Largest `periods` a prediction may request
    pub max_horizon: usize,
    pub negative_policy: NegativePolicy,
    pub busy_policy: BusyPolicy,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            window: 30,
            hidden_size: 32,
            epochs: 200,
            batch_size: 32,
            learning_rate: 0.01,
            clip_norm: 5.0,
            seed: 42,
            max_horizon: DEFAULT_MAX_HORIZON,
            negative_policy: NegativePolicy::Clamp,
            busy_policy: BusyPolicy::Block,
        }
    }
}

impl SequenceConfig {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("window", self.window),
            ("hidden_size", self.hidden_size),
            ("epochs", self.epochs),
            ("batch_size", self.batch_size),
            ("max_horizon", self.max_horizon),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(Error::Config(format!("{} must be at least 1", name)));
            }
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.clip_norm.is_finite() && self.clip_norm > 0.0) {
            return Err(Error::Config(format!(
                "clip_norm must be positive, got {}",
                self.clip_norm
            )));
        }
        Ok(())
    }
}

/// Summary of a completed training run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    /// Number of (window, next value) examples
    pub samples: usize,
    pub epochs: usize,
    /// Mean squared error on scaled values before the first update
    pub initial_loss: f64,
    /// Mean squared error on scaled values after the last epoch
    pub final_loss: f64,
}

/// Min-max bounds of the training series
#[derive(Debug, Clone, Copy)]
struct MinMax {
    min: f64,
    /// max - min, or 1.0 for a constant series
    range: f64,
}

impl MinMax {
    fn fit(values: &[f64]) -> Self {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = if max - min > f64::EPSILON { max - min } else { 1.0 };
        Self { min, range }
    }

    fn scale(&self, value: f64) -> f64 {
        (value - self.min) / self.range
    }

    fn unscale(&self, value: f64) -> f64 {
        value * self.range + self.min
    }
}

#[derive(Debug, Clone)]
struct TrainedModel {
    network: Lstm,
    bounds: MinMax,
    report: TrainingReport,
}

/// LSTM forecaster with explicit train and predict phases
#[derive(Debug, Clone)]
pub struct SequenceForecaster {
    config: SequenceConfig,
    trained: Option<TrainedModel>,
}

impl SequenceForecaster {
    pub fn new(config: SequenceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            trained: None,
        })
    }

    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    pub fn is_trained(&self) -> bool {
        self.trained.is_some()
    }

    /// Report of the last successful training run
    pub fn report(&self) -> Option<&TrainingReport> {
        self.trained.as_ref().map(|t| &t.report)
    }

    /// Fit the model on one series
    ///
    /// On error the previously trained model, if any, stays in place.
    pub fn train(&mut self, series: &[f64]) -> Result<TrainingReport> {
        let trained = self.fit(series)?;
        let report = trained.report.clone();
        self.trained = Some(trained);
        Ok(report)
    }

    /// Predict `periods` values following `recent`
    pub fn predict(&self, recent: &[f64], periods: usize) -> Result<Vec<f64>> {
        let trained = self.trained.as_ref().ok_or(Error::ModelNotTrained)?;
        let window = self.config.window;

        if recent.len() < window {
            return Err(Error::InsufficientHistory {
                required: window,
                actual: recent.len(),
            });
        }
        ensure_periods("periods", periods, self.config.max_horizon)?;
        ensure_finite("recent", recent)?;

        let mut input: Vec<f64> = recent[recent.len() - window..]
            .iter()
            .map(|v| trained.bounds.scale(*v))
            .collect();

        let mut forecast = Vec::with_capacity(periods);
        for _ in 0..periods {
            let next = trained.network.predict(&input);
            input.remove(0);
            input.push(next);
            let value = trained.bounds.unscale(next);
            forecast.push(self.config.negative_policy.apply(value));
        }

        debug!(periods, "Sequence forecast");
        Ok(forecast)
    }

    fn fit(&self, series: &[f64]) -> Result<TrainedModel> {
        let config = &self.config;
        let window = config.window;

        if series.len() < window + 1 {
            return Err(Error::InsufficientHistory {
                required: window + 1,
                actual: series.len(),
            });
        }
        ensure_finite("series", series)?;

        let bounds = MinMax::fit(series);
        let scaled: Vec<f64> = series.iter().map(|v| bounds.scale(*v)).collect();
        let samples: Vec<(&[f64], f64)> = (0..scaled.len() - window)
            .map(|start| (&scaled[start..start + window], scaled[start + window]))
            .collect();

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut network = Lstm::new(config.hidden_size, &mut rng);
        let mut optimizer = Adam::new(network.params().len(), config.learning_rate);
        let mut grads = vec![0.0; network.params().len()];
        let mut order: Vec<usize> = (0..samples.len()).collect();

        let initial_loss = mean_squared_error(&network, &samples);
        let mut epoch_loss = initial_loss;

        for epoch in 0..config.epochs {
            order.shuffle(&mut rng);
            let mut loss_sum = 0.0;

            for batch in order.chunks(config.batch_size) {
                grads.iter_mut().for_each(|g| *g = 0.0);
                let n = batch.len() as f64;

                for &i in batch {
                    let (input, target) = samples[i];
                    let output = network.accumulate_gradients(input, &mut grads, |y| {
                        2.0 * (y - target) / n
                    });
                    loss_sum += (output - target).powi(2);
                }

                clip_gradients(&mut grads, config.clip_norm);
                optimizer.step(network.params_mut(), &grads);
            }

            epoch_loss = loss_sum / samples.len() as f64;
            if !epoch_loss.is_finite() {
                return Err(Error::InvalidInput(format!(
                    "training diverged at epoch {}; lower learning_rate",
                    epoch + 1
                )));
            }
            if (epoch + 1) % 50 == 0 {
                debug!(epoch = epoch + 1, loss = epoch_loss, "Training progress");
            }
        }

        let final_loss = mean_squared_error(&network, &samples);
        info!(
            samples = samples.len(),
            epochs = config.epochs,
            initial_loss,
            final_loss,
            last_epoch_loss = epoch_loss,
            "Trained sequence forecaster"
        );

        Ok(TrainedModel {
            network,
            bounds,
            report: TrainingReport {
                samples: samples.len(),
                epochs: config.epochs,
                initial_loss,
                final_loss,
            },
        })
    }
}

fn mean_squared_error(network: &Lstm, samples: &[(&[f64], f64)]) -> f64 {
    samples
        .iter()
        .map(|(input, target)| (network.predict(input) - target).powi(2))
        .sum::<f64>()
        / samples.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SequenceConfig {
        SequenceConfig {
            window: 5,
            hidden_size: 6,
            epochs: 150,
            batch_size: 4,
            ..Default::default()
        }
    }

    fn ramp(len: usize) -> Vec<f64> {
        (1..=len).map(|v| v as f64).collect()
    }

    #[test]
    fn test_predict_before_train() {
        let forecaster = SequenceForecaster::new(small_config()).unwrap();
        assert!(!forecaster.is_trained());
        let err = forecaster.predict(&ramp(10), 3).unwrap_err();
        assert!(matches!(err, Error::ModelNotTrained));
    }

    #[test]
    fn test_train_requires_window_plus_one() {
        let mut forecaster = SequenceForecaster::new(small_config()).unwrap();
        let err = forecaster.train(&ramp(5)).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientHistory {
                required: 6,
                actual: 5
            }
        ));
        assert!(!forecaster.is_trained());
    }

    #[test]
    fn test_train_reduces_loss() {
        let mut forecaster = SequenceForecaster::new(small_config()).unwrap();
        let report = forecaster.train(&ramp(20)).unwrap();
        assert_eq!(report.samples, 15);
        assert_eq!(report.epochs, 150);
        assert!(report.final_loss < report.initial_loss);
        assert_eq!(forecaster.report(), Some(&report));
    }

    #[test]
    fn test_predict_validation() {
        let mut forecaster = SequenceForecaster::new(small_config()).unwrap();
        forecaster.train(&ramp(20)).unwrap();

        assert!(matches!(
            forecaster.predict(&ramp(4), 2),
            Err(Error::InsufficientHistory {
                required: 5,
                actual: 4
            })
        ));
        assert!(matches!(
            forecaster.predict(&ramp(5), 0),
            Err(Error::InvalidInput(_))
        ));

        let out = forecaster.predict(&ramp(12), 3).unwrap();
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_periods_above_limit_rejected() {
        let mut forecaster = SequenceForecaster::new(SequenceConfig {
            max_horizon: 6,
            ..small_config()
        })
        .unwrap();
        forecaster.train(&ramp(20)).unwrap();

        assert_eq!(forecaster.predict(&ramp(10), 6).unwrap().len(), 6);
        for periods in [7, 1_000_000_000, usize::MAX] {
            assert!(matches!(
                forecaster.predict(&ramp(10), periods),
                Err(Error::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_training_is_deterministic() {
        let series: Vec<f64> = (0..30).map(|i| 100.0 + 10.0 * (i as f64 * 0.5).sin()).collect();

        let mut a = SequenceForecaster::new(small_config()).unwrap();
        let mut b = SequenceForecaster::new(small_config()).unwrap();
        assert_eq!(a.train(&series).unwrap(), b.train(&series).unwrap());
        assert_eq!(
            a.predict(&series, 4).unwrap(),
            b.predict(&series, 4).unwrap()
        );
    }

    #[test]
    fn test_failed_train_keeps_previous_model() {
        let mut forecaster = SequenceForecaster::new(small_config()).unwrap();
        forecaster.train(&ramp(20)).unwrap();
        let before = forecaster.predict(&ramp(10), 2).unwrap();

        assert!(forecaster.train(&ramp(3)).is_err());
        assert!(forecaster.train(&[1.0, 2.0, 3.0, 4.0, 5.0, f64::NAN]).is_err());

        assert!(forecaster.is_trained());
        assert_eq!(forecaster.predict(&ramp(10), 2).unwrap(), before);
    }

    #[test]
    fn test_constant_series() {
        let mut forecaster = SequenceForecaster::new(small_config()).unwrap();
        forecaster.train(&[42.0; 12]).unwrap();
        let out = forecaster.predict(&[42.0; 5], 2).unwrap();
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_invalid_config() {
        let config = SequenceConfig {
            window: 0,
            ..Default::default()
        };
        assert!(matches!(
            SequenceForecaster::new(config),
            Err(Error::Config(_))
        ));
        let config = SequenceConfig {
            learning_rate: -1.0,
            ..Default::default()
        };
        assert!(SequenceForecaster::new(config).is_err());
    }
}

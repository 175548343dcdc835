//! Baseline trend-and-noise forecaster
//!
//! The trend is the mean of the last `trend_window` observations. Each
//! forecast period is `trend * (1 + e)` with `e ~ Normal(0, noise_spread)`
//! drawn independently per period.

use rand::Rng;
use tracing::debug;

use super::{ensure_finite, ensure_periods, NegativePolicy, DEFAULT_MAX_HORIZON};
use crate::error::{Error, Result};

/// Baseline forecaster settings
#[derive(Debug, Clone)]
pub struct ForecastConfig {
    /// Trailing observations averaged into the trend
    pub trend_window: usize,
    /// Standard deviation of the multiplicative noise
    pub noise_spread: f64,
    /// Default number of periods when the caller doesn't pass one
    pub horizon: usize,
    /// Largest horizon a caller may request
    pub max_horizon: usize,
    pub negative_policy: NegativePolicy,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            trend_window: 3,
            noise_spread: 0.1,
            horizon: 4,
            max_horizon: DEFAULT_MAX_HORIZON,
            negative_policy: NegativePolicy::Clamp,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BaselineForecaster {
    config: ForecastConfig,
}

impl BaselineForecaster {
    pub fn new(config: ForecastConfig) -> Result<Self> {
        if config.trend_window == 0 {
            return Err(Error::Config("trend_window must be at least 1".into()));
        }
        if !config.noise_spread.is_finite() || config.noise_spread < 0.0 {
            return Err(Error::Config(format!(
                "noise_spread must be finite and non-negative, got {}",
                config.noise_spread
            )));
        }
        if config.horizon == 0 || config.horizon > config.max_horizon {
            return Err(Error::Config(format!(
                "horizon must be between 1 and max_horizon ({}), got {}",
                config.max_horizon, config.horizon
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Forecast `horizon` periods using the thread-local RNG
    pub fn forecast(&self, history: &[f64], horizon: usize) -> Result<Vec<f64>> {
        self.forecast_with_rng(history, horizon, &mut rand::thread_rng())
    }

    /// Forecast `horizon` periods drawing noise from `rng`
    ///
    /// A seeded RNG makes the output reproducible.
    pub fn forecast_with_rng<R: Rng + ?Sized>(
        &self,
        history: &[f64],
        horizon: usize,
        rng: &mut R,
    ) -> Result<Vec<f64>> {
        let window = self.config.trend_window;
        if history.len() < window {
            return Err(Error::InsufficientHistory {
                required: window,
                actual: history.len(),
            });
        }
        ensure_periods("horizon", horizon, self.config.max_horizon)?;
        ensure_finite("history", history)?;

        let recent = &history[history.len() - window..];
        let trend = recent.iter().sum::<f64>() / window as f64;

        let forecast: Vec<f64> = (0..horizon)
            .map(|_| {
                let e = self.config.noise_spread * standard_normal(rng);
                self.config.negative_policy.apply(trend * (1.0 + e))
            })
            .collect();

        debug!(trend, horizon, "Baseline forecast");
        Ok(forecast)
    }
}

impl Default for BaselineForecaster {
    fn default() -> Self {
        Self {
            config: ForecastConfig::default(),
        }
    }
}

/// Standard normal sample (Box-Muller)
fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // 1 - [0, 1) keeps u1 away from zero
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

//! Spending forecasts
//!
//! Two forecasters share this module:
//!
//! - [`BaselineForecaster`]: mean of the last few observations, perturbed by
//!   multiplicative Gaussian noise. Needs no training.
//! - [`SequenceForecaster`]: a small LSTM regressor trained on one series and
//!   rolled forward autoregressively. Wrap it in [`SharedForecaster`] to train
//!   and predict from several threads.
//!
//! Both return plain `Vec<f64>` forecasts without confidence intervals.

mod baseline;
mod lstm;
mod sequence;
mod shared;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use baseline::{BaselineForecaster, ForecastConfig};
pub use sequence::{SequenceConfig, SequenceForecaster, TrainingReport};
pub use shared::{ForecasterState, SharedForecaster};

/// Default cap on requested forecast periods (ten years of monthly totals)
pub const DEFAULT_MAX_HORIZON: usize = 120;

/// What to do with forecast values below zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegativePolicy {
    /// Replace negative values with 0.0
    #[default]
    Clamp,
    /// Return raw model output
    Allow,
}

impl NegativePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "clamp" => Some(Self::Clamp),
            "allow" => Some(Self::Allow),
            _ => None,
        }
    }

    pub(crate) fn apply(self, value: f64) -> f64 {
        match self {
            Self::Clamp if value < 0.0 => {
                tracing::debug!(value, "Clamped negative forecast to zero");
                0.0
            }
            Self::Clamp | Self::Allow => value,
        }
    }
}

/// How a shared forecaster reacts to a held lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusyPolicy {
    /// Wait for the lock
    #[default]
    Block,
    /// Return `Error::ModelBusy` immediately
    FailFast,
}

impl BusyPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "block" => Some(Self::Block),
            "fail_fast" => Some(Self::FailFast),
            _ => None,
        }
    }
}

pub(crate) fn ensure_finite(name: &str, values: &[f64]) -> Result<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(Error::InvalidInput(format!(
            "{} contains a non-finite value at position {}",
            name, i
        ))),
        None => Ok(()),
    }
}

/// Reject a period count of zero or above `max`
pub(crate) fn ensure_periods(name: &str, periods: usize, max: usize) -> Result<()> {
    if periods == 0 || periods > max {
        return Err(Error::InvalidInput(format!(
            "{} must be between 1 and {}, got {}",
            name, max, periods
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_periods() {
        assert!(ensure_periods("horizon", 1, 4).is_ok());
        assert!(ensure_periods("horizon", 4, 4).is_ok());
        assert!(matches!(ensure_periods("horizon", 0, 4), Err(Error::InvalidInput(_))));
        assert!(matches!(ensure_periods("horizon", 5, 4), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(NegativePolicy::parse("Clamp"), Some(NegativePolicy::Clamp));
        assert_eq!(NegativePolicy::parse("allow"), Some(NegativePolicy::Allow));
        assert_eq!(NegativePolicy::parse("floor"), None);
        assert_eq!(BusyPolicy::parse("fail-fast"), Some(BusyPolicy::FailFast));
        assert_eq!(BusyPolicy::parse("block"), Some(BusyPolicy::Block));
    }

    #[test]
    fn test_negative_policy_apply() {
        assert_eq!(NegativePolicy::Clamp.apply(-3.0), 0.0);
        assert_eq!(NegativePolicy::Clamp.apply(3.0), 3.0);
        assert_eq!(NegativePolicy::Allow.apply(-3.0), -3.0);
    }

    #[test]
    fn test_ensure_finite() {
        assert!(ensure_finite("history", &[1.0, 2.0]).is_ok());
        let err = ensure_finite("history", &[1.0, f64::INFINITY]).unwrap_err();
        assert!(err.to_string().contains("position 1"));
    }
}

//! Thread-safe handle around a sequence forecaster
//!
//! `train` holds the write lock for the whole fit and `predict` holds a read
//! lock, so a prediction always runs against one fully trained model, never
//! against weights halfway through an update.
//!
//! [`SharedForecaster::state`] never waits on the lock, so status reporting
//! from async code stays responsive while a fit is running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError};

use serde::Serialize;

use tracing::debug;

use super::sequence::{SequenceConfig, SequenceForecaster, TrainingReport};
use super::BusyPolicy;
use crate::error::{Error, Result};

/// Non-blocking view of the shared model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecasterState {
    /// A completed model is available (possibly being replaced)
    pub trained: bool,
    /// A fit currently holds the model
    pub training: bool,
    pub window: usize,
    /// Last training report; absent while a fit is running
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<TrainingReport>,
}

/// Cloneable handle; clones share one model
#[derive(Debug, Clone)]
pub struct SharedForecaster {
    inner: Arc<RwLock<SequenceForecaster>>,
    /// Set once any fit completes; a failed fit keeps the previous model
    trained: Arc<AtomicBool>,
    busy_policy: BusyPolicy,
    window: usize,
}

impl SharedForecaster {
    pub fn new(config: SequenceConfig) -> Result<Self> {
        let busy_policy = config.busy_policy;
        let window = config.window;
        Ok(Self {
            inner: Arc::new(RwLock::new(SequenceForecaster::new(config)?)),
            trained: Arc::new(AtomicBool::new(false)),
            busy_policy,
            window,
        })
    }

    pub fn busy_policy(&self) -> BusyPolicy {
        self.busy_policy
    }

    /// Train, blocking readers until the new model is in place
    pub fn train(&self, series: &[f64]) -> Result<TrainingReport> {
        let mut forecaster = self.write()?;
        let report = forecaster.train(series)?;
        self.trained.store(true, Ordering::Release);
        Ok(report)
    }

    pub fn predict(&self, recent: &[f64], periods: usize) -> Result<Vec<f64>> {
        self.read()?.predict(recent, periods)
    }

    pub fn is_trained(&self) -> Result<bool> {
        Ok(self.read()?.is_trained())
    }

    pub fn report(&self) -> Result<Option<TrainingReport>> {
        Ok(self.read()?.report().cloned())
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Current state without waiting for a running fit
    pub fn state(&self) -> Result<ForecasterState> {
        match self.inner.try_read() {
            Ok(guard) => Ok(ForecasterState {
                trained: guard.is_trained(),
                training: false,
                window: self.window,
                report: guard.report().cloned(),
            }),
            Err(TryLockError::WouldBlock) => Ok(ForecasterState {
                trained: self.trained.load(Ordering::Acquire),
                training: true,
                window: self.window,
                report: None,
            }),
            Err(TryLockError::Poisoned(_)) => Err(poisoned()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, SequenceForecaster>> {
        match self.busy_policy {
            BusyPolicy::Block => self.inner.read().map_err(|_| poisoned()),
            BusyPolicy::FailFast => match self.inner.try_read() {
                Ok(guard) => Ok(guard),
                Err(TryLockError::WouldBlock) => {
                    debug!("Forecaster busy, rejecting read");
                    Err(Error::ModelBusy)
                }
                Err(TryLockError::Poisoned(_)) => Err(poisoned()),
            },
        }
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, SequenceForecaster>> {
        match self.busy_policy {
            BusyPolicy::Block => self.inner.write().map_err(|_| poisoned()),
            BusyPolicy::FailFast => match self.inner.try_write() {
                Ok(guard) => Ok(guard),
                Err(TryLockError::WouldBlock) => {
                    debug!("Forecaster busy, rejecting train");
                    Err(Error::ModelBusy)
                }
                Err(TryLockError::Poisoned(_)) => Err(poisoned()),
            },
        }
    }
}

#[cfg(test)]
impl SharedForecaster {
    /// Hold the model the way a running fit does
    pub(crate) fn hold_for_training(&self) -> RwLockWriteGuard<'_, SequenceForecaster> {
        self.inner.write().unwrap()
    }
}

fn poisoned() -> Error {
    Error::ModelUnavailable("forecaster lock poisoned by a panicked trainer".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn config(busy_policy: BusyPolicy) -> SequenceConfig {
        SequenceConfig {
            window: 4,
            hidden_size: 4,
            epochs: 40,
            batch_size: 4,
            busy_policy,
            ..Default::default()
        }
    }

    #[test]
    fn test_clones_share_model() {
        let shared = SharedForecaster::new(config(BusyPolicy::Block)).unwrap();
        let other = shared.clone();
        assert!(!other.is_trained().unwrap());

        shared.train(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]).unwrap();
        assert!(other.is_trained().unwrap());
        assert_eq!(other.predict(&[5.0, 6.0, 7.0, 8.0], 2).unwrap().len(), 2);
        assert_eq!(other.report().unwrap().map(|r| r.samples), Some(4));
    }

    #[test]
    fn test_fail_fast_while_training() {
        let shared = SharedForecaster::new(config(BusyPolicy::FailFast)).unwrap();

        // Hold the write lock as a trainer would
        let guard = shared.inner.write().unwrap();
        assert!(matches!(
            shared.predict(&[1.0, 2.0, 3.0, 4.0], 1),
            Err(Error::ModelBusy)
        ));
        assert!(matches!(
            shared.train(&[1.0, 2.0, 3.0, 4.0, 5.0]),
            Err(Error::ModelBusy)
        ));
        drop(guard);

        assert!(matches!(
            shared.predict(&[1.0, 2.0, 3.0, 4.0], 1),
            Err(Error::ModelNotTrained)
        ));
    }

    #[test]
    fn test_state_does_not_wait_for_training() {
        let shared = SharedForecaster::new(config(BusyPolicy::Block)).unwrap();
        let state = shared.state().unwrap();
        assert!(!state.trained && !state.training);
        assert_eq!(state.window, 4);

        shared.train(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]).unwrap();
        assert_eq!(shared.state().unwrap().report.map(|r| r.samples), Some(4));

        // A retrain in progress still reports the existing model
        let guard = shared.inner.write().unwrap();
        let state = shared.state().unwrap();
        assert!(state.trained);
        assert!(state.training);
        assert!(state.report.is_none());
        drop(guard);

        assert!(!shared.state().unwrap().training);
    }

    #[test]
    fn test_poisoned_lock_is_model_unavailable() {
        let shared = SharedForecaster::new(config(BusyPolicy::Block)).unwrap();
        let inner = shared.inner.clone();
        let _ = thread::spawn(move || {
            let _guard = inner.write().unwrap();
            panic!("trainer crashed");
        })
        .join();

        assert!(matches!(
            shared.predict(&[1.0, 2.0, 3.0, 4.0], 1),
            Err(Error::ModelUnavailable(_))
        ));
        assert!(matches!(shared.state(), Err(Error::ModelUnavailable(_))));
    }
}

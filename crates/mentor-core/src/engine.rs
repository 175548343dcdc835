//! Process-wide predictive engine
//!
//! Owns every model the predictive endpoints use:
//!
//! - the fitted spending profiler (fitted once in [`PredictiveEngine::init`])
//! - the baseline forecaster
//! - the shared sequence forecaster
//! - the categorizer, started lazily: the first categorization checks that
//!   the semantic backend is reachable, and only a healthy backend is kept
//!
//! [`PredictiveEngine::shutdown`] releases the categorizer; the next call
//! starts it again.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::ai::{AIClient, BackendInfo, EntailmentBackend};
use crate::categorizer::{Categorization, Categorizer};
use crate::config::CoreConfig;
use crate::error::{Error, Result};
use crate::forecast::{BaselineForecaster, SharedForecaster};
use crate::profiler::{Assignment, ProfileModel, SpendingVector};

/// Snapshot of engine state for health reporting
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub backend: BackendInfo,
    pub categorizer_ready: bool,
    pub archetypes: Vec<String>,
    pub profile_features: Vec<String>,
    pub sequence_trained: bool,
    /// A sequence fit is running
    pub sequence_training: bool,
    pub sequence_window: usize,
}

pub struct PredictiveEngine {
    config: CoreConfig,
    profile: Arc<ProfileModel>,
    baseline: BaselineForecaster,
    sequence: SharedForecaster,
    /// Validated but not yet started categorizer
    pending: Categorizer,
    active: RwLock<Option<Categorizer>>,
}

impl PredictiveEngine {
    /// Fit the profiler and build the forecasters
    ///
    /// Nothing here contacts the semantic backend.
    pub fn init(config: CoreConfig) -> Result<Self> {
        let backend = AIClient::from_config(&config.backend);
        Self::with_backend(config, backend)
    }

    /// Like [`PredictiveEngine::init`] with a caller-supplied backend
    pub fn with_backend(config: CoreConfig, backend: AIClient) -> Result<Self> {
        let pending = Categorizer::new(backend, &config.categorizer)?;

        let population = config.profiler.load_population()?;
        let profile = Arc::new(ProfileModel::fit(&population, &config.profiler)?);

        let baseline = BaselineForecaster::new(config.forecast.clone())?;
        let sequence = SharedForecaster::new(config.sequence.clone())?;

        info!(
            backend = pending.backend().info().kind.as_str(),
            model = pending.backend().model(),
            archetypes = profile.labels().len(),
            "Predictive engine initialized"
        );

        Ok(Self {
            config,
            profile,
            baseline,
            sequence,
            pending,
            active: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// The started categorizer, starting it on first use
    pub async fn categorizer(&self) -> Result<Categorizer> {
        if let Some(categorizer) = self.active.read().await.as_ref() {
            return Ok(categorizer.clone());
        }

        let mut active = self.active.write().await;
        // Another caller may have started it while we waited
        if let Some(categorizer) = active.as_ref() {
            return Ok(categorizer.clone());
        }

        let backend = self.pending.backend();
        if !backend.health_check().await {
            warn!(host = backend.host(), model = backend.model(), "Semantic backend not responding");
            return Err(Error::ModelUnavailable(format!(
                "semantic backend at {} is not responding",
                backend.host()
            )));
        }

        info!(host = backend.host(), model = backend.model(), "Categorizer started");
        *active = Some(self.pending.clone());
        Ok(self.pending.clone())
    }

    pub async fn categorize(&self, description: &str) -> Result<String> {
        self.categorizer().await?.categorize(description).await
    }

    pub async fn categorize_detailed(&self, description: &str) -> Result<Categorization> {
        self.categorizer().await?.categorize_detailed(description).await
    }

    pub async fn batch_categorize(&self, descriptions: &[String]) -> Result<Vec<String>> {
        self.categorizer().await?.batch_categorize(descriptions).await
    }

    pub fn profile_model(&self) -> &Arc<ProfileModel> {
        &self.profile
    }

    pub fn classify_profile(&self, vector: &SpendingVector) -> Result<Assignment> {
        self.profile.assign(vector)
    }

    /// Baseline forecast; `horizon` defaults to the configured one
    pub fn forecast(&self, history: &[f64], horizon: Option<usize>) -> Result<Vec<f64>> {
        let horizon = horizon.unwrap_or(self.config.forecast.horizon);
        self.baseline.forecast(history, horizon)
    }

    pub fn baseline(&self) -> &BaselineForecaster {
        &self.baseline
    }

    pub fn sequence(&self) -> &SharedForecaster {
        &self.sequence
    }

    /// Snapshot for health reporting; never waits on a running fit
    pub async fn status(&self) -> EngineStatus {
        let (sequence_trained, sequence_training) = match self.sequence.state() {
            Ok(state) => (state.trained, state.training),
            Err(e) => {
                warn!(error = %e, "Sequence forecaster unavailable");
                (false, false)
            }
        };

        EngineStatus {
            backend: self.pending.backend().info(),
            categorizer_ready: self.active.read().await.is_some(),
            archetypes: self.profile.labels().to_vec(),
            profile_features: self.profile.features().to_vec(),
            sequence_trained,
            sequence_training,
            sequence_window: self.sequence.window(),
        }
    }

    /// Release the started categorizer
    pub async fn shutdown(&self) {
        if self.active.write().await.take().is_some() {
            info!("Categorizer stopped");
        }
    }
}

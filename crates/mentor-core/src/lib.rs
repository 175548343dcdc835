//! BudgetMentor Predictive Core
//!
//! Predictive conveniences for the BudgetMentor personal finance tracker:
//! - Zero-shot transaction categorization over a pluggable local semantic
//!   backend (Ollama, OpenAI-compatible servers, or a mock)
//! - Spending profiler clustering users into behavioral archetypes
//! - Baseline trend forecaster and a trainable LSTM sequence forecaster
//! - Layered TOML configuration with environment overrides
//! - An engine owning all models for the server and CLI

pub mod ai;
pub mod categories;
pub mod categorizer;
pub mod config;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod profiler;
pub mod series;

/// Test utilities including mock embedding server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AIClient, BackendConfig, BackendInfo, BackendKind, EntailmentBackend, MockBackend,
    OllamaBackend, OpenAICompatibleBackend,
};
pub use categories::CategorySet;
pub use categorizer::{Categorization, Categorizer, CategorizerConfig, LabelScore};
pub use config::{ConfigSource, CoreConfig};
pub use engine::{EngineStatus, PredictiveEngine};
pub use error::{Error, Result};
pub use forecast::{
    BaselineForecaster, BusyPolicy, ForecastConfig, ForecasterState, NegativePolicy,
    SequenceConfig, SequenceForecaster, SharedForecaster, TrainingReport,
    DEFAULT_MAX_HORIZON,
};
pub use profiler::{Assignment, ProfileModel, ProfilerConfig, SpendingVector};
pub use series::{DatedAmount, TimeSeries};

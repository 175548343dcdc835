//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `categorize` - Transaction categorization
//! - `config` - Show the active configuration
//! - `forecast` - Baseline forecasts and LSTM training
//! - `profile` - Spending archetype classification
//! - `serve` - Web server command

pub mod categorize;
pub mod config;
pub mod forecast;
pub mod profile;
pub mod serve;

// Re-export command functions for main.rs
pub use categorize::*;
pub use config::*;
pub use forecast::*;
pub use profile::*;
pub use serve::*;

use std::path::Path;

use anyhow::{Context, Result};
use mentor_core::{CoreConfig, PredictiveEngine};

/// Load configuration (explicit path, data-dir override, or built-in defaults)
pub fn load_config(config_path: Option<&Path>) -> Result<CoreConfig> {
    CoreConfig::load(config_path).context("Failed to load configuration")
}

/// Load configuration and build the engine
pub fn open_engine(config_path: Option<&Path>) -> Result<PredictiveEngine> {
    let config = load_config(config_path)?;
    tracing::debug!(source = %config.source, "Configuration loaded");
    PredictiveEngine::init(config).context("Failed to initialize predictive engine")
}

/// Format an amount list for terminal output
pub fn format_amounts(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{:.2}", v))
        .collect::<Vec<_>>()
        .join(", ")
}

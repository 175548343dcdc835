//! Configuration for the predictive core
//!
//! Resolution order:
//! 1. An explicit path (`--config`); it must exist
//! 2. `<data_local_dir>/budgetmentor/config/mentor.toml` when present
//! 3. The embedded default (`config/mentor.toml`)
//!
//! Keys missing from a file keep their defaults. Backend settings can then be
//! overridden from the environment:
//!
//! - `AI_BACKEND`: `ollama`, `openai_compatible` (or `openai`, `vllm`, ...), `mock`
//! - `OLLAMA_HOST`, `OLLAMA_EMBED_MODEL`
//! - `OPENAI_COMPATIBLE_HOST`, `OPENAI_COMPATIBLE_MODEL`, `OPENAI_COMPATIBLE_API_KEY`

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::ai::{BackendConfig, BackendKind};
use crate::categorizer::CategorizerConfig;
use crate::error::{Error, Result};
use crate::forecast::{BusyPolicy, ForecastConfig, NegativePolicy, SequenceConfig};
use crate::profiler::ProfilerConfig;

/// Embedded default configuration
pub const DEFAULT_CONFIG: &str = include_str!("../../../config/mentor.toml");

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Embedded,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Embedded => write!(f, "embedded defaults"),
        }
    }
}

/// Complete core configuration
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub backend: BackendConfig,
    pub categorizer: CategorizerConfig,
    pub profiler: ProfilerConfig,
    pub forecast: ForecastConfig,
    pub sequence: SequenceConfig,
    pub source: ConfigSource,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            categorizer: CategorizerConfig::default(),
            profiler: ProfilerConfig::default(),
            forecast: ForecastConfig::default(),
            sequence: SequenceConfig::default(),
            source: ConfigSource::Embedded,
        }
    }
}

impl CoreConfig {
    /// Resolve, parse, and apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::load_file(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Resolve and parse without consulting the environment
    pub fn load_file(path: Option<&Path>) -> Result<Self> {
        let source = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                ConfigSource::File(path.to_path_buf())
            }
            None => match default_config_path() {
                Some(default_path) if default_path.exists() => ConfigSource::File(default_path),
                _ => ConfigSource::Embedded,
            },
        };

        let content = match &source {
            ConfigSource::File(path) => fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?,
            ConfigSource::Embedded => DEFAULT_CONFIG.to_string(),
        };

        let mut config = parse_config(&content)?;

        // Relative population paths are relative to the config file
        if let (ConfigSource::File(file), Some(population)) =
            (&source, config.profiler.population_path.as_mut())
        {
            if population.is_relative() {
                if let Some(dir) = file.parent() {
                    *population = dir.join(&*population);
                }
            }
        }

        debug!(source = %source, "Loaded configuration");
        config.source = source;
        Ok(config)
    }

    /// Apply backend overrides from `lookup` (the process environment in
    /// [`CoreConfig::load`])
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(kind) = lookup("AI_BACKEND") {
            self.backend.kind = BackendKind::parse(&kind)
                .ok_or_else(|| Error::Config(format!("Unknown AI_BACKEND '{}'", kind)))?;
        }

        match self.backend.kind {
            BackendKind::Ollama => {
                if let Some(host) = lookup("OLLAMA_HOST") {
                    self.backend.host = host;
                }
                if let Some(model) = lookup("OLLAMA_EMBED_MODEL") {
                    self.backend.model = model;
                }
            }
            BackendKind::OpenAICompatible => {
                if let Some(host) = lookup("OPENAI_COMPATIBLE_HOST") {
                    self.backend.host = host;
                }
                if let Some(model) = lookup("OPENAI_COMPATIBLE_MODEL") {
                    self.backend.model = model;
                }
                if let Some(key) = lookup("OPENAI_COMPATIBLE_API_KEY") {
                    self.backend.api_key = Some(key);
                }
            }
            BackendKind::Mock => {}
        }

        Ok(())
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("budgetmentor").join("config").join("mentor.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    backend: Option<RawBackend>,
    categorizer: Option<RawCategorizer>,
    profiler: Option<RawProfiler>,
    forecast: Option<RawForecast>,
    sequence: Option<RawSequence>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBackend {
    kind: Option<String>,
    host: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
    temperature: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCategorizer {
    categories: Option<Vec<String>>,
    fallback: Option<String>,
    hypothesis_template: Option<String>,
    min_margin: Option<f64>,
    max_concurrency: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProfiler {
    features: Option<Vec<String>>,
    labels: Option<Vec<String>>,
    max_iterations: Option<usize>,
    tolerance: Option<f64>,
    n_init: Option<usize>,
    seed: Option<u64>,
    population_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawForecast {
    trend_window: Option<usize>,
    noise_spread: Option<f64>,
    horizon: Option<usize>,
    max_horizon: Option<usize>,
    negative_policy: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSequence {
    window: Option<usize>,
    hidden_size: Option<usize>,
    epochs: Option<usize>,
    batch_size: Option<usize>,
    learning_rate: Option<f64>,
    clip_norm: Option<f64>,
    seed: Option<u64>,
    busy_policy: Option<String>,
}

/// Parse config from TOML content
pub fn parse_config(content: &str) -> Result<CoreConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = CoreConfig::default();

    if let Some(backend) = raw.backend {
        if let Some(kind) = backend.kind {
            config.backend.kind = BackendKind::parse(&kind)
                .ok_or_else(|| Error::Config(format!("Unknown backend kind '{}'", kind)))?;
        }
        if let Some(host) = backend.host {
            config.backend.host = host;
        }
        if let Some(model) = backend.model {
            config.backend.model = model;
        }
        if backend.api_key.is_some() {
            config.backend.api_key = backend.api_key;
        }
        if let Some(timeout) = backend.timeout_secs {
            config.backend.timeout = Duration::from_secs(timeout);
        }
        if let Some(temperature) = backend.temperature {
            if !(temperature.is_finite() && temperature > 0.0) {
                return Err(Error::Config(format!(
                    "backend temperature must be positive, got {}",
                    temperature
                )));
            }
            config.backend.temperature = temperature;
        }
    }

    if let Some(categorizer) = raw.categorizer {
        if let Some(categories) = categorizer.categories {
            config.categorizer.categories = categories;
        }
        if let Some(fallback) = categorizer.fallback {
            config.categorizer.fallback = fallback;
        }
        if let Some(template) = categorizer.hypothesis_template {
            config.categorizer.hypothesis_template = template;
        }
        if let Some(margin) = categorizer.min_margin {
            config.categorizer.min_margin = margin;
        }
        if let Some(n) = categorizer.max_concurrency {
            config.categorizer.max_concurrency = n;
        }
    }

    if let Some(profiler) = raw.profiler {
        if let Some(features) = profiler.features {
            config.profiler.features = features;
        }
        if let Some(labels) = profiler.labels {
            config.profiler.labels = labels;
        }
        if let Some(max_iterations) = profiler.max_iterations {
            config.profiler.kmeans.max_iterations = max_iterations;
        }
        if let Some(tolerance) = profiler.tolerance {
            config.profiler.kmeans.tolerance = tolerance;
        }
        if let Some(n_init) = profiler.n_init {
            config.profiler.kmeans.n_init = n_init;
        }
        if let Some(seed) = profiler.seed {
            config.profiler.kmeans.seed = seed;
        }
        config.profiler.population_path = profiler.population_path;
    }

    if let Some(forecast) = raw.forecast {
        if let Some(window) = forecast.trend_window {
            config.forecast.trend_window = window;
        }
        if let Some(spread) = forecast.noise_spread {
            config.forecast.noise_spread = spread;
        }
        if let Some(horizon) = forecast.horizon {
            config.forecast.horizon = horizon;
        }
        if let Some(max_horizon) = forecast.max_horizon {
            config.forecast.max_horizon = max_horizon;
        }
        if let Some(policy) = forecast.negative_policy {
            config.forecast.negative_policy = NegativePolicy::parse(&policy)
                .ok_or_else(|| Error::Config(format!("Unknown negative_policy '{}'", policy)))?;
        }
    }
    config.sequence.negative_policy = config.forecast.negative_policy;
    config.sequence.max_horizon = config.forecast.max_horizon;

    if let Some(sequence) = raw.sequence {
        if let Some(window) = sequence.window {
            config.sequence.window = window;
        }
        if let Some(hidden) = sequence.hidden_size {
            config.sequence.hidden_size = hidden;
        }
        if let Some(epochs) = sequence.epochs {
            config.sequence.epochs = epochs;
        }
        if let Some(batch_size) = sequence.batch_size {
            config.sequence.batch_size = batch_size;
        }
        if let Some(lr) = sequence.learning_rate {
            config.sequence.learning_rate = lr;
        }
        if let Some(clip) = sequence.clip_norm {
            config.sequence.clip_norm = clip;
        }
        if let Some(seed) = sequence.seed {
            config.sequence.seed = seed;
        }
        if let Some(policy) = sequence.busy_policy {
            config.sequence.busy_policy = BusyPolicy::parse(&policy)
                .ok_or_else(|| Error::Config(format!("Unknown busy_policy '{}'", policy)))?;
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_default_config() {
        let config = parse_config(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.backend.kind, BackendKind::Ollama);
        assert_eq!(config.backend.model, "nomic-embed-text");
        assert_eq!(config.categorizer.categories.len(), 8);
        assert_eq!(config.categorizer.fallback, "Other");
        assert_eq!(config.profiler.features, vec!["food", "transport", "entertainment"]);
        assert_eq!(config.profiler.kmeans.seed, 42);
        assert!(config.profiler.population_path.is_none());
        assert_eq!(config.forecast.trend_window, 3);
        assert_eq!(config.forecast.horizon, 4);
        assert_eq!(config.forecast.max_horizon, 120);
        assert_eq!(config.sequence.max_horizon, 120);
        assert_eq!(config.sequence.window, 30);
        assert_eq!(config.sequence.busy_policy, BusyPolicy::Block);
        assert_eq!(config.sequence.negative_policy, NegativePolicy::Clamp);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = parse_config(
            r#"
            [backend]
            kind = "mock"

            [forecast]
            negative_policy = "allow"
            max_horizon = 24
            "#,
        )
        .unwrap();
        assert_eq!(config.sequence.max_horizon, 24);
        assert_eq!(config.backend.kind, BackendKind::Mock);
        assert_eq!(config.backend.timeout, Duration::from_secs(30));
        assert_eq!(config.forecast.negative_policy, NegativePolicy::Allow);
        assert_eq!(config.sequence.negative_policy, NegativePolicy::Allow);
        assert_eq!(config.sequence.hidden_size, 32);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(parse_config("[backend]\nkind = \"bart\"\n").is_err());
        assert!(parse_config("[forecast]\nnegative_policy = \"floor\"\n").is_err());
        assert!(parse_config("[sequence]\nbusy_policy = \"spin\"\n").is_err());
        assert!(parse_config("[backend]\ntemperature = 0.0\n").is_err());
        assert!(parse_config("[sequence]\nwindw = 3\n").is_err());
        assert!(parse_config("not toml [").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("AI_BACKEND", "vllm"),
            ("OLLAMA_HOST", "http://ignored:11434"),
            ("OPENAI_COMPATIBLE_HOST", "http://vllm:8000"),
            ("OPENAI_COMPATIBLE_MODEL", "bge-small"),
            ("OPENAI_COMPATIBLE_API_KEY", "secret"),
        ]
        .into_iter()
        .collect();

        let mut config = CoreConfig::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.backend.kind, BackendKind::OpenAICompatible);
        assert_eq!(config.backend.host, "http://vllm:8000");
        assert_eq!(config.backend.model, "bge-small");
        assert_eq!(config.backend.api_key.as_deref(), Some("secret"));

        let mut config = CoreConfig::default();
        let err = config
            .apply_env(|k| (k == "AI_BACKEND").then(|| "bart".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mentor.toml");
        fs::write(
            &path,
            "[profiler]\npopulation_path = \"people.csv\"\n[sequence]\nwindow = 12\n",
        )
        .unwrap();

        let config = CoreConfig::load_file(Some(path.as_path())).unwrap();
        assert_eq!(config.source, ConfigSource::File(path.clone()));
        assert_eq!(config.sequence.window, 12);
        assert_eq!(
            config.profiler.population_path,
            Some(dir.path().join("people.csv"))
        );
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let err = CoreConfig::load_file(Some(Path::new("/nonexistent/mentor.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}

//! Pluggable local semantic backend abstraction
//!
//! The categorizer never talks to a model directly. It hands a premise (the
//! transaction description) and a list of hypotheses ("This example is about
//! Travel.") to an `EntailmentBackend`, which returns one probability per
//! hypothesis.
//!
//! # Architecture
//!
//! - `EntailmentBackend` trait: the scoring contract
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OllamaBackend`, `OpenAICompatibleBackend`, `MockBackend`
//!
//! The HTTP backends score by embedding similarity. All backends run locally;
//! nothing here calls a hosted API unless the configured host points at one.
//!
//! # Usage
//!
//! ```rust,ignore
//! let ai = AIClient::from_config(&config.backend);
//! let scores = ai.score("UBER *TRIP", &hypotheses).await?;
//! ```

mod mock;
mod ollama;
mod openai_compatible;
pub mod similarity;
pub mod types;

pub use mock::MockBackend;
pub use ollama::OllamaBackend;
pub use openai_compatible::OpenAICompatibleBackend;
pub use types::*;

use async_trait::async_trait;

use crate::error::Result;

/// Trait defining the interface for all semantic backends
///
/// Backends should be Send + Sync so one instance can be shared by every
/// concurrent categorization call.
#[async_trait]
pub trait EntailmentBackend: Send + Sync {
    /// Score every hypothesis against the premise.
    ///
    /// Returns one probability per hypothesis, in input order, summing to 1.
    /// Transport and model failures surface as `Error::ModelUnavailable`.
    async fn score(&self, premise: &str, hypotheses: &[String]) -> Result<Vec<f64>>;

    /// Check if the backend is reachable and serving
    async fn health_check(&self) -> bool;

    /// Get the model name (for logging)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;

    fn info(&self) -> BackendInfo;
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AIClient {
    Ollama(OllamaBackend),
    OpenAICompatible(OpenAICompatibleBackend),
    Mock(MockBackend),
}

impl AIClient {
    /// Create a client for the configured backend kind
    pub fn from_config(config: &BackendConfig) -> Self {
        match config.kind {
            BackendKind::Ollama => AIClient::Ollama(OllamaBackend::from_config(config)),
            BackendKind::OpenAICompatible => {
                AIClient::OpenAICompatible(OpenAICompatibleBackend::from_config(config))
            }
            BackendKind::Mock => AIClient::Mock(MockBackend::new()),
        }
    }

    /// Create an Ollama backend directly
    pub fn ollama(host: &str, model: &str) -> Self {
        AIClient::Ollama(OllamaBackend::new(host, model))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }

    /// Create a new instance with a different embedding model
    pub fn with_model(&self, model: &str) -> Self {
        match self {
            AIClient::Ollama(b) => AIClient::Ollama(b.with_model(model)),
            AIClient::OpenAICompatible(b) => AIClient::OpenAICompatible(b.with_model(model)),
            AIClient::Mock(b) => AIClient::Mock(b.clone()),
        }
    }
}

#[async_trait]
impl EntailmentBackend for AIClient {
    async fn score(&self, premise: &str, hypotheses: &[String]) -> Result<Vec<f64>> {
        match self {
            AIClient::Ollama(b) => b.score(premise, hypotheses).await,
            AIClient::OpenAICompatible(b) => b.score(premise, hypotheses).await,
            AIClient::Mock(b) => b.score(premise, hypotheses).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::Ollama(b) => b.health_check().await,
            AIClient::OpenAICompatible(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::Ollama(b) => b.model(),
            AIClient::OpenAICompatible(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::Ollama(b) => b.host(),
            AIClient::OpenAICompatible(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }

    fn info(&self) -> BackendInfo {
        match self {
            AIClient::Ollama(b) => b.info(),
            AIClient::OpenAICompatible(b) => b.info(),
            AIClient::Mock(b) => b.info(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_client_mock() {
        let client = AIClient::mock();
        assert_eq!(client.model(), "mock");
        assert_eq!(client.host(), "mock://localhost");
    }

    #[test]
    fn test_from_config_selects_backend() {
        let config = BackendConfig {
            kind: BackendKind::OpenAICompatible,
            host: "http://localhost:8080/".to_string(),
            model: "bge-small".to_string(),
            ..Default::default()
        };
        let client = AIClient::from_config(&config);
        assert!(matches!(client, AIClient::OpenAICompatible(_)));
        assert_eq!(client.host(), "http://localhost:8080");
        assert_eq!(client.with_model("e5").model(), "e5");
    }

    #[tokio::test]
    async fn test_mock_health_check() {
        let client = AIClient::mock();
        assert!(client.health_check().await);
    }

    #[tokio::test]
    async fn test_mock_scores_are_probabilities() {
        let client = AIClient::mock();
        let hypotheses = vec![
            "This example is about Food & Dining.".to_string(),
            "This example is about Transportation.".to_string(),
        ];
        let scores = client.score("UBER TRIP", &hypotheses).await.unwrap();
        assert_eq!(scores.len(), 2);
        assert!((scores.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(scores[1] > scores[0]);
    }
}

//! Ollama backend implementation
//!
//! HTTP client for the Ollama embedding API (`POST /api/embed`). Any
//! embedding model pulled into Ollama works, e.g. `nomic-embed-text` or
//! `mxbai-embed-large`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::similarity::{score_by_embedding, EmbeddingCache, Embedder};
use super::types::{BackendConfig, BackendInfo, BackendKind};
use super::EntailmentBackend;

/// Ollama embedding backend
#[derive(Clone)]
pub struct OllamaBackend {
    http_client: Client,
    base_url: String,
    model: String,
    timeout: Duration,
    temperature: f64,
    cache: EmbeddingCache,
}

impl OllamaBackend {
    /// Create a new Ollama backend with default timeout and temperature
    pub fn new(base_url: &str, model: &str) -> Self {
        let defaults = BackendConfig::default();
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout: defaults.timeout,
            temperature: defaults.temperature,
            cache: EmbeddingCache::default(),
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            timeout: config.timeout,
            temperature: config.temperature,
            ..Self::new(&config.host, &config.model)
        }
    }

    /// Create a new instance with a different model
    ///
    /// The embedding cache is not shared: vectors from different models are
    /// not comparable.
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            http_client: self.http_client.clone(),
            base_url: self.base_url.clone(),
            model: model.to_string(),
            timeout: self.timeout,
            temperature: self.temperature,
            cache: EmbeddingCache::default(),
        }
    }
}

/// Request to Ollama embed API
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

/// Response from Ollama embed API
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f64>>,
}

#[async_trait]
impl Embedder for OllamaBackend {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f64>>> {
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .http_client
            .post(format!("{}/api/embed", self.base_url))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(host = %self.base_url, error = %e, "Ollama request failed");
                Error::ModelUnavailable(format!("Ollama unreachable at {}: {}", self.base_url, e))
            })?;

        if !response.status().is_success() {
            return Err(Error::ModelUnavailable(format!(
                "Ollama returned {} for model {}",
                response.status(),
                self.model
            )));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::ModelUnavailable(format!("Malformed Ollama response: {}", e)))?;
        debug!(count = body.embeddings.len(), "Ollama embeddings received");

        Ok(body.embeddings)
    }
}

#[async_trait]
impl EntailmentBackend for OllamaBackend {
    async fn score(&self, premise: &str, hypotheses: &[String]) -> Result<Vec<f64>> {
        score_by_embedding(self, &self.cache, self.temperature, premise, hypotheses).await
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }

    fn info(&self) -> BackendInfo {
        BackendInfo {
            kind: BackendKind::Ollama,
            host: self.base_url.clone(),
            model: self.model.clone(),
        }
    }
}

//! OpenAI-compatible backend implementation
//!
//! Works with any server that implements the OpenAI embeddings API
//! (`POST /v1/embeddings`):
//! - Docker Model Runner (http://localhost:12434)
//! - vLLM (http://localhost:8000)
//! - LocalAI (http://localhost:8080)
//! - llama-server / llama.cpp started with `--embedding`
//! - text-embeddings-inference

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::similarity::{score_by_embedding, EmbeddingCache, Embedder};
use super::types::{BackendConfig, BackendInfo, BackendKind};
use super::EntailmentBackend;

/// OpenAI-compatible embedding backend
#[derive(Clone)]
pub struct OpenAICompatibleBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
    temperature: f64,
    cache: EmbeddingCache,
}

impl OpenAICompatibleBackend {
    /// Create a new OpenAI-compatible backend
    pub fn new(base_url: &str, model: &str) -> Self {
        let defaults = BackendConfig::default();
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: None,
            timeout: defaults.timeout,
            temperature: defaults.temperature,
            cache: EmbeddingCache::default(),
        }
    }

    /// Create with an API key
    pub fn with_api_key(base_url: &str, model: &str, api_key: &str) -> Self {
        Self {
            api_key: Some(api_key.to_string()),
            ..Self::new(base_url, model)
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            timeout: config.timeout,
            temperature: config.temperature,
            ..Self::new(&config.host, &config.model)
        }
    }

    /// Create a new instance with a different model (fresh embedding cache)
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            http_client: self.http_client.clone(),
            base_url: self.base_url.clone(),
            model: model.to_string(),
            api_key: self.api_key.clone(),
            timeout: self.timeout,
            temperature: self.temperature,
            cache: EmbeddingCache::default(),
        }
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.api_key {
            Some(ref api_key) => builder.header("Authorization", format!("Bearer {}", api_key)),
            None => builder,
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f64>,
    #[serde(default)]
    index: usize,
}

#[async_trait]
impl Embedder for OpenAICompatibleBackend {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f64>>> {
        let request = EmbeddingsRequest {
            model: &self.model,
            input: texts,
        };

        let builder = self
            .http_client
            .post(format!("{}/v1/embeddings", self.base_url))
            .timeout(self.timeout)
            .json(&request);

        let response = self.authorize(builder).send().await.map_err(|e| {
            warn!(host = %self.base_url, error = %e, "Embedding request failed");
            Error::ModelUnavailable(format!("Embedding server unreachable at {}: {}", self.base_url, e))
        })?;

        if !response.status().is_success() {
            return Err(Error::ModelUnavailable(format!(
                "Embedding server returned {} for model {}",
                response.status(),
                self.model
            )));
        }

        let mut body: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| Error::ModelUnavailable(format!("Malformed embeddings response: {}", e)))?;
        debug!(count = body.data.len(), "Embeddings received");

        // Servers may return items out of order
        body.data.sort_by_key(|d| d.index);
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EntailmentBackend for OpenAICompatibleBackend {
    async fn score(&self, premise: &str, hypotheses: &[String]) -> Result<Vec<f64>> {
        score_by_embedding(self, &self.cache, self.temperature, premise, hypotheses).await
    }

    async fn health_check(&self) -> bool {
        let builder = self
            .http_client
            .get(format!("{}/v1/models", self.base_url))
            .timeout(self.timeout);

        match self.authorize(builder).send().await {
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
            kind: BackendKind::OpenAICompatible,
            host: self.base_url.clone(),
            model: self.model.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockEmbeddingServer;

    #[tokio::test]
    async fn test_score_against_mock_server() {
        let server = MockEmbeddingServer::start().await;
        let backend = OpenAICompatibleBackend::with_api_key(&server.url(), "bge-small", "secret");

        assert!(backend.health_check().await);

        let hypotheses = vec![
            "This example is about Transportation.".to_string(),
            "This example is about Entertainment.".to_string(),
        ];
        let scores = backend
            .score("Monthly Netflix movie subscription", &hypotheses)
            .await
            .unwrap();
        assert!(scores[1] > scores[0]);
    }
}

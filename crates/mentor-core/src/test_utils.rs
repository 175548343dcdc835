//! Test utilities for mentor-core
//!
//! This module provides a mock embedding server that speaks both the Ollama
//! and the OpenAI-compatible embedding APIs, for integration tests and
//! development without a model installed.

use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::sync::oneshot;

/// Topic vocabulary; each topic is one embedding dimension
const TOPICS: &[&[&str]] = &[
    &["food", "dining", "restaurant", "pizza", "dinner", "lunch", "coffee", "grocery"],
    &["transportation", "uber", "taxi", "bus", "train", "fuel", "gas"],
    &["entertainment", "netflix", "movie", "concert", "music", "game"],
    &["shopping", "amazon", "store", "mall"],
    &["utilities", "electric", "water", "internet"],
    &["health", "fitness", "gym", "pharmacy"],
    &["travel", "hotel", "flight", "airline"],
];

/// Mock embedding server for testing and development
pub struct MockEmbeddingServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockEmbeddingServer {
    /// Start a healthy mock server on an available port
    pub async fn start() -> Self {
        Self::start_with(true).await
    }

    /// Start a server whose embedding endpoints answer 500
    pub async fn start_failing() -> Self {
        Self::start_with(false).await
    }

    async fn start_with(healthy: bool) -> Self {
        let app = Router::new()
            .route("/api/tags", get(handle_tags))
            .route("/api/embed", post(handle_ollama_embed))
            .route("/v1/models", get(handle_models))
            .route("/v1/embeddings", post(handle_openai_embeddings))
            .with_state(healthy);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockEmbeddingServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Deterministic bag-of-topics embedding with a small bias on every dimension
pub fn mock_embedding(text: &str) -> Vec<f64> {
    let lower = text.to_lowercase();
    TOPICS
        .iter()
        .map(|words| 0.1 + words.iter().filter(|w| lower.contains(*w)).count() as f64)
        .collect()
}

#[derive(Debug, Deserialize)]
struct EmbedRequest {
    #[allow(dead_code)]
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Serialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f64>>,
}

#[derive(Debug, Serialize)]
struct OpenAIEmbeddingsResponse {
    data: Vec<OpenAIEmbedding>,
}

#[derive(Debug, Serialize)]
struct OpenAIEmbedding {
    embedding: Vec<f64>,
    index: usize,
}

async fn handle_tags() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "models": [{ "name": "nomic-embed-text:latest" }]
    }))
}

async fn handle_models() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "object": "list",
        "data": [{ "id": "bge-small", "object": "model" }]
    }))
}

async fn handle_ollama_embed(
    State(healthy): State<bool>,
    Json(request): Json<EmbedRequest>,
) -> Result<Json<OllamaEmbedResponse>, StatusCode> {
    if !healthy {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(Json(OllamaEmbedResponse {
        embeddings: request.input.iter().map(|t| mock_embedding(t)).collect(),
    }))
}

async fn handle_openai_embeddings(
    State(healthy): State<bool>,
    Json(request): Json<EmbedRequest>,
) -> Result<Json<OpenAIEmbeddingsResponse>, StatusCode> {
    if !healthy {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    // Reverse order to exercise index-based reordering in clients
    let data = request
        .input
        .iter()
        .enumerate()
        .rev()
        .map(|(index, t)| OpenAIEmbedding {
            embedding: mock_embedding(t),
            index,
        })
        .collect();
    Ok(Json(OpenAIEmbeddingsResponse { data }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_embedding_topics() {
        let v = mock_embedding("Hotel and flight booking");
        assert_eq!(v.len(), TOPICS.len());
        assert!(v[6] > 2.0);
        assert!((v[0] - 0.1).abs() < 1e-12);
    }
}

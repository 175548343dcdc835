//! Semantic backend configuration and wire-independent types

use std::time::Duration;

use serde::Serialize;

/// Which semantic backend scores categorization hypotheses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Ollama `/api/embed`
    Ollama,
    /// Any server implementing OpenAI `/v1/embeddings`
    OpenAICompatible,
    /// Deterministic keyword scorer for tests and offline development
    Mock,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAICompatible => "openai_compatible",
            Self::Mock => "mock",
        }
    }

    /// Parse a backend name, accepting the aliases of common local servers
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "openai_compatible" | "openai" | "vllm" | "localai" | "llamacpp" => {
                Some(Self::OpenAICompatible)
            }
            "mock" => Some(Self::Mock),
            _ => None,
        }
    }
}

/// Connection settings for the semantic backend
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// Server URL (ignored by the mock backend)
    pub host: String,
    /// Embedding model name
    pub model: String,
    /// Bearer token for OpenAI-compatible servers
    pub api_key: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Softmax temperature applied to cosine similarities
    pub temperature: f64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Ollama,
            host: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
            temperature: 0.05,
        }
    }
}

/// Backend identity for logging and the health endpoint
#[derive(Debug, Clone, Serialize)]
pub struct BackendInfo {
    pub kind: BackendKind,
    pub host: String,
    pub model: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_aliases() {
        assert_eq!(BackendKind::parse("OLLAMA"), Some(BackendKind::Ollama));
        assert_eq!(BackendKind::parse("vllm"), Some(BackendKind::OpenAICompatible));
        assert_eq!(BackendKind::parse("mock"), Some(BackendKind::Mock));
        assert_eq!(BackendKind::parse("bart"), None);
        assert_eq!(BackendKind::OpenAICompatible.as_str(), "openai_compatible");
    }
}

//! Embedding similarity scoring shared by the HTTP backends
//!
//! Zero-shot scoring: the premise and every hypothesis are embedded, each
//! hypothesis is scored by cosine similarity to the premise, and the
//! similarities are turned into probabilities with a temperature softmax.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Hypothesis embeddings keyed by text. Category hypotheses are fixed per
/// process, so each one is embedded at most once.
pub(crate) type EmbeddingCache = Arc<RwLock<HashMap<String, Vec<f64>>>>;

/// Anything that can turn texts into embedding vectors, in input order
#[async_trait]
pub(crate) trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f64>>>;
}

/// Score hypotheses against a premise through an embedder, reusing cached
/// hypothesis embeddings
pub(crate) async fn score_by_embedding<E: Embedder + ?Sized>(
    embedder: &E,
    cache: &EmbeddingCache,
    temperature: f64,
    premise: &str,
    hypotheses: &[String],
) -> Result<Vec<f64>> {
    let missing: Vec<String> = {
        let cache = cache
            .read()
            .map_err(|_| Error::ModelUnavailable("embedding cache lock poisoned".into()))?;
        let mut missing: Vec<String> = Vec::new();
        for h in hypotheses {
            if !cache.contains_key(h) && !missing.contains(h) {
                missing.push(h.clone());
            }
        }
        missing
    };

    let mut texts = Vec::with_capacity(missing.len() + 1);
    texts.push(premise.to_string());
    texts.extend(missing.iter().cloned());

    let mut vectors = embedder.embed(&texts).await?;
    if vectors.len() != texts.len() {
        return Err(Error::ModelUnavailable(format!(
            "backend returned {} embeddings for {} inputs",
            vectors.len(),
            texts.len()
        )));
    }
    let premise_vec = vectors.remove(0);

    let mut cache = cache
        .write()
        .map_err(|_| Error::ModelUnavailable("embedding cache lock poisoned".into()))?;
    for (text, vector) in missing.into_iter().zip(vectors) {
        cache.insert(text, vector);
    }

    let similarities: Vec<f64> = hypotheses
        .iter()
        .map(|h| {
            cache
                .get(h)
                .map(|v| cosine_similarity(&premise_vec, v))
                .unwrap_or(0.0)
        })
        .collect();

    Ok(softmax(&similarities, temperature))
}

/// Cosine similarity; 0.0 when either vector has zero norm or lengths differ
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Temperature-scaled softmax. Output sums to 1 for non-empty input.
pub fn softmax(values: &[f64], temperature: f64) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let t = if temperature > 0.0 { temperature } else { 1.0 };

    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = values.iter().map(|v| ((v - max) / t).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds texts as keyword indicator vectors and counts calls
    struct KeywordEmbedder {
        calls: AtomicUsize,
        embedded: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f64>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.embedded.fetch_add(texts.len(), Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| {
                    let t = t.to_lowercase();
                    vec![
                        if t.contains("coffee") || t.contains("food") { 1.0 } else { 0.1 },
                        if t.contains("bus") || t.contains("transport") { 1.0 } else { 0.1 },
                    ]
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_score_by_embedding_caches_hypotheses() {
        let embedder = KeywordEmbedder {
            calls: AtomicUsize::new(0),
            embedded: AtomicUsize::new(0),
        };
        let cache = EmbeddingCache::default();
        let hypotheses = vec!["about food".to_string(), "about transport".to_string()];

        let scores = score_by_embedding(&embedder, &cache, 0.1, "morning coffee", &hypotheses)
            .await
            .unwrap();
        assert!(scores[0] > scores[1]);

        let scores = score_by_embedding(&embedder, &cache, 0.1, "bus ticket", &hypotheses)
            .await
            .unwrap();
        assert!(scores[1] > scores[0]);

        // Second call only embeds the premise
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
        assert_eq!(embedder.embedded.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-12);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-12);
        assert!((cosine_similarity(&[1.0, 1.0], &[-1.0, -1.0]) + 1.0).abs() < 1e-12);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_softmax_sums_to_one_and_preserves_order() {
        let probs = softmax(&[0.2, 0.5, 0.1], 0.05);
        let sum: f64 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(probs[1] > probs[0] && probs[0] > probs[2]);
    }

    #[test]
    fn test_softmax_uniform_for_equal_inputs() {
        let probs = softmax(&[3.0, 3.0, 3.0, 3.0], 1.0);
        for p in probs {
            assert!((p - 0.25).abs() < 1e-12);
        }
    }
}

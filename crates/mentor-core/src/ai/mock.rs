//! Mock backend for testing
//!
//! Scores hypotheses with a fixed merchant keyword table instead of a model.
//! Useful for unit tests and development without a running embedding server.

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::similarity::softmax;
use super::types::{BackendInfo, BackendKind};
use super::EntailmentBackend;

/// Keywords per category label (lowercase label, merchant/description hints)
const KEYWORDS: &[(&str, &[&str])] = &[
    (
        "food & dining",
        &[
            "starbucks", "coffee", "cafe", "restaurant", "pizza", "burger", "mcdonald",
            "grocery", "whole foods", "wholefds", "trader joe", "doordash", "grubhub",
            "lunch", "dinner", "bakery",
        ],
    ),
    (
        "transportation",
        &[
            "uber", "lyft", "taxi", "metro", "bus", "transit", "shell", "chevron", "exxon",
            "parking", "toll", "fuel",
        ],
    ),
    (
        "entertainment",
        &[
            "netflix", "spotify", "hulu", "cinema", "movie", "theater", "concert", "steam",
            "disney", "playstation",
        ],
    ),
    (
        "shopping",
        &["amazon", "amzn", "target", "walmart", "costco", "best buy", "ebay", "ikea"],
    ),
    (
        "utilities",
        &["electric", "water bill", "internet", "comcast", "verizon", "utility", "pg&e"],
    ),
    (
        "health & fitness",
        &["gym", "pharmacy", "cvs", "walgreens", "doctor", "dental", "fitness", "yoga"],
    ),
    (
        "travel",
        &["airline", "airlines", "flight", "hotel", "airbnb", "expedia", "marriott"],
    ),
];

/// Softmax temperature for keyword hit counts
const MOCK_TEMPERATURE: f64 = 0.25;

/// Mock semantic backend for testing
///
/// Deterministic: the same premise and hypotheses always produce the same
/// scores. A description with no known keyword scores every hypothesis
/// equally.
#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check and score should succeed
    pub healthy: bool,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self { healthy: true }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self { healthy: false }
    }

    fn keyword_hits(premise: &str, hypothesis: &str) -> f64 {
        let premise = premise.to_lowercase();
        let hypothesis = hypothesis.to_lowercase();

        KEYWORDS
            .iter()
            .filter(|(label, _)| hypothesis.contains(label))
            .flat_map(|(_, words)| words.iter())
            .filter(|w| premise.contains(*w))
            .count() as f64
    }
}

#[async_trait]
impl EntailmentBackend for MockBackend {
    async fn score(&self, premise: &str, hypotheses: &[String]) -> Result<Vec<f64>> {
        if !self.healthy {
            return Err(Error::ModelUnavailable("mock backend is unhealthy".into()));
        }

        let hits: Vec<f64> = hypotheses
            .iter()
            .map(|h| Self::keyword_hits(premise, h))
            .collect();

        Ok(softmax(&hits, MOCK_TEMPERATURE))
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }

    fn info(&self) -> BackendInfo {
        BackendInfo {
            kind: BackendKind::Mock,
            host: self.host().to_string(),
            model: self.model().to_string(),
        }
    }
}

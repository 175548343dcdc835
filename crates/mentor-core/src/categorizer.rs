//! Transaction categorizer
//!
//! Zero-shot classification of a free-text transaction description into one
//! member of a closed `CategorySet`. The description is the premise, and each
//! category becomes a hypothesis rendered from a template ("This example is
//! about {}."). The semantic backend scores every hypothesis and the
//! best-scoring category wins.
//!
//! ## Policies
//!
//! - Empty or whitespace-only descriptions are rejected with
//!   `Error::InvalidInput`; they are never mapped to a category.
//! - Low-margin fallback: when the winner leads the runner-up by less than
//!   `min_margin`, the fallback category ("Other") is returned and the decision
//!   is logged. `min_margin = 0.0` turns the policy off.
//! - Equal scores resolve to the category listed first.
//! - Backend failures are surfaced as `Error::ModelUnavailable`, never replaced
//!   by a default category.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::ai::{AIClient, EntailmentBackend};
use crate::categories::{CategorySet, DEFAULT_CATEGORIES, DEFAULT_FALLBACK};
use crate::error::{Error, Result};

/// Placeholder replaced by the category label in the hypothesis template
const LABEL_PLACEHOLDER: &str = "{}";

/// Categorizer settings
#[derive(Debug, Clone)]
pub struct CategorizerConfig {
    pub categories: Vec<String>,
    pub fallback: String,
    /// Hypothesis template; must contain `{}`
    pub hypothesis_template: String,
    /// Minimum lead of the winner over the runner-up, in probability units
    pub min_margin: f64,
    /// Maximum in-flight backend calls for batch categorization
    pub max_concurrency: usize,
}

impl Default for CategorizerConfig {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect(),
            fallback: DEFAULT_FALLBACK.to_string(),
            hypothesis_template: "This example is about {}.".to_string(),
            min_margin: 0.05,
            max_concurrency: 8,
        }
    }
}

/// Score of one category for one description
#[derive(Debug, Clone, Serialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// Full categorization outcome
#[derive(Debug, Clone, Serialize)]
pub struct Categorization {
    /// The chosen category, always a member of the category set
    pub category: String,
    /// Per-category scores, in category-set order
    pub scores: Vec<LabelScore>,
    /// True when the low-margin policy replaced the winner with the fallback
    pub fallback_applied: bool,
}

/// Zero-shot transaction categorizer
///
/// Cheap to clone; clones share the backend and category set.
#[derive(Clone)]
pub struct Categorizer {
    backend: AIClient,
    categories: Arc<CategorySet>,
    hypotheses: Arc<Vec<String>>,
    min_margin: f64,
    max_concurrency: usize,
}

impl Categorizer {
    pub fn new(backend: AIClient, config: &CategorizerConfig) -> Result<Self> {
        let categories = CategorySet::new(&config.categories, &config.fallback)?;

        if !config.hypothesis_template.contains(LABEL_PLACEHOLDER) {
            return Err(Error::Config(format!(
                "hypothesis template must contain {}: {:?}",
                LABEL_PLACEHOLDER, config.hypothesis_template
            )));
        }
        if !(0.0..=1.0).contains(&config.min_margin) {
            return Err(Error::Config(format!(
                "min_margin must be within [0, 1], got {}",
                config.min_margin
            )));
        }
        if config.max_concurrency == 0 {
            return Err(Error::Config("max_concurrency must be at least 1".into()));
        }

        let hypotheses = categories
            .labels()
            .iter()
            .map(|label| config.hypothesis_template.replacen(LABEL_PLACEHOLDER, label, 1))
            .collect();

        Ok(Self {
            backend,
            categories: Arc::new(categories),
            hypotheses: Arc::new(hypotheses),
            min_margin: config.min_margin,
            max_concurrency: config.max_concurrency,
        })
    }

    pub fn categories(&self) -> &CategorySet {
        &self.categories
    }

    pub fn backend(&self) -> &AIClient {
        &self.backend
    }

    /// Categorize one description
    pub async fn categorize(&self, description: &str) -> Result<String> {
        Ok(self.categorize_detailed(description).await?.category)
    }

    /// Categorize one description, returning every category's score
    pub async fn categorize_detailed(&self, description: &str) -> Result<Categorization> {
        let premise = validate_description(description)?;

        let scores = self.backend.score(premise, &self.hypotheses).await?;
        if scores.len() != self.categories.len() {
            return Err(Error::ModelUnavailable(format!(
                "backend returned {} scores for {} categories",
                scores.len(),
                self.categories.len()
            )));
        }
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(Error::ModelUnavailable(
                "backend returned non-finite scores".into(),
            ));
        }

        let (best, margin) = pick_winner(&scores);
        let winner = &self.categories.labels()[best];

        let fallback_applied = margin < self.min_margin && winner != self.categories.fallback();
        let category = if fallback_applied {
            info!(
                description = %premise,
                candidate = %winner,
                margin,
                min_margin = self.min_margin,
                "Low-margin categorization, using fallback category"
            );
            self.categories.fallback().to_string()
        } else {
            winner.clone()
        };

        debug!(description = %premise, category = %category, "Categorized transaction");

        let scores = self
            .categories
            .labels()
            .iter()
            .zip(scores)
            .map(|(label, score)| LabelScore {
                label: label.clone(),
                score,
            })
            .collect();

        Ok(Categorization {
            category,
            scores,
            fallback_applied,
        })
    }

    /// Categorize many descriptions concurrently
    ///
    /// Output has the input's length and order, and each element equals what
    /// `categorize` returns for the same description. Items share no state,
    /// so they run in parallel, at most `max_concurrency` at a time. Input is
    /// validated up front; if any backend call fails, the error of the
    /// earliest failing item is returned.
    pub async fn batch_categorize(&self, descriptions: &[String]) -> Result<Vec<String>> {
        for (i, description) in descriptions.iter().enumerate() {
            validate_description(description)
                .map_err(|_| Error::InvalidInput(format!("description #{} is empty", i)))?;
        }

        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for (i, description) in descriptions.iter().enumerate() {
            let categorizer = self.clone();
            let permits = permits.clone();
            let description = description.clone();
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                (i, categorizer.categorize(&description).await)
            });
        }

        let mut results: Vec<Option<Result<String>>> =
            (0..descriptions.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            let (i, result) = joined.map_err(|e| {
                Error::ModelUnavailable(format!("categorization task failed: {}", e))
            })?;
            results[i] = Some(result);
        }

        results
            .into_iter()
            .map(|r| r.unwrap_or_else(|| Err(Error::ModelUnavailable("task lost".into()))))
            .collect()
    }
}

fn validate_description(description: &str) -> Result<&str> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("description must not be empty".into()));
    }
    Ok(trimmed)
}

/// Index of the highest score (earliest on ties) and its lead over the runner-up
fn pick_winner(scores: &[f64]) -> (usize, f64) {
    let mut best = 0;
    for (i, s) in scores.iter().enumerate().skip(1) {
        if *s > scores[best] {
            best = i;
        }
    }

    let runner_up = scores
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != best)
        .map(|(_, s)| *s)
        .fold(f64::NEG_INFINITY, f64::max);

    let margin = if runner_up.is_finite() {
        scores[best] - runner_up
    } else {
        scores[best]
    };
    (best, margin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockBackend;

    fn mock_categorizer() -> Categorizer {
        Categorizer::new(AIClient::mock(), &CategorizerConfig::default()).unwrap()
    }

    #[test]
    fn test_pick_winner() {
        assert_eq!(pick_winner(&[0.1, 0.7, 0.2]).0, 1);
        assert!((pick_winner(&[0.1, 0.7, 0.2]).1 - 0.5).abs() < 1e-12);
        // Ties go to the earliest index
        assert_eq!(pick_winner(&[0.4, 0.4, 0.2]), (0, 0.0));
        assert_eq!(pick_winner(&[1.0]), (0, 1.0));
    }

    #[tokio::test]
    async fn test_categorize_known_merchants() {
        let c = mock_categorizer();
        assert_eq!(c.categorize("STARBUCKS STORE #1234").await.unwrap(), "Food & Dining");
        assert_eq!(c.categorize("UBER *TRIP HELP.UBER.COM").await.unwrap(), "Transportation");
        assert_eq!(c.categorize("NETFLIX.COM").await.unwrap(), "Entertainment");
        assert_eq!(c.categorize("Delta Airlines flight").await.unwrap(), "Travel");
    }

    #[tokio::test]
    async fn test_low_margin_falls_back_to_other() {
        let c = mock_categorizer();
        let result = c.categorize_detailed("ZXQ 00912").await.unwrap();
        assert_eq!(result.category, "Other");
        assert!(result.fallback_applied);
        assert_eq!(result.scores.len(), 8);
    }

    #[tokio::test]
    async fn test_zero_margin_disables_fallback() {
        let config = CategorizerConfig {
            min_margin: 0.0,
            ..Default::default()
        };
        let c = Categorizer::new(AIClient::mock(), &config).unwrap();
        let result = c.categorize_detailed("ZXQ 00912").await.unwrap();
        // Uniform scores: earliest category wins
        assert_eq!(result.category, "Food & Dining");
        assert!(!result.fallback_applied);
    }

    #[tokio::test]
    async fn test_empty_description_rejected() {
        let c = mock_categorizer();
        assert!(matches!(c.categorize("").await, Err(Error::InvalidInput(_))));
        assert!(matches!(c.categorize("   \t").await, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_unavailable_backend() {
        let c = Categorizer::new(
            AIClient::Mock(MockBackend::unhealthy()),
            &CategorizerConfig::default(),
        )
        .unwrap();
        assert!(matches!(
            c.categorize("coffee").await,
            Err(Error::ModelUnavailable(_))
        ));
        assert!(matches!(
            c.batch_categorize(&["coffee".to_string()]).await,
            Err(Error::ModelUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_output_always_in_category_set() {
        let c = mock_categorizer();
        for d in [
            "WHOLEFDS MKT 10234",
            "CVS PHARMACY",
            "COMCAST CABLE INTERNET",
            "TARGET 00012",
            "random words here",
            "!!!",
        ] {
            let category = c.categorize(d).await.unwrap();
            assert!(c.categories().contains(&category), "{} -> {}", d, category);
        }
    }

    #[tokio::test]
    async fn test_batch_matches_individual_calls() {
        let config = CategorizerConfig {
            max_concurrency: 2,
            ..Default::default()
        };
        let c = Categorizer::new(AIClient::mock(), &config).unwrap();
        let descriptions: Vec<String> = [
            "NETFLIX.COM",
            "SHELL OIL 5544",
            "ZXQ 00912",
            "AMAZON MKTPLACE",
            "PLANET FITNESS GYM",
            "AIRBNB * HMQ",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let batch = c.batch_categorize(&descriptions).await.unwrap();
        assert_eq!(batch.len(), descriptions.len());
        for (d, category) in descriptions.iter().zip(&batch) {
            assert_eq!(&c.categorize(d).await.unwrap(), category);
        }
        assert_eq!(batch[0], "Entertainment");
        assert_eq!(batch[2], "Other");
    }

    #[tokio::test]
    async fn test_batch_empty_and_invalid() {
        let c = mock_categorizer();
        assert!(c.batch_categorize(&[]).await.unwrap().is_empty());

        let err = c
            .batch_categorize(&["coffee".to_string(), " ".to_string()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("#1"));
    }

    #[test]
    fn test_config_validation() {
        let bad_template = CategorizerConfig {
            hypothesis_template: "About the category".to_string(),
            ..Default::default()
        };
        assert!(Categorizer::new(AIClient::mock(), &bad_template).is_err());

        let bad_margin = CategorizerConfig {
            min_margin: 1.5,
            ..Default::default()
        };
        assert!(Categorizer::new(AIClient::mock(), &bad_margin).is_err());

        let bad_concurrency = CategorizerConfig {
            max_concurrency: 0,
            ..Default::default()
        };
        assert!(Categorizer::new(AIClient::mock(), &bad_concurrency).is_err());
    }
}

//! Spending profiler
//!
//! Maps a fixed-length spending vector to a behavioral archetype. The model is
//! fitted once over a population ([`ProfileModel::fit`]) and then assigns
//! vectors read-only ([`ProfileModel::classify_profile`]), so one fitted model
//! can be shared across threads behind an `Arc`.
//!
//! Fitting standardizes the population, clusters it with k-means, and then
//! reorders the clusters by ascending total spend of their centroids. The
//! label table therefore always reads from lowest to highest spender,
//! regardless of which order k-means happened to discover the clusters in.

mod kmeans;
pub mod population;
mod scaler;

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

pub use kmeans::KMeansConfig;
pub use population::{load_population, load_population_file, reference_population};
pub use scaler::StandardScaler;

/// Default feature names, in vector order
pub const DEFAULT_FEATURES: &[&str] = &["food", "transport", "entertainment"];

/// Default archetype labels, lowest total spend first
pub const DEFAULT_LABELS: &[&str] = &["Conservative Spender", "Balanced Spender", "High Spender"];

/// Profiler settings
#[derive(Debug, Clone)]
pub struct ProfilerConfig {
    pub features: Vec<String>,
    /// Cluster index -> archetype label; its length is the cluster count
    pub labels: Vec<String>,
    pub kmeans: KMeansConfig,
    /// Population CSV; the embedded reference population when unset
    pub population_path: Option<PathBuf>,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            features: DEFAULT_FEATURES.iter().map(|s| s.to_string()).collect(),
            labels: DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
            kmeans: KMeansConfig::default(),
            population_path: None,
        }
    }
}

impl ProfilerConfig {
    /// Load the configured population (file or embedded reference)
    pub fn load_population(&self) -> Result<Vec<SpendingVector>> {
        match &self.population_path {
            Some(path) => load_population_file(path, &self.features),
            None => reference_population(&self.features),
        }
    }
}

/// Per-feature spending amounts; finite and non-negative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct SpendingVector(Vec<f64>);

impl SpendingVector {
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if let Some(bad) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(Error::InvalidInput(format!(
                "spending amounts must be finite and non-negative, got {}",
                bad
            )));
        }
        Ok(Self(values))
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }
}

impl TryFrom<Vec<f64>> for SpendingVector {
    type Error = Error;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        Self::new(values)
    }
}

impl From<SpendingVector> for Vec<f64> {
    fn from(vector: SpendingVector) -> Self {
        vector.0
    }
}

/// Result of assigning one vector to a cluster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub cluster: usize,
    pub archetype: String,
    /// Euclidean distance to the centroid, in standardized units
    pub distance: f64,
}

/// Fitted profiler: scaler, centroids, and label table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileModel {
    features: Vec<String>,
    labels: Vec<String>,
    scaler: StandardScaler,
    /// Standardized centroids, ascending by total spend
    centroids: Vec<Vec<f64>>,
    inertia: f64,
}

impl ProfileModel {
    /// Fit the model over a population
    pub fn fit(population: &[SpendingVector], config: &ProfilerConfig) -> Result<Self> {
        let dims = config.features.len();
        let k = config.labels.len();

        if dims == 0 {
            return Err(Error::Config("profiler needs at least one feature".into()));
        }
        if k == 0 {
            return Err(Error::Config("profiler needs at least one archetype label".into()));
        }
        for (i, label) in config.labels.iter().enumerate() {
            if label.trim().is_empty() {
                return Err(Error::Config("archetype labels must not be empty".into()));
            }
            if config.labels[..i].contains(label) {
                return Err(Error::Config(format!("duplicate archetype label '{}'", label)));
            }
        }

        if let Some(bad) = population.iter().find(|v| v.len() != dims) {
            return Err(Error::DimensionMismatch {
                expected: dims,
                actual: bad.len(),
            });
        }

        let mut distinct: Vec<&[f64]> = Vec::new();
        for v in population {
            if !distinct.contains(&v.values()) {
                distinct.push(v.values());
            }
        }
        if distinct.len() < k {
            return Err(Error::InvalidInput(format!(
                "population has {} distinct vectors, need at least {} for {} clusters",
                distinct.len(),
                k,
                k
            )));
        }

        let rows: Vec<&[f64]> = population.iter().map(|v| v.values()).collect();
        let scaler = StandardScaler::fit(&rows);
        let points: Vec<Vec<f64>> = rows.iter().map(|r| scaler.transform(r)).collect();

        let fit = kmeans::fit(&points, k, &config.kmeans);

        let mut centroids = fit.centroids;
        centroids.sort_by(|a, b| {
            let ta: f64 = scaler.inverse_transform(a).iter().sum();
            let tb: f64 = scaler.inverse_transform(b).iter().sum();
            ta.total_cmp(&tb)
        });

        info!(
            population = population.len(),
            clusters = k,
            inertia = fit.inertia,
            iterations = fit.iterations,
            "Fitted spending profiler"
        );

        Ok(Self {
            features: config.features.clone(),
            labels: config.labels.clone(),
            scaler,
            centroids,
            inertia: fit.inertia,
        })
    }

    /// Archetype label for a spending vector
    pub fn classify_profile(&self, vector: &SpendingVector) -> Result<&str> {
        let (cluster, _) = self.nearest(vector)?;
        Ok(&self.labels[cluster])
    }

    /// Cluster index, label, and distance for a spending vector
    pub fn assign(&self, vector: &SpendingVector) -> Result<Assignment> {
        let (cluster, squared) = self.nearest(vector)?;
        Ok(Assignment {
            cluster,
            archetype: self.labels[cluster].clone(),
            distance: squared.sqrt(),
        })
    }

    /// Build a vector from named amounts, e.g. `{"food": 200, ...}`
    ///
    /// Every configured feature must be present and no others.
    pub fn vector_from_features(&self, amounts: &BTreeMap<String, f64>) -> Result<SpendingVector> {
        if amounts.len() != self.features.len() {
            return Err(Error::DimensionMismatch {
                expected: self.features.len(),
                actual: amounts.len(),
            });
        }
        let values = self
            .features
            .iter()
            .map(|feature| {
                amounts.get(feature).copied().ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "missing feature '{}' (expected {})",
                        feature,
                        self.features.join(", ")
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        SpendingVector::new(values)
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Centroids in original spending units, in label order
    pub fn centroids(&self) -> Vec<Vec<f64>> {
        self.centroids
            .iter()
            .map(|c| self.scaler.inverse_transform(c))
            .collect()
    }

    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    fn nearest(&self, vector: &SpendingVector) -> Result<(usize, f64)> {
        if vector.len() != self.features.len() {
            return Err(Error::DimensionMismatch {
                expected: self.features.len(),
                actual: vector.len(),
            });
        }
        let point = self.scaler.transform(vector.values());
        let (cluster, squared) = kmeans::nearest(&point, &self.centroids);
        debug!(cluster, distance = squared.sqrt(), "Assigned spending profile");
        Ok((cluster, squared))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(values: &[f64]) -> SpendingVector {
        SpendingVector::new(values.to_vec()).unwrap()
    }

    fn reference_model() -> ProfileModel {
        let config = ProfilerConfig::default();
        let population = config.load_population().unwrap();
        ProfileModel::fit(&population, &config).unwrap()
    }

    #[test]
    fn test_reference_archetypes() {
        let model = reference_model();
        assert_eq!(
            model.classify_profile(&vector(&[180.0, 50.0, 30.0])).unwrap(),
            "Conservative Spender"
        );
        assert_eq!(
            model.classify_profile(&vector(&[400.0, 150.0, 130.0])).unwrap(),
            "Balanced Spender"
        );
        assert_eq!(
            model.classify_profile(&vector(&[820.0, 340.0, 360.0])).unwrap(),
            "High Spender"
        );
    }

    #[test]
    fn test_centroids_ascend_by_total_spend() {
        let model = reference_model();
        let totals: Vec<f64> = model
            .centroids()
            .iter()
            .map(|c| c.iter().sum())
            .collect();
        assert!(totals.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_fit_is_deterministic() {
        let a = reference_model();
        let b = reference_model();
        assert_eq!(a.centroids, b.centroids);

        let v = vector(&[300.0, 100.0, 80.0]);
        assert_eq!(
            a.classify_profile(&v).unwrap(),
            b.classify_profile(&v).unwrap()
        );
    }

    #[test]
    fn test_output_always_in_label_table() {
        let model = reference_model();
        for v in [[0.0, 0.0, 0.0], [1e6, 0.0, 0.0], [0.0, 0.0, 1e6], [50.0, 5000.0, 1.0]] {
            let label = model.classify_profile(&vector(&v)).unwrap();
            assert!(model.labels().iter().any(|l| l == label));
        }
    }

    #[test]
    fn test_dimension_mismatch() {
        let model = reference_model();
        let err = model.classify_profile(&vector(&[1.0, 2.0])).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_invalid_components_rejected() {
        assert!(matches!(
            SpendingVector::new(vec![1.0, -2.0, 3.0]),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            SpendingVector::new(vec![1.0, f64::NAN, 3.0]),
            Err(Error::InvalidInput(_))
        ));
        assert!(serde_json::from_str::<SpendingVector>("[1.0, -2.0]").is_err());
    }

    #[test]
    fn test_too_few_distinct_vectors() {
        let config = ProfilerConfig::default();
        let population = vec![
            vector(&[1.0, 1.0, 1.0]),
            vector(&[1.0, 1.0, 1.0]),
            vector(&[2.0, 2.0, 2.0]),
        ];
        let err = ProfileModel::fit(&population, &config).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        let config = ProfilerConfig {
            labels: vec!["Low".into(), "Low".into()],
            ..Default::default()
        };
        let population = config.load_population().unwrap();
        let err = ProfileModel::fit(&population, &config).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_equidistant_vector_takes_lowest_cluster() {
        let model = ProfileModel {
            features: vec!["food".into()],
            labels: vec!["Low".into(), "High".into()],
            scaler: StandardScaler {
                mean: vec![0.0],
                scale: vec![1.0],
            },
            centroids: vec![vec![1.0], vec![3.0]],
            inertia: 0.0,
        };
        assert_eq!(model.classify_profile(&vector(&[2.0])).unwrap(), "Low");
        assert_eq!(model.assign(&vector(&[2.9])).unwrap().cluster, 1);
    }

    #[test]
    fn test_vector_from_features() {
        let model = reference_model();

        let mut amounts = BTreeMap::new();
        amounts.insert("entertainment".to_string(), 30.0);
        amounts.insert("food".to_string(), 200.0);
        amounts.insert("transport".to_string(), 60.0);
        let v = model.vector_from_features(&amounts).unwrap();
        assert_eq!(v.values(), &[200.0, 60.0, 30.0]);

        amounts.insert("rent".to_string(), 900.0);
        assert!(matches!(
            model.vector_from_features(&amounts),
            Err(Error::DimensionMismatch { .. })
        ));

        amounts.remove("food");
        assert!(matches!(
            model.vector_from_features(&amounts),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_custom_features_and_labels() {
        let config = ProfilerConfig {
            features: vec!["food".into(), "entertainment".into()],
            labels: vec!["Saver".into(), "Spender".into()],
            ..Default::default()
        };
        let population = config.load_population().unwrap();
        let model = ProfileModel::fit(&population, &config).unwrap();
        assert_eq!(model.classify_profile(&vector(&[150.0, 20.0])).unwrap(), "Saver");
        assert_eq!(model.classify_profile(&vector(&[900.0, 400.0])).unwrap(), "Spender");
    }
}

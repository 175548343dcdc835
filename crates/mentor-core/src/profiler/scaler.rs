//! Per-feature standardization (zero mean, unit variance)

use serde::{Deserialize, Serialize};

/// Fitted standardization parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    /// Population standard deviation; 1.0 for constant features
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit on rows of equal, non-zero width. Caller validates dimensions.
    pub fn fit(rows: &[&[f64]]) -> Self {
        let dims = rows.first().map(|r| r.len()).unwrap_or(0);
        let n = rows.len().max(1) as f64;

        let mut mean = vec![0.0; dims];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row.iter()) {
                *m += v;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut var = vec![0.0; dims];
        for row in rows {
            for ((acc, v), m) in var.iter_mut().zip(row.iter()).zip(&mean) {
                *acc += (v - m).powi(2);
            }
        }
        let scale = var
            .into_iter()
            .map(|v| {
                let sd = (v / n).sqrt();
                if sd > f64::EPSILON {
                    sd
                } else {
                    1.0
                }
            })
            .collect();

        Self { mean, scale }
    }

    pub fn transform(&self, values: &[f64]) -> Vec<f64> {
        values
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }

    pub fn inverse_transform(&self, values: &[f64]) -> Vec<f64> {
        values
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| v * s + m)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_transform() {
        let rows: Vec<&[f64]> = vec![&[1.0, 10.0], &[3.0, 10.0]];
        let scaler = StandardScaler::fit(&rows);
        assert_eq!(scaler.mean, vec![2.0, 10.0]);
        // Second feature is constant: scale stays 1.0
        assert_eq!(scaler.scale, vec![1.0, 1.0]);
        assert_eq!(scaler.transform(&[3.0, 10.0]), vec![1.0, 0.0]);
        assert_eq!(scaler.inverse_transform(&[-1.0, 2.0]), vec![1.0, 12.0]);
    }

    #[test]
    fn test_transformed_population_is_standardized() {
        let rows: Vec<&[f64]> = vec![&[2.0], &[4.0], &[4.0], &[4.0], &[5.0], &[5.0], &[7.0], &[9.0]];
        let scaler = StandardScaler::fit(&rows);
        assert!((scaler.mean[0] - 5.0).abs() < 1e-12);
        assert!((scaler.scale[0] - 2.0).abs() < 1e-12);

        let z: Vec<f64> = rows.iter().map(|r| scaler.transform(r)[0]).collect();
        let mean: f64 = z.iter().sum::<f64>() / z.len() as f64;
        let var: f64 = z.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / z.len() as f64;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);
    }
}

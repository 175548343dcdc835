//! K-means clustering with k-means++ seeding
//!
//! 1. Seed k centroids with k-means++ (seeded RNG, reproducible)
//! 2. Assign each point to its nearest centroid (squared Euclidean distance,
//!    lowest index on ties)
//! 3. Move each centroid to the mean of its points; an empty cluster takes the
//!    point farthest from its current centroid
//! 4. Stop when no centroid moves more than the tolerance, or after
//!    `max_iterations`
//!
//! The whole procedure runs `n_init` times and the lowest-inertia run wins.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// K-means settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeansConfig {
    pub max_iterations: usize,
    /// Maximum centroid movement (Euclidean) that still counts as converged
    pub tolerance: f64,
    /// Independent restarts; the lowest inertia wins
    pub n_init: usize,
    pub seed: u64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            max_iterations: 300,
            tolerance: 1e-4,
            n_init: 10,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct KMeansFit {
    pub centroids: Vec<Vec<f64>>,
    /// Sum of squared distances of points to their centroid
    pub inertia: f64,
    pub iterations: usize,
}

pub(crate) fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Nearest centroid index and squared distance; the lowest index wins ties
pub(crate) fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centroids.iter().enumerate() {
        let d = squared_distance(point, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

/// Fit k clusters. Caller guarantees `points` holds at least `k` distinct rows.
pub(crate) fn fit(points: &[Vec<f64>], k: usize, config: &KMeansConfig) -> KMeansFit {
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut best: Option<KMeansFit> = None;
    for _ in 0..config.n_init.max(1) {
        let run = run_once(points, k, config, &mut rng);
        if best.as_ref().map_or(true, |b| run.inertia < b.inertia) {
            best = Some(run);
        }
    }

    best.unwrap_or(KMeansFit {
        centroids: Vec::new(),
        inertia: 0.0,
        iterations: 0,
    })
}

fn run_once(points: &[Vec<f64>], k: usize, config: &KMeansConfig, rng: &mut StdRng) -> KMeansFit {
    let dims = points[0].len();
    let mut centroids = seed_plus_plus(points, k, rng);
    let mut assignments = vec![0usize; points.len()];
    let mut iterations = 0;

    for _ in 0..config.max_iterations.max(1) {
        iterations += 1;

        for (a, p) in assignments.iter_mut().zip(points) {
            *a = nearest(p, &centroids).0;
        }

        let mut sums = vec![vec![0.0; dims]; k];
        let mut counts = vec![0usize; k];
        for (a, p) in assignments.iter().zip(points) {
            counts[*a] += 1;
            for (s, v) in sums[*a].iter_mut().zip(p) {
                *s += v;
            }
        }

        let mut next = centroids.clone();
        for c in 0..k {
            if counts[c] > 0 {
                next[c] = sums[c].iter().map(|s| s / counts[c] as f64).collect();
            } else {
                next[c] = farthest_point(points, &assignments, &centroids).to_vec();
            }
        }

        let shift = centroids
            .iter()
            .zip(&next)
            .map(|(a, b)| squared_distance(a, b).sqrt())
            .fold(0.0, f64::max);
        centroids = next;

        if shift <= config.tolerance {
            break;
        }
    }

    let inertia = points.iter().map(|p| nearest(p, &centroids).1).sum();

    KMeansFit {
        centroids,
        inertia,
        iterations,
    }
}

/// k-means++: each new centroid is drawn with probability proportional to its
/// squared distance from the nearest existing centroid
fn seed_plus_plus(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = vec![points[rng.gen_range(0..points.len())].clone()];

    while centroids.len() < k {
        let weights: Vec<f64> = points.iter().map(|p| nearest(p, &centroids).1).collect();
        let total: f64 = weights.iter().sum();

        let next = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = weights.len() - 1;
            for (i, w) in weights.iter().enumerate() {
                if target < *w {
                    chosen = i;
                    break;
                }
                target -= w;
            }
            chosen
        } else {
            rng.gen_range(0..points.len())
        };

        centroids.push(points[next].clone());
    }

    centroids
}

fn farthest_point<'a>(
    points: &'a [Vec<f64>],
    assignments: &[usize],
    centroids: &[Vec<f64>],
) -> &'a [f64] {
    let mut best = (0, f64::NEG_INFINITY);
    for (i, (p, a)) in points.iter().zip(assignments).enumerate() {
        let d = squared_distance(p, &centroids[*a]);
        if d > best.1 {
            best = (i, d);
        }
    }
    &points[best.0]
}

//! Seeded k-means over planar `[latitude, longitude]` points.
//!
//! Centers are seeded with k-means++ from a [`ChaCha8Rng`] built from a
//! fixed seed, then refined with Lloyd iterations (assign every point to its
//! nearest center, move each center to the mean of its members) until the
//! assignment stops changing, the total squared center shift drops below
//! the tolerance, or the iteration cap is hit.
//!
//! Ties are broken toward the lowest cluster index. A cluster that ends up
//! with no members takes over the point farthest from its own center among
//! clusters that can spare one, so every id in `[0, k)` is always used.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::PipelineError;

/// Fixed seed and convergence settings for k-means.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KmeansConfig {
    /// Seed for k-means++ initialization.
    pub seed: u64,
    /// Maximum number of Lloyd iterations.
    pub max_iterations: usize,
    /// Convergence threshold on the total squared center shift, relative to
    /// the mean per-axis variance of the data.
    pub tolerance: f64,
}

impl Default for KmeansConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            max_iterations: 300,
            tolerance: 1e-4,
        }
    }
}

/// Output of [`fit`].
#[derive(Debug, Clone, PartialEq)]
pub struct KmeansFit {
    /// Cluster id per input point.
    pub labels: Vec<usize>,
    /// Mean of each cluster's members, indexed by cluster id.
    pub centroids: Vec<[f64; 2]>,
    /// Number of Lloyd iterations run.
    pub iterations: usize,
    /// Sum of squared distances from each point to its centroid.
    pub inertia: f64,
}

/// Partitions `points` into `k` clusters.
///
/// # Errors
///
/// * [`PipelineError::InvalidClusterCount`] if `k` is zero.
/// * [`PipelineError::InsufficientData`] if there are fewer points than
///   clusters.
pub fn fit(
    points: &[[f64; 2]],
    k: usize,
    config: &KmeansConfig,
) -> Result<KmeansFit, PipelineError> {
    if k == 0 {
        return Err(PipelineError::InvalidClusterCount { requested: k });
    }
    if points.len() < k {
        return Err(PipelineError::InsufficientData {
            requested: k,
            available: points.len(),
        });
    }

    let tolerance = config.tolerance * mean_variance(points);
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut centroids = init_plus_plus(points, k, &mut rng);

    let mut labels: Vec<usize> = Vec::new();
    let mut iterations = 0;

    while iterations < config.max_iterations {
        iterations += 1;

        let mut next = assign(points, &centroids);
        fill_empty_clusters(points, &centroids, &mut next, k);

        let updated = means(points, &next, k);
        let shift: f64 = centroids
            .iter()
            .zip(&updated)
            .map(|(old, new)| squared_distance(*old, *new))
            .sum();

        let stable = next == labels;
        labels = next;
        centroids = updated;

        if stable {
            log::debug!("k-means assignment stable after {iterations} iterations");
            break;
        }
        if shift <= tolerance {
            log::debug!(
                "k-means center shift {shift:e} within tolerance after {iterations} iterations"
            );
            break;
        }
    }

    if iterations == 0 {
        labels = assign(points, &centroids);
        fill_empty_clusters(points, &centroids, &mut labels, k);
        centroids = means(points, &labels, k);
    }

    let inertia = points
        .iter()
        .zip(&labels)
        .map(|(point, &label)| squared_distance(*point, centroids[label]))
        .sum();

    log::info!(
        "k-means: {k} clusters over {} points, {iterations} iterations, inertia {inertia:.6}",
        points.len()
    );

    Ok(KmeansFit {
        labels,
        centroids,
        iterations,
        inertia,
    })
}

/// Squared planar distance between two points.
#[must_use]
pub fn squared_distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    let d0 = a[0] - b[0];
    let d1 = a[1] - b[1];
    d0.mul_add(d0, d1 * d1)
}

#[allow(clippy::cast_precision_loss)]
fn mean_variance(points: &[[f64; 2]]) -> f64 {
    let n = points.len() as f64;
    let mut total = 0.0;
    for axis in 0..2 {
        let mean = points.iter().map(|p| p[axis]).sum::<f64>() / n;
        let var = points.iter().map(|p| (p[axis] - mean).powi(2)).sum::<f64>() / n;
        total += var;
    }
    total / 2.0
}

/// k-means++ seeding: the first center is drawn uniformly, each following
/// center with probability proportional to its squared distance from the
/// nearest center chosen so far.
fn init_plus_plus(points: &[[f64; 2]], k: usize, rng: &mut ChaCha8Rng) -> Vec<[f64; 2]> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.random_range(0..points.len())]);

    let mut nearest: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(*p, centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = nearest.iter().sum();

        let chosen = if total > 0.0 {
            let target = rng.random::<f64>() * total;
            let mut cumulative = 0.0;
            let mut pick = None;
            for (i, d) in nearest.iter().enumerate() {
                if *d <= 0.0 {
                    continue;
                }
                cumulative += d;
                pick = Some(i);
                if cumulative > target {
                    break;
                }
            }
            pick.unwrap_or(0)
        } else {
            // Every point sits on an existing center.
            rng.random_range(0..points.len())
        };

        let center = points[chosen];
        centroids.push(center);
        for (d, p) in nearest.iter_mut().zip(points) {
            *d = d.min(squared_distance(*p, center));
        }
    }

    centroids
}

/// Assigns every point to its nearest centroid (lowest index on ties).
fn assign(points: &[[f64; 2]], centroids: &[[f64; 2]]) -> Vec<usize> {
    points
        .iter()
        .map(|p| {
            let mut best = 0;
            let mut best_distance = f64::INFINITY;
            for (c, centroid) in centroids.iter().enumerate() {
                let d = squared_distance(*p, *centroid);
                if d < best_distance {
                    best = c;
                    best_distance = d;
                }
            }
            best
        })
        .collect()
}

/// Moves points into clusters left without members.
///
/// For each empty cluster, the point farthest from its current centroid is
/// taken from a cluster that has at least two members. Since there are at
/// least `k` points, such a donor always exists while any cluster is empty.
fn fill_empty_clusters(
    points: &[[f64; 2]],
    centroids: &[[f64; 2]],
    labels: &mut [usize],
    k: usize,
) {
    let mut counts = vec![0usize; k];
    for &label in labels.iter() {
        counts[label] += 1;
    }

    for empty in 0..k {
        if counts[empty] > 0 {
            continue;
        }

        let mut donor: Option<(usize, f64)> = None;
        for (i, point) in points.iter().enumerate() {
            let label = labels[i];
            if counts[label] < 2 {
                continue;
            }
            let d = squared_distance(*point, centroids[label]);
            if donor.is_none_or(|(_, best)| d > best) {
                donor = Some((i, d));
            }
        }

        let Some((i, _)) = donor else {
            break;
        };

        log::debug!(
            "Cluster {empty} is empty, reassigning point {i} from cluster {}",
            labels[i]
        );
        counts[labels[i]] -= 1;
        labels[i] = empty;
        counts[empty] = 1;
    }
}

/// Arithmetic mean of each cluster's members.
#[allow(clippy::cast_precision_loss)]
fn means(points: &[[f64; 2]], labels: &[usize], k: usize) -> Vec<[f64; 2]> {
    let mut sums = vec![[0.0f64; 2]; k];
    let mut counts = vec![0usize; k];

    for (point, &label) in points.iter().zip(labels) {
        sums[label][0] += point[0];
        sums[label][1] += point[1];
        counts[label] += 1;
    }

    sums.into_iter()
        .zip(counts)
        .map(|(sum, count)| {
            let n = count.max(1) as f64;
            [sum[0] / n, sum[1] / n]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(center: [f64; 2], count: usize) -> Vec<[f64; 2]> {
        (0..count)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let t = i as f64;
                [
                    (t * 0.37).sin().mul_add(0.01, center[0]),
                    (t * 0.71).cos().mul_add(0.01, center[1]),
                ]
            })
            .collect()
    }

    #[test]
    fn rejects_zero_clusters() {
        let points = blob([0.0, 0.0], 5);
        let err = fit(&points, 0, &KmeansConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidClusterCount { requested: 0 }
        ));
    }

    #[test]
    fn rejects_more_clusters_than_points() {
        let points = blob([0.0, 0.0], 2);
        let err = fit(&points, 3, &KmeansConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientData {
                requested: 3,
                available: 2
            }
        ));
    }

    #[test]
    fn separates_distant_blobs() {
        let mut points = blob([12.97, 77.59], 20);
        points.extend(blob([28.61, 77.20], 20));
        points.extend(blob([19.07, 72.87], 20));

        let fit = fit(&points, 3, &KmeansConfig::default()).unwrap();

        for group in fit.labels.chunks(20) {
            assert!(group.iter().all(|&l| l == group[0]));
        }
        assert_ne!(fit.labels[0], fit.labels[20]);
        assert_ne!(fit.labels[0], fit.labels[40]);
        assert_ne!(fit.labels[20], fit.labels[40]);
    }

    #[test]
    fn centroids_are_member_means() {
        let mut points = blob([1.0, 1.0], 7);
        points.extend(blob([9.0, 9.0], 5));

        let fit = fit(&points, 2, &KmeansConfig::default()).unwrap();

        for (c, centroid) in fit.centroids.iter().enumerate() {
            let members: Vec<_> = points
                .iter()
                .zip(&fit.labels)
                .filter(|(_, l)| **l == c)
                .map(|(p, _)| *p)
                .collect();
            #[allow(clippy::cast_precision_loss)]
            let n = members.len() as f64;
            let lat = members.iter().map(|p| p[0]).sum::<f64>() / n;
            let lng = members.iter().map(|p| p[1]).sum::<f64>() / n;
            assert!((centroid[0] - lat).abs() < 1e-9);
            assert!((centroid[1] - lng).abs() < 1e-9);
        }
    }

    #[test]
    fn identical_points_still_fill_every_cluster() {
        let points = vec![[5.0, 5.0]; 6];

        let fit = fit(&points, 4, &KmeansConfig::default()).unwrap();

        for c in 0..4 {
            assert!(fit.labels.contains(&c), "cluster {c} has no members");
        }
        assert!(fit.inertia.abs() < f64::EPSILON);
    }

    #[test]
    fn k_equal_to_n_gives_singleton_clusters() {
        let points = vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [5.0, 5.0]];

        let fit = fit(&points, 4, &KmeansConfig::default()).unwrap();

        let mut labels = fit.labels.clone();
        labels.sort_unstable();
        assert_eq!(labels, vec![0, 1, 2, 3]);
        assert!(fit.inertia.abs() < 1e-12);
    }

    #[test]
    fn same_seed_gives_same_result() {
        let mut points = blob([0.0, 0.0], 30);
        points.extend(blob([0.05, 0.05], 30));
        points.extend(blob([0.1, 0.0], 30));

        let config = KmeansConfig::default();
        let a = fit(&points, 5, &config).unwrap();
        let b = fit(&points, 5, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn iteration_cap_is_respected() {
        let points = blob([0.0, 0.0], 50);
        let config = KmeansConfig {
            max_iterations: 1,
            ..KmeansConfig::default()
        };

        let fit = fit(&points, 5, &config).unwrap();
        assert_eq!(fit.iterations, 1);
        assert_eq!(fit.centroids.len(), 5);
    }
}

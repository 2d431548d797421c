//! Cluster engine: attaches k-means cluster ids and centers to incidents.

use patrol_map_incident_models::{ClusterCenter, ClusteredIncident, Coordinate, Incident};

use crate::PipelineError;
use crate::kmeans::{self, KmeansConfig};

/// Incidents with dense cluster ids plus one center per cluster.
#[derive(Debug, Clone)]
pub struct Clustering {
    /// Every input incident, in input order, with its cluster id.
    pub points: Vec<ClusteredIncident>,
    /// Exactly `k` centers, indexed by cluster id.
    pub centers: Vec<ClusterCenter>,
    /// Number of k-means iterations run.
    pub iterations: usize,
    /// Sum of squared distances from each point to its center.
    pub inertia: f64,
}

/// Partitions `data` into `k` spatial clusters.
///
/// Never lowers `k` on its own: callers that want fewer clusters for small
/// datasets must clamp before calling.
///
/// # Errors
///
/// * [`PipelineError::InvalidClusterCount`] if `k` is zero.
/// * [`PipelineError::InsufficientData`] if `data` has fewer than `k`
///   incidents. No partial result is produced.
pub fn cluster(
    data: Vec<Incident>,
    k: usize,
    config: &KmeansConfig,
) -> Result<Clustering, PipelineError> {
    let coordinates: Vec<[f64; 2]> = data.iter().map(|i| i.coordinate().to_point()).collect();
    let fit = kmeans::fit(&coordinates, k, config)?;

    let mut members = vec![0usize; k];
    for &label in &fit.labels {
        members[label] += 1;
    }

    let centers = fit
        .centroids
        .iter()
        .zip(members)
        .enumerate()
        .map(|(cluster_id, (centroid, members))| {
            let Coordinate {
                latitude,
                longitude,
            } = Coordinate::from(*centroid);
            ClusterCenter {
                cluster_id,
                latitude,
                longitude,
                members,
            }
        })
        .collect();

    let points = data
        .into_iter()
        .zip(fit.labels)
        .map(|(incident, cluster_id)| ClusteredIncident {
            incident,
            cluster_id,
        })
        .collect();

    Ok(Clustering {
        points,
        centers,
        iterations: fit.iterations,
        inertia: fit.inertia,
    })
}

//! Render-set bounding.
//!
//! Caps the number of incident markers sent to the map with a uniform
//! random sample. Centers always pass through in full.

use patrol_map_incident_models::{ClusterCenter, ClusteredIncident, RenderSet};
use rand::Rng;

/// Bounds `points` to at most `limit` entries using the thread RNG.
///
/// When `points.len() <= limit` every point is returned in input order.
#[must_use]
pub fn bound(
    points: Vec<ClusteredIncident>,
    centers: Vec<ClusterCenter>,
    limit: usize,
) -> RenderSet {
    bound_with(points, centers, limit, &mut rand::rng())
}

/// Same as [`bound`] with a caller-supplied RNG.
#[must_use]
pub fn bound_with<R: Rng + ?Sized>(
    points: Vec<ClusteredIncident>,
    centers: Vec<ClusterCenter>,
    limit: usize,
    rng: &mut R,
) -> RenderSet {
    if points.len() <= limit {
        return RenderSet { points, centers };
    }

    let total = points.len();
    let mut keep = vec![false; total];
    for index in rand::seq::index::sample(rng, total, limit) {
        keep[index] = true;
    }

    let points: Vec<_> = points
        .into_iter()
        .zip(keep)
        .filter_map(|(point, keep)| keep.then_some(point))
        .collect();

    log::info!("Sampled {} of {total} points for rendering", points.len());

    RenderSet { points, centers }
}

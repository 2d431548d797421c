//! Deduplication of raw incident rows.
//!
//! Rows without a usable coordinate are dropped, then later occurrences of
//! an already-seen `(latitude, longitude, category)` triple are dropped.
//! Survivors keep their input order.

use std::collections::BTreeSet;

use patrol_map_incident_models::{Incident, IncidentRecord};

/// Identity of a record for deduplication purposes.
///
/// Coordinates are compared bit-for-bit after folding `-0.0` into `0.0`.
type IdentityKey = (u64, u64, String);

fn identity_key(latitude: f64, longitude: f64, category: &str) -> IdentityKey {
    (
        (latitude + 0.0).to_bits(),
        (longitude + 0.0).to_bits(),
        category.to_string(),
    )
}

/// Removes rows with missing coordinates and duplicate
/// `(latitude, longitude, category)` triples.
///
/// The first occurrence of each triple is kept, in input order. An empty
/// input yields an empty output.
#[must_use]
pub fn clean(records: impl IntoIterator<Item = IncidentRecord>) -> Vec<Incident> {
    let mut seen: BTreeSet<IdentityKey> = BTreeSet::new();
    let mut cleaned = Vec::new();
    let mut total = 0usize;
    let mut missing = 0usize;

    for record in records {
        total += 1;

        let Some(coordinate) = record.coordinate() else {
            missing += 1;
            continue;
        };

        let key = identity_key(coordinate.latitude, coordinate.longitude, &record.category);
        if !seen.insert(key) {
            continue;
        }

        cleaned.push(Incident {
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            category: record.category,
            extra: record.extra,
        });
    }

    log::info!(
        "Cleaned {total} rows: {missing} missing coordinates, {} duplicates, {} kept",
        total - missing - cleaned.len(),
        cleaned.len()
    );

    cleaned
}

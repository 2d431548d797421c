//! Dataset registry. Loads all dataset definitions from embedded TOML
//! configs.
//!
//! Each `.toml` file in `packages/source/datasets/` is baked into the binary
//! at compile time via [`include_str!`].

use crate::dataset::{DatasetDefinition, parse_dataset_toml};

/// TOML configs embedded at compile time.
const DATASET_TOMLS: &[(&str, &str)] = &[(
    "fir_details",
    include_str!("../datasets/fir_details.toml"),
)];

/// Identifier of the dataset used when none is selected.
pub const DEFAULT_DATASET: &str = "fir_details";

/// Returns all configured dataset definitions, parsed from embedded TOML.
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_datasets() -> Vec<DatasetDefinition> {
    DATASET_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_dataset_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Looks up a dataset definition by id.
#[must_use]
pub fn find_dataset(id: &str) -> Option<DatasetDefinition> {
    all_datasets().into_iter().find(|d| d.id == id)
}

/// Returns the default dataset definition.
///
/// # Panics
///
/// Panics if [`DEFAULT_DATASET`] is not among the embedded configs.
#[must_use]
pub fn default_dataset() -> DatasetDefinition {
    find_dataset(DEFAULT_DATASET)
        .unwrap_or_else(|| panic!("Default dataset '{DEFAULT_DATASET}' is not registered"))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn loads_all_datasets() {
        let datasets = all_datasets();
        assert_eq!(datasets.len(), DATASET_TOMLS.len());
    }

    #[test]
    fn dataset_ids_are_unique_and_match_file_names() {
        let mut ids = BTreeSet::new();
        for ((name, _), def) in DATASET_TOMLS.iter().zip(all_datasets()) {
            assert_eq!(*name, def.id);
            assert!(ids.insert(def.id), "duplicate dataset id {name}");
        }
    }

    #[test]
    fn default_dataset_points_at_fir_details() {
        let def = default_dataset();
        assert_eq!(def.bucket, "new-trail01");
        assert_eq!(def.key, "FIR_Details_Data.csv");
        assert_eq!(def.columns.latitude, "Latitude");
        assert_eq!(def.columns.longitude, "Longitude");
        assert_eq!(def.columns.category, "CrimeHead_Name");
    }

    #[test]
    fn unknown_dataset_is_none() {
        assert!(find_dataset("nope").is_none());
    }
}

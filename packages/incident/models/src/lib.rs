#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident record, cluster center, and render set types.
//!
//! Records move through the patrol map pipeline in three shapes:
//!
//! 1. [`IncidentRecord`] as parsed from the record store. Coordinates may be
//!    missing or unparseable.
//! 2. [`Incident`] after deduplication. Coordinates are always present.
//! 3. [`ClusteredIncident`] after clustering, carrying a dense cluster id.
//!
//! The [`RenderSet`] bundles a size-capped slice of clustered incidents with
//! the full list of [`ClusterCenter`]s and is the only shape handed to map
//! rendering.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A latitude/longitude pair treated as planar coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    /// Latitude (WGS84 degrees).
    pub latitude: f64,
    /// Longitude (WGS84 degrees).
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a new coordinate.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns the coordinate as a `[latitude, longitude]` point.
    #[must_use]
    pub const fn to_point(self) -> [f64; 2] {
        [self.latitude, self.longitude]
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from([latitude, longitude]: [f64; 2]) -> Self {
        Self::new(latitude, longitude)
    }
}

/// A raw incident row from the record store.
///
/// Coordinates are `None` when the source cell was empty or could not be
/// parsed as a finite number. Columns the pipeline does not interpret are
/// carried through untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRecord {
    /// Latitude, if present and parseable.
    pub latitude: Option<f64>,
    /// Longitude, if present and parseable.
    pub longitude: Option<f64>,
    /// Crime category label as it appears in the source.
    pub category: String,
    /// Passthrough columns keyed by header name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl IncidentRecord {
    /// Creates a record with no passthrough fields.
    #[must_use]
    pub fn new(latitude: Option<f64>, longitude: Option<f64>, category: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            category: category.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Adds a passthrough field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Returns the record's coordinate when both components are present
    /// and finite.
    #[must_use]
    pub fn coordinate(&self) -> Option<Coordinate> {
        let latitude = self.latitude.filter(|v| v.is_finite())?;
        let longitude = self.longitude.filter(|v| v.is_finite())?;
        Some(Coordinate::new(latitude, longitude))
    }
}

/// An incident that survived deduplication. Coordinates are guaranteed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Latitude (WGS84 degrees).
    pub latitude: f64,
    /// Longitude (WGS84 degrees).
    pub longitude: f64,
    /// Crime category label.
    pub category: String,
    /// Passthrough columns keyed by header name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl Incident {
    /// Returns the incident location.
    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

impl From<Incident> for IncidentRecord {
    fn from(incident: Incident) -> Self {
        Self {
            latitude: Some(incident.latitude),
            longitude: Some(incident.longitude),
            category: incident.category,
            extra: incident.extra,
        }
    }
}

/// An incident with its assigned cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusteredIncident {
    /// The underlying incident.
    #[serde(flatten)]
    pub incident: Incident,
    /// Cluster id in `[0, k)`.
    pub cluster_id: usize,
}

/// Representative center of one cluster (mean of its members).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCenter {
    /// Cluster id this center belongs to.
    pub cluster_id: usize,
    /// Mean latitude of the cluster's members.
    pub latitude: f64,
    /// Mean longitude of the cluster's members.
    pub longitude: f64,
    /// Number of incidents assigned to the cluster.
    pub members: usize,
}

impl ClusterCenter {
    /// Returns the center location.
    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// The bounded point set plus every cluster center, ready for rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSet {
    /// At most `limit` clustered incidents.
    pub points: Vec<ClusteredIncident>,
    /// One center per cluster id, indexed by id.
    pub centers: Vec<ClusterCenter>,
}

impl RenderSet {
    /// Returns `true` when there is nothing to draw.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.centers.is_empty()
    }
}

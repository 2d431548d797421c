#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! GeoJSON output of a [`RenderSet`] for map display.
//!
//! Every incident becomes a `Point` feature with `kind = "incident"`, and
//! every cluster center a `Point` feature with `kind = "patrol_center"`.
//! The collection carries a `center` foreign member with the mean of the
//! rendered incident locations, which map viewers use as the initial
//! viewport. Marker styling is left to the viewer.
//!
//! GeoJSON positions are `[longitude, latitude]`.

use std::path::Path;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};
use patrol_map_incident_models::{ClusterCenter, ClusteredIncident, Coordinate, RenderSet};

/// Feature `kind` for incidents.
pub const INCIDENT_KIND: &str = "incident";

/// Feature `kind` for cluster centers.
pub const CENTER_KIND: &str = "patrol_center";

/// Popup title attached to center features.
pub const CENTER_TITLE: &str = "Patrol Center";

/// Errors that can occur while writing map output.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error writing the output file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Mean location of `points`, or `None` when there are none.
#[must_use]
pub fn map_center(points: &[ClusteredIncident]) -> Option<Coordinate> {
    if points.is_empty() {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let n = points.len() as f64;
    let (lat, lng) = points.iter().fold((0.0, 0.0), |(lat, lng), p| {
        (lat + p.incident.latitude, lng + p.incident.longitude)
    });

    Some(Coordinate::new(lat / n, lng / n))
}

fn point(coordinate: Coordinate) -> Geometry {
    Geometry::new(Value::Point(vec![coordinate.longitude, coordinate.latitude]))
}

fn incident_feature(point_incident: &ClusteredIncident) -> Feature {
    let incident = &point_incident.incident;

    let mut properties = JsonObject::new();
    for (key, value) in &incident.extra {
        properties.insert(key.clone(), JsonValue::from(value.as_str()));
    }
    properties.insert("kind".to_string(), JsonValue::from(INCIDENT_KIND));
    properties.insert(
        "category".to_string(),
        JsonValue::from(incident.category.as_str()),
    );
    properties.insert(
        "cluster_id".to_string(),
        JsonValue::from(point_incident.cluster_id),
    );

    Feature {
        bbox: None,
        geometry: Some(point(incident.coordinate())),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn center_feature(center: &ClusterCenter) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("kind".to_string(), JsonValue::from(CENTER_KIND));
    properties.insert("title".to_string(), JsonValue::from(CENTER_TITLE));
    properties.insert("cluster_id".to_string(), JsonValue::from(center.cluster_id));
    properties.insert("members".to_string(), JsonValue::from(center.members));

    Feature {
        bbox: None,
        geometry: Some(point(center.coordinate())),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Builds a GeoJSON `FeatureCollection` with incident features first,
/// followed by one feature per cluster center.
#[must_use]
pub fn to_feature_collection(render: &RenderSet) -> FeatureCollection {
    let features: Vec<Feature> = render
        .points
        .iter()
        .map(incident_feature)
        .chain(render.centers.iter().map(center_feature))
        .collect();

    let foreign_members = map_center(&render.points).map(|c| {
        let mut members = JsonObject::new();
        members.insert(
            "center".to_string(),
            JsonValue::from(vec![c.longitude, c.latitude]),
        );
        members
    });

    FeatureCollection {
        bbox: None,
        features,
        foreign_members,
    }
}

/// Serializes the render set as GeoJSON.
///
/// # Errors
///
/// Returns [`RenderError::Json`] if serialization fails.
pub fn to_geojson_string(render: &RenderSet) -> Result<String, RenderError> {
    Ok(serde_json::to_string(&to_feature_collection(render))?)
}

/// Writes the render set as a GeoJSON file.
///
/// # Errors
///
/// Returns [`RenderError`] if serialization or the file write fails.
pub fn write_geojson(render: &RenderSet, path: &Path) -> Result<(), RenderError> {
    if render.is_empty() {
        log::warn!("Nothing to draw, writing an empty map to {}", path.display());
    }

    let json = to_geojson_string(render)?;
    std::fs::write(path, &json)?;

    #[allow(clippy::cast_precision_loss)] // display-only KB value
    let kb = json.len() as f64 / 1024.0;
    log::info!(
        "Wrote {} incidents and {} centers to {} ({kb:.1} KB)",
        render.points.len(),
        render.centers.len(),
        path.display()
    );

    Ok(())
}

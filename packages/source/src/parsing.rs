//! CSV parsing into raw incident records.
//!
//! The header row is required. Coordinate cells that are empty or do not
//! parse as finite numbers become `None` and are dropped later by the
//! pipeline's deduplicator. Columns other than the mapped ones are kept as
//! passthrough fields.

use std::collections::BTreeMap;

use patrol_map_incident_models::IncidentRecord;

use crate::SourceError;
use crate::dataset::DatasetDefinition;

/// Parses a coordinate cell. Returns `None` if empty, unparseable, or not
/// finite.
#[must_use]
pub fn parse_coordinate(cell: &str) -> Option<f64> {
    let value = cell.trim().parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// Parses a delimited text blob into incident records using the dataset's
/// delimiter and column mapping.
///
/// A blob with no content at all yields an empty dataset.
///
/// # Errors
///
/// * [`SourceError::MissingColumn`] if a mapped column is not in the header.
/// * [`SourceError::Csv`] if the CSV is malformed.
/// * [`SourceError::Config`] if the dataset delimiter is invalid.
pub fn parse_csv(
    bytes: &[u8],
    dataset: &DatasetDefinition,
) -> Result<Vec<IncidentRecord>, SourceError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        log::warn!("[{}] CSV body is empty", dataset.id);
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(dataset.delimiter_byte()?)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_owned())
        .collect();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| SourceError::MissingColumn {
                column: name.to_string(),
            })
    };

    let lat_idx = column(&dataset.columns.latitude)?;
    let lng_idx = column(&dataset.columns.longitude)?;
    let category_idx = column(&dataset.columns.category)?;

    let mut records = Vec::new();
    let mut unparseable = 0u64;

    for result in reader.records() {
        let row = result?;
        let cell = |i: usize| row.get(i).unwrap_or("").trim();

        let latitude = parse_coordinate(cell(lat_idx));
        let longitude = parse_coordinate(cell(lng_idx));
        if latitude.is_none() || longitude.is_none() {
            unparseable += 1;
        }

        let extra: BTreeMap<String, String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| ![lat_idx, lng_idx, category_idx].contains(i))
            .map(|(i, h)| (h.clone(), cell(i).to_owned()))
            .collect();

        records.push(IncidentRecord {
            latitude,
            longitude,
            category: cell(category_idx).to_owned(),
            extra,
        });
    }

    log::info!(
        "[{}] Parsed {} rows ({unparseable} without usable coordinates)",
        dataset.id,
        records.len()
    );

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::default_dataset;

    #[test]
    fn parses_coordinate_cells() {
        assert_eq!(parse_coordinate(" 12.97 "), Some(12.97));
        assert_eq!(parse_coordinate("-77.5"), Some(-77.5));
        assert_eq!(parse_coordinate("0"), Some(0.0));
        assert_eq!(parse_coordinate(""), None);
        assert_eq!(parse_coordinate("N/A"), None);
        assert_eq!(parse_coordinate("NaN"), None);
        assert_eq!(parse_coordinate("inf"), None);
    }

    #[test]
    fn parses_rows_with_passthrough_fields() {
        let csv = "FIRNo,Latitude,Longitude,CrimeHead_Name,District_Name\n\
                   1,12.97,77.59,Theft,Bengaluru City\n\
                   2,,77.60,Robbery,Bengaluru City\n";

        let records = parse_csv(csv.as_bytes(), &default_dataset()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].latitude, Some(12.97));
        assert_eq!(records[0].longitude, Some(77.59));
        assert_eq!(records[0].category, "Theft");
        assert_eq!(records[0].extra.get("FIRNo").map(String::as_str), Some("1"));
        assert_eq!(
            records[0].extra.get("District_Name").map(String::as_str),
            Some("Bengaluru City")
        );
        assert!(!records[0].extra.contains_key("Latitude"));

        assert_eq!(records[1].latitude, None);
        assert_eq!(records[1].longitude, Some(77.60));
    }

    #[test]
    fn short_rows_read_missing_cells_as_empty() {
        let csv = "Latitude,Longitude,CrimeHead_Name\n12.97\n";

        let records = parse_csv(csv.as_bytes(), &default_dataset()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].latitude, Some(12.97));
        assert_eq!(records[0].longitude, None);
        assert_eq!(records[0].category, "");
    }

    #[test]
    fn missing_category_column_is_an_error() {
        let csv = "Latitude,Longitude\n1,2\n";

        let err = parse_csv(csv.as_bytes(), &default_dataset()).unwrap_err();
        assert!(
            matches!(err, SourceError::MissingColumn { column } if column == "CrimeHead_Name")
        );
    }

    #[test]
    fn empty_body_is_empty_dataset() {
        assert!(parse_csv(b"", &default_dataset()).unwrap().is_empty());
        assert!(parse_csv(b"\n  \n", &default_dataset()).unwrap().is_empty());
    }

    #[test]
    fn header_only_is_empty_dataset() {
        let csv = "Latitude,Longitude,CrimeHead_Name\n";
        assert!(parse_csv(csv.as_bytes(), &default_dataset()).unwrap().is_empty());
    }

    #[test]
    fn strips_byte_order_mark_from_first_header() {
        let csv = "\u{feff}Latitude,Longitude,CrimeHead_Name\n1,2,Theft\n";

        let records = parse_csv(csv.as_bytes(), &default_dataset()).unwrap();
        assert_eq!(records[0].latitude, Some(1.0));
    }
}

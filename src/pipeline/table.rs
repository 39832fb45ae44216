//! Flat output table layout shared by the writer, the row-update diff and the checker.

use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};

use crate::constants::DATE_FORMAT;
use crate::domain::{CatalogKind, Measurement, MergedEntry, Parameter};

pub const ROW_UPDATE_COLUMN: &str = "row_update";

/// Column stems that carry `<stem>`, `<stem>_max`, `<stem>_min`, `<stem>_url`
pub fn measurement_stems() -> Vec<&'static str> {
    Parameter::ALL
        .iter()
        .map(|p| p.column())
        .chain(std::iter::once("bestmass"))
        .collect()
}

pub fn header() -> Vec<String> {
    let mut columns: Vec<String> = ["name", "main_id", "host", "binary", "letter", "catalog"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    columns.extend(CatalogKind::ALL.iter().map(|kind| kind.name_column().to_string()));
    for stem in measurement_stems() {
        columns.push(stem.to_string());
        columns.push(format!("{}_max", stem));
        columns.push(format!("{}_min", stem));
        columns.push(format!("{}_url", stem));
    }
    columns.extend(
        [
            "bestmass_provenance",
            "status",
            "catalog_status",
            "discovery_year",
            "discovery_method",
            "alias",
            "main_id_ra",
            "main_id_dec",
            "main_id_provenance",
            "angular_separation",
            "angular_separation_flag",
            "coordinate_mismatch",
            "coordinate_mismatch_flag",
            "binary_mismatch_flag",
            "merging_mismatch_flag",
            "duplicate_catalog_flag",
            "duplicate_names",
            ROW_UPDATE_COLUMN,
        ]
        .iter()
        .map(|c| c.to_string()),
    );
    columns
}

fn number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn push_measurement(cells: &mut Vec<String>, measurement: &Measurement) {
    cells.push(number(measurement.value));
    cells.push(number(measurement.error_max));
    cells.push(number(measurement.error_min));
    cells.push(measurement.url.clone().unwrap_or_default());
}

/// Cells in `header()` order
pub fn entry_cells(entry: &MergedEntry) -> Vec<String> {
    let mut cells = vec![
        entry.name.clone(),
        entry.main_id.clone(),
        entry.host.clone(),
        entry.binary.clone(),
        entry.letter.clone(),
        entry.catalogs.iter().map(|c| c.tag()).collect::<Vec<_>>().join(","),
    ];
    cells.extend(CatalogKind::ALL.iter().map(|kind| entry.catalog_name(*kind).to_string()));
    for parameter in Parameter::ALL {
        push_measurement(&mut cells, entry.measurements.get(parameter));
    }
    push_measurement(&mut cells, &entry.bestmass);
    cells.extend([
        entry.bestmass_provenance.clone(),
        entry.status.clone(),
        entry.catalog_status.clone(),
        entry.discovery_year.map(|y| y.to_string()).unwrap_or_default(),
        entry.discovery_method.clone(),
        entry.alias.join(","),
        number(entry.main_id_ra),
        number(entry.main_id_dec),
        entry.main_id_provenance.clone(),
        entry.angular_separation.clone(),
        entry.angular_separation_flag.to_string(),
        entry.coordinate_mismatch.clone(),
        entry.coordinate_mismatch_flag.to_string(),
        entry.binary_mismatch_flag.to_string(),
        entry.merging_mismatch_flag.to_string(),
        entry.duplicate_catalog_flag.to_string(),
        entry.duplicate_names.clone(),
        entry
            .row_update
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default(),
    ]);
    cells
}

/// Hex SHA-256 over every cell except `row_update`
pub fn fingerprint(header: &[String], cells: &[String]) -> String {
    let mut hasher = Sha256::new();
    for (column, cell) in header.iter().zip(cells) {
        if column == ROW_UPDATE_COLUMN {
            continue;
        }
        hasher.update(column.as_bytes());
        hasher.update([0x1f]);
        hasher.update(cell.as_bytes());
        hasher.update([0x1e]);
    }
    hex::encode(hasher.finalize())
}

/// Carries forward the previous date for unchanged rows; others get `today`
pub fn assign_row_updates(entries: &mut [MergedEntry], previous: &[(String, NaiveDate)], today: NaiveDate) -> usize {
    let previous: HashMap<&str, NaiveDate> = previous.iter().map(|(hash, date)| (hash.as_str(), *date)).collect();
    let header = header();
    let mut carried = 0;
    for entry in entries.iter_mut() {
        let hash = fingerprint(&header, &entry_cells(entry));
        entry.row_update = match previous.get(hash.as_str()) {
            Some(date) => {
                carried += 1;
                Some(*date)
            }
            None => Some(today),
        };
    }
    carried
}

/// A table row keyed by column name, as read back for checks
pub type TableRow = BTreeMap<String, String>;

pub fn row_map(header: &[String], cells: &[String]) -> TableRow {
    header.iter().cloned().zip(cells.iter().cloned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_and_cells_align() {
        let header = header();
        assert_eq!(header.iter().filter(|c| c.ends_with("_name")).count(), 6);
        assert!(header.contains(&"bestmass_url".to_string()));
        assert_eq!(header.last().map(String::as_str), Some(ROW_UPDATE_COLUMN));
    }

    #[test]
    fn test_fingerprint_ignores_row_update() {
        let header = vec!["name".to_string(), ROW_UPDATE_COLUMN.to_string()];
        let a = fingerprint(&header, &["X b".to_string(), "2024-01-01".to_string()]);
        let b = fingerprint(&header, &["X b".to_string(), "2025-06-30".to_string()]);
        let c = fingerprint(&header, &["X c".to_string(), "2024-01-01".to_string()]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}

//! Source-catalog normalization into [`PlanetRecord`]s.
//!
//! Per-source download and column renaming happen upstream; every catalog
//! arrives here in the shared column layout (`name`, `host`, `binary`,
//! `letter`, `ra`, `dec`, `alias`, `status`, `discovery_method`,
//! `discovery_year`, `mass_provenance` and `<p>`, `<p>_min`, `<p>_max`,
//! `<p>_url` per parameter). What still differs between catalogs is handled by
//! the [`SourceNormalizer`] capabilities implemented on [`CatalogKind`].

pub mod catalogs;

use std::collections::BTreeMap;

use crate::domain::{CatalogKind, Measurement, Parameter, PlanetRecord, Status};
use crate::pipeline::processing::names;

pub use catalogs::{parse_dec, parse_ra};

/// One row of a standardized catalog file, keyed by column name
pub type RawRow = BTreeMap<String, String>;

/// Catalog-dependent normalization capabilities
pub trait SourceNormalizer {
    /// Converts a raw row into a record; `None` when the row has no planet name
    fn standardize(&self, row: &RawRow) -> Option<PlanetRecord>;

    /// Parses the catalog's coordinate encoding into decimal degrees
    fn convert_coordinates(&self, ra: &str, dec: &str) -> (Option<f64>, Option<f64>);

    /// Nulls masses the catalog derived from models rather than measured
    fn remove_theoretical_masses(&self, record: &mut PlanetRecord, mass_provenance: &str);

    /// Reduces the catalog's reference encoding to a bibcode or URL
    fn handle_reference_format(&self, raw: &str) -> Option<String>;

    /// Maps the catalog's disposition vocabulary to [`Status`]
    fn assign_status(&self, raw: &str) -> Status;
}

/// Reads a cell, treating blanks and `nan` as missing
pub fn cell<'a>(row: &'a RawRow, column: &str) -> Option<&'a str> {
    row.get(column)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case("nan"))
}

pub fn number(row: &RawRow, column: &str) -> Option<f64> {
    cell(row, column)
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

/// Year columns sometimes arrive as `2019.0`
pub fn year(row: &RawRow, column: &str) -> Option<i32> {
    let value = cell(row, column)?;
    value
        .parse::<i32>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().filter(|y| y.is_finite()).map(|y| y as i32))
}

/// Slot label from the planet name when the catalog leaves `letter` blank
pub fn letter_from_name(name: &str) -> Option<String> {
    if let Some((_, fraction)) = names::fractional_designation(name) {
        return Some(fraction);
    }
    let last = name.split_whitespace().last()?;
    if name.split_whitespace().count() > 1 && last.len() == 1 && last.chars().all(|c| c.is_ascii_lowercase()) {
        Some(last.to_string())
    } else {
        None
    }
}

/// Shared standardization steps; catalog-specific parts go through `normalizer`
pub fn standardize_row<N: SourceNormalizer + ?Sized>(
    normalizer: &N,
    kind: CatalogKind,
    row: &RawRow,
) -> Option<PlanetRecord> {
    let name = cell(row, "name")?;

    let letter = cell(row, "letter")
        .map(str::to_string)
        .or_else(|| letter_from_name(name))
        .unwrap_or_default();

    let host = match cell(row, "host") {
        Some(host) => host.to_string(),
        None => match names::fractional_designation(name) {
            Some((base, _)) => base,
            None if !letter.is_empty() => name
                .strip_suffix(letter.as_str())
                .unwrap_or(name)
                .trim()
                .to_string(),
            None => name.to_string(),
        },
    };

    let mut record = PlanetRecord::new(kind, name, &host, &letter);
    record.binary = cell(row, "binary").unwrap_or_default().to_string();
    record.alias = cell(row, "alias").map(names::split_aliases).unwrap_or_default();
    record.discovery_method = cell(row, "discovery_method").map(str::to_string);
    record.discovery_year = year(row, "discovery_year");
    record.status = normalizer.assign_status(cell(row, "status").unwrap_or_default());

    let (ra, dec) = normalizer.convert_coordinates(cell(row, "ra").unwrap_or_default(), cell(row, "dec").unwrap_or_default());
    record.ra = ra;
    record.dec = dec;

    for parameter in Parameter::ALL {
        let stem = parameter.column();
        let Some(value) = number(row, stem) else {
            continue;
        };
        let url = cell(row, &format!("{}_url", stem))
            .and_then(|raw| normalizer.handle_reference_format(raw))
            .unwrap_or_else(|| kind.tag().to_string());
        record.measurements.set(
            parameter,
            Measurement {
                value: Some(value),
                error_min: number(row, &format!("{}_min", stem)).map(f64::abs),
                error_max: number(row, &format!("{}_max", stem)).map(f64::abs),
                url: Some(url),
            },
        );
    }

    normalizer.remove_theoretical_masses(&mut record, cell(row, "mass_provenance").unwrap_or_default());
    Some(record)
}

/// Normalizes every row, skipping nameless ones
pub fn normalize_rows(kind: CatalogKind, rows: &[RawRow]) -> Vec<PlanetRecord> {
    rows.iter().filter_map(|row| kind.standardize(row)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_standardize_basic_row() {
        let raw = row(&[
            ("name", "51 Peg b"),
            ("host", "51 Peg"),
            ("ra", "344.3665854"),
            ("dec", "20.7687500"),
            ("p", "4.230785"),
            ("p_min", "-0.000036"),
            ("p_max", "0.000036"),
            ("p_url", "2006ApJ...646..505B"),
            ("mass", "nan"),
            ("alias", "HD 217014, HIP 113357"),
            ("discovery_year", "1995.0"),
        ]);

        let record = CatalogKind::Nasa.standardize(&raw).unwrap();
        assert_eq!(record.letter, "b");
        assert_eq!(record.host, "51 Peg");
        assert_eq!(record.status, Status::Confirmed);
        assert_eq!(record.discovery_year, Some(1995));
        assert_eq!(record.alias.len(), 2);

        let period = record.measurements.get(Parameter::Period);
        assert_eq!(period.value, Some(4.230785));
        assert_eq!(period.error_min, Some(0.000036));
        assert_eq!(period.url.as_deref(), Some("2006ApJ...646..505B"));
        assert!(!record.measurements.get(Parameter::Mass).is_present());
    }

    #[test]
    fn test_missing_reference_gets_catalog_placeholder() {
        let raw = row(&[("name", "WASP-12 b"), ("host", "WASP-12"), ("r", "1.9")]);
        let record = CatalogKind::Eu.standardize(&raw).unwrap();
        assert_eq!(record.measurements.get(Parameter::Radius).url.as_deref(), Some("eu"));
    }

    #[test]
    fn test_fractional_candidate_names() {
        let raw = row(&[("name", "TOI-1234.01")]);
        let record = CatalogKind::Toi.standardize(&raw).unwrap();
        assert_eq!(record.host, "TOI-1234");
        assert_eq!(record.letter, ".01");
    }

    #[test]
    fn test_nameless_rows_are_skipped() {
        let rows = vec![row(&[("host", "X")]), row(&[("name", "X b"), ("host", "X")])];
        assert_eq!(normalize_rows(CatalogKind::Oec, &rows).len(), 1);
    }

    #[test]
    fn test_letter_from_name() {
        assert_eq!(letter_from_name("Kepler-9 c"), Some("c".to_string()));
        assert_eq!(letter_from_name("KOI-7.01"), Some(".01".to_string()));
        assert_eq!(letter_from_name("PSR B1257+12"), None);
    }
}

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::constants::DATE_FORMAT;
use crate::domain::{CatalogKind, PlanetRecord};
use crate::error::{ExoMercatError, Result};
use crate::metrics::IngestMetrics;
use crate::pipeline::processing::normalize::{normalize_rows, RawRow};

/// Dated per-catalog snapshots in one directory: `<tag>_<YYYY-MM-DD>.csv`
pub struct CatalogSnapshotSource {
    pub input_dir: PathBuf,
}

impl CatalogSnapshotSource {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
        }
    }

    fn snapshot_date(kind: CatalogKind, path: &Path) -> Option<NaiveDate> {
        let stem = path.file_stem()?.to_str()?;
        let date = stem.strip_prefix(kind.tag())?.strip_prefix('_')?;
        NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
    }

    /// Snapshot for `date`, else the most recent earlier one
    pub fn find_snapshot(&self, kind: CatalogKind, date: NaiveDate) -> Result<(PathBuf, NaiveDate)> {
        let exact = self
            .input_dir
            .join(format!("{}_{}.csv", kind.tag(), date.format(DATE_FORMAT)));
        if exact.is_file() {
            return Ok((exact, date));
        }

        let missing = || ExoMercatError::MissingInput {
            catalog: kind.tag().to_string(),
            date: date.format(DATE_FORMAT).to_string(),
        };
        let entries = std::fs::read_dir(&self.input_dir).map_err(|_| missing())?;
        let best = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().map_or(false, |ext| ext == "csv"))
            .filter_map(|path| Self::snapshot_date(kind, &path).map(|d| (d, path)))
            .filter(|(d, _)| *d < date)
            .max_by_key(|(d, _)| *d);

        match best {
            Some((found, path)) => {
                warn!("No {} snapshot for {}, using {} instead", kind, date, found);
                IngestMetrics::record_snapshot_fallback();
                Ok((path, found))
            }
            None => Err(missing()),
        }
    }

    pub fn read_rows(path: &Path) -> Result<Vec<RawRow>> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut rows = Vec::new();
        for result in reader.deserialize() {
            let row: RawRow = result?;
            rows.push(row);
        }
        Ok(rows)
    }

    /// Loads and normalizes one catalog
    pub fn load(&self, kind: CatalogKind, date: NaiveDate) -> Result<Vec<PlanetRecord>> {
        let (path, _) = self.find_snapshot(kind, date)?;
        let rows = Self::read_rows(&path)?;
        let records = normalize_rows(kind, &rows);
        info!("Loaded {} rows ({} planets) from {:?}", rows.len(), records.len(), path);
        IngestMetrics::record_catalog_loaded(kind.tag(), rows.len(), records.len());
        Ok(records)
    }

    /// Every catalog in order; any missing catalog aborts
    pub fn load_all(&self, date: NaiveDate) -> Result<Vec<PlanetRecord>> {
        let mut records = Vec::new();
        for kind in CatalogKind::ALL {
            records.extend(self.load(kind, date)?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_falls_back_to_latest_earlier_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("eu_2024-01-01.csv"), "name,host\nX b,X\n").unwrap();
        fs::write(dir.path().join("eu_2024-02-01.csv"), "name,host\nY b,Y\n").unwrap();
        fs::write(dir.path().join("eu_2024-09-01.csv"), "name,host\nZ b,Z\n").unwrap();

        let source = CatalogSnapshotSource::new(dir.path());
        let (_, found) = source.find_snapshot(CatalogKind::Eu, date("2024-03-15")).unwrap();
        assert_eq!(found, date("2024-02-01"));

        let records = source.load(CatalogKind::Eu, date("2024-03-15")).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].host, "Y");
    }

    #[test]
    fn test_missing_snapshot_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("nasa_2024-05-01.csv"), "name\n").unwrap();
        let source = CatalogSnapshotSource::new(dir.path());
        let err = source.find_snapshot(CatalogKind::Nasa, date("2024-04-01")).unwrap_err();
        assert!(matches!(err, ExoMercatError::MissingInput { .. }));
    }
}

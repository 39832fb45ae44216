use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::app::ports::CatalogOutputPort;
use crate::constants::{BROWN_DWARF_AUDIT, DATE_FORMAT, LATEST_OUTPUT, OUTPUT_PREFIX};
use crate::domain::MergedEntry;
use crate::error::Result;
use crate::pipeline::table::{entry_cells, fingerprint, header, row_map, TableRow, ROW_UPDATE_COLUMN};

/// Writes the merged table as CSV: a dated copy plus the latest one
pub struct CatalogTableAdapter {
    pub output_dir: PathBuf,
    pub run_date: NaiveDate,
}

impl CatalogTableAdapter {
    pub fn new(output_dir: impl Into<PathBuf>, run_date: NaiveDate) -> Self {
        Self {
            output_dir: output_dir.into(),
            run_date,
        }
    }

    pub fn dated_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}.csv", OUTPUT_PREFIX, self.run_date.format(DATE_FORMAT)))
    }

    pub fn latest_path(&self) -> PathBuf {
        self.output_dir.join(LATEST_OUTPUT)
    }

    /// Most recent dated output strictly before the run date
    pub fn previous_output(&self) -> Option<PathBuf> {
        let prefix = format!("{}_", OUTPUT_PREFIX);
        std::fs::read_dir(&self.output_dir)
            .ok()?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter_map(|path| {
                let stem = path.file_stem()?.to_str()?;
                let date = NaiveDate::parse_from_str(stem.strip_prefix(&prefix)?, DATE_FORMAT).ok()?;
                Some((date, path))
            })
            .filter(|(date, _)| *date < self.run_date)
            .max_by_key(|(date, _)| *date)
            .map(|(_, path)| path)
    }

    fn render(entries: &[MergedEntry]) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(header())?;
        for entry in entries {
            writer.write_record(entry_cells(entry))?;
        }
        writer.into_inner().map_err(|e| std::io::Error::other(e.to_string()).into())
    }

    async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await?;
        debug!("Wrote {} bytes to {:?}", bytes.len(), path);
        Ok(())
    }
}

/// Reads an output table back as (header, rows keyed by column)
pub fn read_table(path: &Path) -> Result<(Vec<String>, Vec<TableRow>)> {
    let mut reader = csv::Reader::from_path(path)?;
    let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let cells: Vec<String> = record.iter().map(str::to_string).collect();
        rows.push(row_map(&header, &cells));
    }
    Ok((header, rows))
}

/// Fingerprint and date of every row in a previous output
pub fn row_updates_from(path: &Path) -> Result<Vec<(String, NaiveDate)>> {
    let mut reader = csv::Reader::from_path(path)?;
    let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let date_column = header.iter().position(|c| c == ROW_UPDATE_COLUMN);
    let mut updates = Vec::new();
    for record in reader.records() {
        let record = record?;
        let cells: Vec<String> = record.iter().map(str::to_string).collect();
        let date = date_column
            .and_then(|idx| cells.get(idx))
            .and_then(|cell| NaiveDate::parse_from_str(cell, DATE_FORMAT).ok());
        if let Some(date) = date {
            updates.push((fingerprint(&header, &cells), date));
        }
    }
    Ok(updates)
}

#[async_trait]
impl CatalogOutputPort for CatalogTableAdapter {
    async fn previous_row_updates(&self) -> std::result::Result<Vec<(String, NaiveDate)>, String> {
        match self.previous_output() {
            Some(path) => {
                info!("Diffing against previous output {:?}", path);
                row_updates_from(&path).map_err(|e| e.to_string())
            }
            None => Ok(Vec::new()),
        }
    }

    async fn write_catalog(&self, entries: &[MergedEntry]) -> std::result::Result<(), String> {
        let bytes = Self::render(entries).map_err(|e| e.to_string())?;
        Self::write_file(&self.dated_path(), &bytes).await.map_err(|e| e.to_string())?;
        Self::write_file(&self.latest_path(), &bytes).await.map_err(|e| e.to_string())?;
        info!("Wrote {} entries to {:?}", entries.len(), self.dated_path());
        Ok(())
    }

    async fn write_removed_brown_dwarfs(&self, entries: &[MergedEntry]) -> std::result::Result<(), String> {
        let bytes = Self::render(entries).map_err(|e| e.to_string())?;
        Self::write_file(&self.output_dir.join(BROWN_DWARF_AUDIT), &bytes)
            .await
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[tokio::test]
    async fn test_empty_table_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = CatalogTableAdapter::new(dir.path(), date("2024-06-01"));
        adapter.write_catalog(&[]).await.unwrap();

        let (columns, rows) = read_table(&adapter.latest_path()).unwrap();
        assert_eq!(columns, header());
        assert!(rows.is_empty());
        assert!(adapter.dated_path().exists());
    }

    #[tokio::test]
    async fn test_previous_output_ignores_same_day_and_later() {
        let dir = tempfile::tempdir().unwrap();
        for day in ["2024-05-01", "2024-05-20", "2024-06-01", "2024-07-01"] {
            std::fs::write(dir.path().join(format!("exo-mercat_{}.csv", day)), "name\n").unwrap();
        }
        let adapter = CatalogTableAdapter::new(dir.path(), date("2024-06-01"));
        let previous = adapter.previous_output().unwrap();
        assert!(previous.ends_with("exo-mercat_2024-05-20.csv"));
        assert!(adapter.previous_row_updates().await.unwrap().is_empty());
    }
}

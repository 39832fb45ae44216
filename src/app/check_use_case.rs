use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, instrument, warn};

use crate::infra::catalog_table_adapter::read_table;
use crate::pipeline::check::{check_rows, CheckReport};
use crate::pipeline::table::header;

/// Validates a written output table against the row invariants
pub struct CheckUseCase;

impl CheckUseCase {
    #[instrument]
    pub fn run(path: &Path) -> Result<CheckReport> {
        let (columns, rows) = read_table(path).with_context(|| format!("Failed to read {:?}", path))?;

        let expected = header();
        let missing: Vec<&String> = expected.iter().filter(|c| !columns.contains(c)).collect();
        if !missing.is_empty() {
            warn!("{:?} is missing columns: {:?}", path, missing);
        }

        let report = check_rows(&rows);
        if report.passed() {
            info!("{:?}: {} rows, all checks passed", path, report.rows);
        } else {
            for violation in &report.violations {
                warn!("{}", violation);
            }
        }
        Ok(report)
    }
}

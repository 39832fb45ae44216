//! Post-hoc consistency checks on a written output table.

use std::fmt;

use crate::domain::CatalogKind;
use crate::pipeline::table::{measurement_stems, TableRow};

/// Invariants verified on every output row
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CheckRule {
    /// Bounds and reference present iff the value is
    MeasurementCompleteness,
    /// bestmass empty iff both mass and msini are
    BestmassPresence,
    /// Name columns populated exactly for the contributing catalogs
    CatalogNames,
    DiscoveryMethod,
    /// Flags within their documented ranges
    FlagRange,
}

impl fmt::Display for CheckRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CheckRule::MeasurementCompleteness => "measurement completeness",
            CheckRule::BestmassPresence => "bestmass presence",
            CheckRule::CatalogNames => "catalog names",
            CheckRule::DiscoveryMethod => "discovery method",
            CheckRule::FlagRange => "flag range",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub row: usize,
    pub name: String,
    pub rule: CheckRule,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {} ({}): {}: {}", self.row, self.name, self.rule, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub rows: usize,
    pub violations: Vec<Violation>,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

fn filled(row: &TableRow, column: &str) -> bool {
    row.get(column).map_or(false, |cell| !cell.trim().is_empty())
}

fn check_row(row: &TableRow) -> Vec<(CheckRule, String)> {
    let mut problems = Vec::new();

    for stem in measurement_stems() {
        let has_value = filled(row, stem);
        for companion in [format!("{}_max", stem), format!("{}_min", stem), format!("{}_url", stem)] {
            if filled(row, &companion) != has_value {
                problems.push((
                    CheckRule::MeasurementCompleteness,
                    format!("{} is {} but {} is not", stem, if has_value { "set" } else { "empty" }, companion),
                ));
            }
        }
    }

    let has_mass = filled(row, "mass") || filled(row, "msini");
    if filled(row, "bestmass") != has_mass {
        problems.push((
            CheckRule::BestmassPresence,
            format!("bestmass {} while mass/msini {}", filled(row, "bestmass"), has_mass),
        ));
    }

    let listed: Vec<CatalogKind> = row
        .get("catalog")
        .map(|cell| cell.split(',').filter_map(CatalogKind::from_tag).collect())
        .unwrap_or_default();
    if listed.is_empty() {
        problems.push((CheckRule::CatalogNames, "no contributing catalog".to_string()));
    }
    for kind in CatalogKind::ALL {
        let expected = listed.contains(&kind);
        if filled(row, kind.name_column()) != expected {
            problems.push((
                CheckRule::CatalogNames,
                format!(
                    "{} {} but catalog {} listed",
                    kind.name_column(),
                    if expected { "empty" } else { "set" },
                    if expected { "is" } else { "is not" }
                ),
            ));
        }
    }

    if !filled(row, "discovery_method") {
        problems.push((CheckRule::DiscoveryMethod, "discovery_method is empty".to_string()));
    }

    for (column, max) in [
        ("binary_mismatch_flag", 2),
        ("coordinate_mismatch_flag", 2),
        ("merging_mismatch_flag", 2),
        ("angular_separation_flag", 1),
        ("duplicate_catalog_flag", 1),
    ] {
        let value = row.get(column).and_then(|cell| cell.trim().parse::<u8>().ok());
        if value.map_or(true, |v| v > max) {
            problems.push((
                CheckRule::FlagRange,
                format!("{} = {:?} outside 0..={}", column, row.get(column), max),
            ));
        }
    }

    problems
}

pub fn check_rows(rows: &[TableRow]) -> CheckReport {
    let mut report = CheckReport {
        rows: rows.len(),
        violations: Vec::new(),
    };
    for (index, row) in rows.iter().enumerate() {
        let name = row.get("name").cloned().unwrap_or_default();
        for (rule, message) in check_row(row) {
            report.violations.push(Violation {
                row: index + 1,
                name: name.clone(),
                rule,
                message,
            });
        }
    }
    report
}

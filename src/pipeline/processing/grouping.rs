//! Orbital-slot label repair.
//!
//! Within each `(main_id, binary)` system, rows are clustered on period (or
//! semi-major axis when no row has a period). Inside a cluster the slot labels
//! should agree; simple disagreements are repaired here, the rest are left for
//! the merger to split.

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::constants::BROWN_DWARF_LETTER;
use crate::domain::{Parameter, PlanetRecord};
use crate::pipeline::audit::{AuditStage, Decision, DecisionKind, StageOutput};
use crate::pipeline::processing::clustering::{cluster_values, distinct_clusters, NO_CLUSTER};
use crate::pipeline::processing::names::is_fractional_letter;

/// Period clusters, or semi-major-axis clusters when the period is absent for every row
pub fn working_clusters(records: &[&PlanetRecord], tolerance: f64) -> (Parameter, Vec<i64>) {
    let periods: Vec<Option<f64>> = records.iter().map(|r| r.measurements.value(Parameter::Period)).collect();
    let ids = cluster_values(&periods, tolerance);
    if !distinct_clusters(&ids).is_empty() {
        return (Parameter::Period, ids);
    }
    let axes: Vec<Option<f64>> = records
        .iter()
        .map(|r| r.measurements.value(Parameter::SemiMajorAxis))
        .collect();
    (Parameter::SemiMajorAxis, cluster_values(&axes, tolerance))
}

pub fn repair_letters(mut records: Vec<PlanetRecord>, tolerance: f64) -> StageOutput<PlanetRecord> {
    let mut decisions = Vec::new();

    let mut systems: BTreeMap<(String, String), Vec<usize>> = BTreeMap::new();
    for (idx, record) in records.iter().enumerate() {
        systems
            .entry((record.main_id().to_string(), record.binary.clone()))
            .or_default()
            .push(idx);
    }

    for ((main_id, binary), members) in systems.into_iter().filter(|(_, m)| m.len() > 1) {
        let (parameter, ids) = {
            let rows: Vec<&PlanetRecord> = members.iter().map(|idx| &records[*idx]).collect();
            working_clusters(&rows, tolerance)
        };

        for cluster in distinct_clusters(&ids) {
            let in_cluster: Vec<usize> = members
                .iter()
                .zip(&ids)
                .filter(|(_, id)| **id == cluster && **id != NO_CLUSTER)
                .map(|(idx, _)| *idx)
                .collect();
            let letters: BTreeSet<&str> = in_cluster.iter().map(|idx| records[*idx].letter.as_str()).collect();
            if letters.len() <= 1 {
                continue;
            }

            let key = format!("{} {} [{} cluster {}]", main_id, binary, parameter.column(), cluster);
            let before = letters.iter().copied().collect::<Vec<_>>().join(", ");

            let mut target: Option<(String, DecisionKind)> = None;
            let named: Vec<&str> = letters
                .iter()
                .copied()
                .filter(|letter| !letter.trim().is_empty() && !is_fractional_letter(letter))
                .collect();
            if let [single] = named.as_slice() {
                target = Some((single.to_string(), DecisionKind::LetterRepaired));
            }
            if letters.contains(BROWN_DWARF_LETTER) {
                target = Some((BROWN_DWARF_LETTER.to_string(), DecisionKind::BrownDwarfLetter));
            }

            match target {
                Some((letter, kind)) => {
                    debug!("Slot labels {} unified to {} for {}", before, letter, key);
                    decisions.push(Decision::new(
                        AuditStage::Grouping,
                        kind,
                        key,
                        format!("{{{}}} -> {}", before, letter),
                    ));
                    for idx in in_cluster {
                        records[idx].letter = letter.clone();
                    }
                }
                None => decisions.push(Decision::new(
                    AuditStage::Grouping,
                    DecisionKind::LetterDisagreement,
                    key,
                    format!("unrepaired labels {{{}}}", before),
                )),
            }
        }
    }

    StageOutput::new(records, decisions)
}

//! Binary-component reconciliation.
//!
//! Rows describing the same planet can carry different component labels
//! (`A`, `AB`, empty, `S-type`). Within each `(key, letter)` group weak labels
//! are unified or replaced by the single definite label present; several
//! definite labels are a conflict that is flagged and only partially repaired.

use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

use crate::constants::{ARCSEC_PER_DEG, S_TYPE};
use crate::domain::PlanetRecord;
use crate::pipeline::audit::{AuditStage, Decision, DecisionKind, StageOutput};
use crate::pipeline::processing::coordinates::{max_pairwise_separation, separation};
use crate::pipeline::processing::names::{is_weak_binary, trailing_component};

/// Which identity the reconciliation groups on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryKey {
    /// Raw host string, before resolution
    Host,
    /// Resolved main_id; its results supersede the host pass
    MainId,
}

impl BinaryKey {
    fn of<'a>(&self, record: &'a PlanetRecord) -> &'a str {
        match self {
            BinaryKey::Host => record.host.as_str(),
            BinaryKey::MainId => record.main_id(),
        }
    }
}

fn labels_of(records: &[PlanetRecord], members: &[usize]) -> String {
    members
        .iter()
        .map(|idx| {
            let r = &records[*idx];
            format!("{} '{}'", r.describe(), r.binary)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn group_spread_exceeds(records: &[PlanetRecord], members: &[usize], tolerance_deg: f64) -> bool {
    let points: Vec<(f64, f64)> = members
        .iter()
        .filter_map(|idx| Some((records[*idx].ra?, records[*idx].dec?)))
        .collect();
    max_pairwise_separation(&points) > tolerance_deg
}

pub fn reconcile_binaries(
    mut records: Vec<PlanetRecord>,
    key: BinaryKey,
    tolerance_deg: f64,
) -> StageOutput<PlanetRecord> {
    let mut decisions = Vec::new();

    let mut groups: BTreeMap<(String, String), Vec<usize>> = BTreeMap::new();
    for (idx, record) in records.iter().enumerate() {
        groups
            .entry((key.of(record).to_string(), record.letter.clone()))
            .or_default()
            .push(idx);
    }

    let previous_flags: Vec<u8> = records.iter().map(|r| r.binary_mismatch_flag).collect();

    for ((group_key, letter), members) in groups {
        let labels: BTreeSet<String> = members.iter().map(|idx| records[*idx].binary.trim().to_string()).collect();
        if labels.len() <= 1 {
            continue;
        }
        let definite: BTreeSet<&str> = labels
            .iter()
            .map(String::as_str)
            .filter(|label| !is_weak_binary(label))
            .collect();
        let key_text = format!("{} {}", group_key, letter);

        match definite.len() {
            0 | 1 => {
                let target = definite.iter().next().copied().unwrap_or(S_TYPE).to_string();
                let exceeded = group_spread_exceeds(&records, &members, tolerance_deg);
                let kind = if definite.is_empty() {
                    DecisionKind::WeakLabelsUnified
                } else {
                    DecisionKind::DefiniteLabelPropagated
                };
                decisions.push(Decision::new(
                    AuditStage::BinaryMismatch,
                    kind,
                    key_text.clone(),
                    format!("-> '{}' from {}", target, labels_of(&records, &members)),
                ));
                if exceeded {
                    warn!("Binary label set to '{}' for {} but coordinates exceed tolerance", target, key_text);
                    decisions.push(Decision::new(
                        AuditStage::BinaryMismatch,
                        DecisionKind::CoordinateToleranceExceeded,
                        key_text.clone(),
                        format!("rows spread beyond {:.1} arcsec", tolerance_deg * ARCSEC_PER_DEG),
                    ));
                }
                for idx in &members {
                    records[*idx].binary = target.clone();
                    records[*idx].binary_mismatch_flag = u8::from(exceeded);
                }
            }
            _ => {
                warn!("Irreconcilable binary labels for {}: {:?}", key_text, definite);
                decisions.push(Decision::new(
                    AuditStage::BinaryMismatch,
                    DecisionKind::BinaryConflict,
                    key_text.clone(),
                    labels_of(&records, &members),
                ));

                let anchors: Vec<(String, f64, f64)> = members
                    .iter()
                    .map(|idx| &records[*idx])
                    .filter(|r| !is_weak_binary(&r.binary))
                    .filter_map(|r| Some((r.binary.trim().to_string(), r.ra?, r.dec?)))
                    .collect();

                for idx in &members {
                    records[*idx].binary_mismatch_flag = 2;
                    if !is_weak_binary(&records[*idx].binary) {
                        continue;
                    }
                    let position = (records[*idx].ra, records[*idx].dec);
                    let nearest = anchors
                        .iter()
                        .filter_map(|(label, ra, dec)| {
                            let sep = separation(position, (Some(*ra), Some(*dec)))?;
                            Some((sep, label))
                        })
                        .filter(|(sep, _)| *sep <= tolerance_deg)
                        .min_by(|a, b| a.0.total_cmp(&b.0));
                    if let Some((sep, label)) = nearest {
                        decisions.push(Decision::new(
                            AuditStage::BinaryMismatch,
                            DecisionKind::NearestNeighbourRepair,
                            key_text.clone(),
                            format!(
                                "{} -> '{}' (nearest at {:.3} arcsec)",
                                records[*idx].describe(),
                                label,
                                sep * ARCSEC_PER_DEG
                            ),
                        ));
                        records[*idx].binary = label.clone();
                    }
                }
            }
        }
    }

    if key == BinaryKey::MainId {
        for (record, before) in records.iter().zip(previous_flags) {
            if record.binary_mismatch_flag != before {
                warn!(
                    "binary_mismatch_flag changed {} -> {} after resolution for {}",
                    before,
                    record.binary_mismatch_flag,
                    record.describe()
                );
                decisions.push(Decision::new(
                    AuditStage::BinaryMismatch,
                    DecisionKind::BinaryFlagChanged,
                    record.main_id(),
                    format!("{} -> {} for {}", before, record.binary_mismatch_flag, record.describe()),
                ));
            }
        }
    }

    StageOutput::new(records, decisions)
}

/// Rows whose star name ends in a component suffix the binary column contradicts (log only)
pub fn find_missed_binaries(records: &[PlanetRecord]) -> Vec<Decision> {
    let mut decisions = Vec::new();
    for record in records {
        let suffix = trailing_component(record.main_id()).or_else(|| trailing_component(&record.host));
        if let Some(component) = suffix {
            if record.binary.trim() != component {
                decisions.push(Decision::new(
                    AuditStage::BinaryMismatch,
                    DecisionKind::MissedPotentialBinary,
                    record.main_id(),
                    format!("name suggests '{}' but binary is '{}': {}", component, record.binary, record.describe()),
                ));
            }
        }
    }
    decisions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CatalogKind;

    const TOL: f64 = 5.0 / 3600.0;

    fn record(catalog: CatalogKind, host: &str, binary: &str, ra: f64) -> PlanetRecord {
        let mut r = PlanetRecord::new(catalog, &format!("{} b", host), host, "b");
        r.binary = binary.to_string();
        r.ra = Some(ra);
        r.dec = Some(-10.0);
        r
    }

    #[test]
    fn test_weak_labels_become_s_type() {
        let records = vec![
            record(CatalogKind::Nasa, "HD 1", "", 10.0),
            record(CatalogKind::Eu, "HD 1", "S-type", 10.0),
        ];
        let out = reconcile_binaries(records, BinaryKey::Host, TOL);
        assert!(out.records.iter().all(|r| r.binary == "S-type" && r.binary_mismatch_flag == 0));
        assert_eq!(out.decisions[0].kind, DecisionKind::WeakLabelsUnified);
    }

    #[test]
    fn test_single_definite_label_propagates_and_flags_spread() {
        let records = vec![
            record(CatalogKind::Nasa, "HD 2", "B", 10.0),
            record(CatalogKind::Eu, "HD 2", "", 10.1),
        ];
        let out = reconcile_binaries(records, BinaryKey::Host, TOL);
        assert!(out.records.iter().all(|r| r.binary == "B"));
        assert!(out.records.iter().all(|r| r.binary_mismatch_flag == 1));
        assert!(out
            .decisions
            .iter()
            .any(|d| d.kind == DecisionKind::CoordinateToleranceExceeded));
    }

    #[test]
    fn test_conflicting_definite_labels_are_preserved() {
        let records = vec![
            record(CatalogKind::Nasa, "HD 202206", "A", 10.0),
            record(CatalogKind::Eu, "HD 202206", "AB", 10.0),
        ];
        let out = reconcile_binaries(records, BinaryKey::Host, TOL);
        assert_eq!(out.records[0].binary, "A");
        assert_eq!(out.records[1].binary, "AB");
        assert!(out.records.iter().all(|r| r.binary_mismatch_flag == 2));
        assert_eq!(out.decisions[0].kind, DecisionKind::BinaryConflict);
    }

    #[test]
    fn test_conflict_repairs_weak_rows_by_nearest_neighbour() {
        let records = vec![
            record(CatalogKind::Nasa, "HD 3", "A", 10.0),
            record(CatalogKind::Eu, "HD 3", "B", 10.001),
            record(CatalogKind::Oec, "HD 3", "", 10.0009),
            record(CatalogKind::Toi, "HD 3", "", 40.0),
        ];
        let out = reconcile_binaries(records, BinaryKey::Host, TOL);
        assert_eq!(out.records[2].binary, "B");
        assert_eq!(out.records[3].binary, "");
    }

    #[test]
    fn test_second_pass_is_idempotent() {
        let records = vec![
            record(CatalogKind::Nasa, "HD 4", "A", 10.0),
            record(CatalogKind::Eu, "HD 4", "", 10.0),
            record(CatalogKind::Oec, "HD 5", "A", 20.0),
            record(CatalogKind::Eu, "HD 5", "AB", 20.0),
        ];
        let first = reconcile_binaries(records, BinaryKey::Host, TOL).records;
        let second = reconcile_binaries(first.clone(), BinaryKey::MainId, TOL);
        assert_eq!(second.records, first);
        assert!(second
            .decisions
            .iter()
            .all(|d| d.kind != DecisionKind::BinaryFlagChanged));
    }

    #[test]
    fn test_flag_change_after_resolution_is_logged() {
        use crate::domain::{MainIdProvenance, ResolvedIdentity};

        let records = vec![
            record(CatalogKind::Nasa, "H1", "A", 10.0),
            record(CatalogKind::Eu, "H2", "", 10.003),
        ];
        let mut first = reconcile_binaries(records, BinaryKey::Host, TOL).records;
        assert!(first.iter().all(|r| r.binary_mismatch_flag == 0));

        for r in first.iter_mut() {
            r.identity = Some(ResolvedIdentity {
                main_id: "Star".to_string(),
                ra: Some(10.0),
                dec: Some(-10.0),
                list_id: Vec::new(),
                provenance: MainIdProvenance::StarDbName,
                angular_separation: Some(0.0),
            });
        }
        let second = reconcile_binaries(first, BinaryKey::MainId, TOL);
        assert!(second.records.iter().all(|r| r.binary == "A" && r.binary_mismatch_flag == 1));
        let changed: Vec<_> = second
            .decisions
            .iter()
            .filter(|d| d.kind == DecisionKind::BinaryFlagChanged)
            .collect();
        assert_eq!(changed.len(), 2);
        assert!(changed.iter().all(|d| d.key == "Star" && d.detail.starts_with("0 -> 1")));
    }

    #[test]
    fn test_missed_binary_suffix_is_reported() {
        let records = vec![record(CatalogKind::Eu, "Kepler-13 A", "", 10.0)];
        let decisions = find_missed_binaries(&records);
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].kind, DecisionKind::MissedPotentialBinary);
    }
}

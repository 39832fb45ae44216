//! Final shaping of merged entries before they are written.

use tracing::info;

use crate::domain::{Measurement, MergedEntry, Parameter};
use crate::pipeline::audit::{AuditStage, Decision, DecisionKind, StageOutput};
use crate::pipeline::processing::names::canonical_name;

/// Entries kept and entries removed as brown dwarfs
#[derive(Debug, Clone)]
pub struct BrownDwarfSplit {
    pub kept: StageOutput<MergedEntry>,
    pub removed: Vec<MergedEntry>,
}

/// Drops entries whose selected mass exceeds `mass_limit` Jupiter masses.
///
/// Entries with neither mass nor msini count as zero mass and are kept.
pub fn remove_brown_dwarfs(entries: Vec<MergedEntry>, mass_limit: f64) -> BrownDwarfSplit {
    let mut decisions = Vec::new();
    let (removed, kept): (Vec<_>, Vec<_>) = entries.into_iter().partition(|e| e.selected_mass() > mass_limit);
    for entry in &removed {
        decisions.push(Decision::new(
            AuditStage::PostProcessing,
            DecisionKind::BrownDwarfRemoved,
            entry.name.clone(),
            format!("selected mass {} > {}", entry.selected_mass(), mass_limit),
        ));
    }
    if !removed.is_empty() {
        info!("Removed {} brown dwarfs above {} MJup", removed.len(), mass_limit);
    }
    BrownDwarfSplit {
        kept: StageOutput::new(kept, decisions),
        removed,
    }
}

pub fn assign_canonical_names(entries: &mut [MergedEntry]) {
    for entry in entries {
        entry.name = canonical_name(&entry.main_id, &entry.binary, &entry.letter);
    }
}

/// A present value always carries both bounds and a reference; an absent one carries none
fn complete(measurement: Measurement, fallback_url: &str) -> Measurement {
    let mut measurement = measurement.cleaned();
    if measurement.is_present() {
        measurement.error_min = Some(measurement.error_min.unwrap_or(f64::INFINITY));
        measurement.error_max = Some(measurement.error_max.unwrap_or(f64::INFINITY));
        if measurement.url.as_deref().map_or(true, |url| url.trim().is_empty()) {
            measurement.url = Some(fallback_url.to_string());
        }
    }
    measurement
}

pub fn enforce_output_invariants(entries: &mut [MergedEntry]) {
    for entry in entries {
        let fallback = entry.catalogs.first().map(|c| c.tag()).unwrap_or_default();
        for parameter in Parameter::ALL {
            let measurement = entry.measurements.get(parameter).clone();
            entry.measurements.set(parameter, complete(measurement, fallback));
        }
        entry.bestmass = complete(std::mem::take(&mut entry.bestmass), fallback);
        if !entry.bestmass.is_present() {
            entry.bestmass_provenance.clear();
        }
    }
}

/// Deterministic output order: display name, then contributing catalogs
pub fn sort_entries(entries: &mut [MergedEntry]) {
    entries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.catalogs.cmp(&b.catalogs)).then_with(|| a.main_id.cmp(&b.main_id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CatalogKind, Measurements};
    use std::collections::BTreeMap;

    fn entry(main_id: &str, binary: &str, letter: &str) -> MergedEntry {
        MergedEntry {
            name: String::new(),
            main_id: main_id.to_string(),
            host: main_id.to_string(),
            binary: binary.to_string(),
            letter: letter.to_string(),
            catalogs: vec![CatalogKind::Eu],
            catalog_names: BTreeMap::from([(CatalogKind::Eu, format!("{} {}", main_id, letter))]),
            measurements: Measurements::default(),
            bestmass: Measurement::default(),
            bestmass_provenance: String::new(),
            status: "CONFIRMED".to_string(),
            catalog_status: "eu: CONFIRMED".to_string(),
            discovery_year: None,
            discovery_method: "Unknown".to_string(),
            alias: Vec::new(),
            main_id_ra: None,
            main_id_dec: None,
            main_id_provenance: "eu".to_string(),
            angular_separation: String::new(),
            angular_separation_flag: 0,
            coordinate_mismatch: String::new(),
            coordinate_mismatch_flag: 0,
            binary_mismatch_flag: 0,
            merging_mismatch_flag: 0,
            duplicate_catalog_flag: 0,
            duplicate_names: String::new(),
            row_update: None,
        }
    }

    #[test]
    fn test_brown_dwarf_filter_uses_mass_then_msini() {
        let mut heavy = entry("A", "", "b");
        heavy
            .measurements
            .set(Parameter::Msini, Measurement::new(35.0, None, None, Some("eu")));
        let mut light = entry("B", "", "b");
        light
            .measurements
            .set(Parameter::Mass, Measurement::new(19.4, None, None, Some("eu")));
        let massless = entry("C", "", "b");

        let split = remove_brown_dwarfs(vec![heavy, light, massless], 20.0);
        assert_eq!(split.removed.len(), 1);
        assert_eq!(split.removed[0].main_id, "A");
        assert_eq!(split.kept.records.len(), 2);
        assert_eq!(split.kept.decisions.len(), 1);
    }

    #[test]
    fn test_canonical_names() {
        let mut entries = vec![entry("* alf Cen B", "B", "b"), entry("TOI-700", "", ".01")];
        assign_canonical_names(&mut entries);
        assert_eq!(entries[0].name, "* alf Cen B b");
        assert_eq!(entries[1].name, "TOI-700.01");
    }

    #[test]
    fn test_invariants_fill_missing_bounds() {
        let mut e = entry("A", "", "b");
        e.measurements
            .set(Parameter::Radius, Measurement::new(1.2, Some(0.1), None, None));
        e.measurements.set(
            Parameter::Period,
            Measurement {
                value: None,
                error_min: Some(0.1),
                error_max: None,
                url: Some("x".to_string()),
            },
        );
        let mut entries = vec![e];
        enforce_output_invariants(&mut entries);

        let radius = entries[0].measurements.get(Parameter::Radius);
        assert_eq!(radius.error_max, Some(f64::INFINITY));
        assert_eq!(radius.url.as_deref(), Some("eu"));
        assert_eq!(entries[0].measurements.get(Parameter::Period), &Measurement::default());
    }
}

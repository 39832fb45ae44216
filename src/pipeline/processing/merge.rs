//! Collapses per-catalog rows into one entry per physical planet.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

use crate::config::MatchingConfig;
use crate::constants::{CONTROVERSIAL, UNKNOWN_METHOD};
use crate::domain::{CatalogKind, MainIdProvenance, Measurement, Measurements, MergedEntry, Parameter, PlanetRecord};
use crate::pipeline::audit::{AuditStage, Decision, DecisionKind, StageOutput};
use crate::pipeline::processing::clustering::{distinct_clusters, NO_CLUSTER};
use crate::pipeline::processing::coordinates::axis_mismatch;
use crate::pipeline::processing::grouping::working_clusters;

/// Ranking key: relative error, then lexicographically first reference
fn rank_key(measurement: &Measurement, any_bounds: bool) -> (f64, bool, &str) {
    let uncertainty = if any_bounds {
        measurement.relative_error().unwrap_or(f64::INFINITY)
    } else {
        // No row has both bounds: the raw lower error is the only signal left
        measurement.error_min.map(f64::abs).unwrap_or(f64::INFINITY)
    };
    let url = measurement.url.as_deref();
    (uncertainty, url.is_none(), url.unwrap_or(""))
}

fn compare_keys(a: &(f64, bool, &str), b: &(f64, bool, &str)) -> Ordering {
    a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(b.2))
}

/// Best-constrained measurement among candidates; the first of exact ties wins
pub fn select_best<'a>(candidates: impl IntoIterator<Item = &'a Measurement>) -> Measurement {
    let present: Vec<&Measurement> = candidates.into_iter().filter(|m| m.is_present()).collect();
    let any_bounds = present.iter().any(|m| m.relative_error().is_some());
    present
        .into_iter()
        .map(|m| (rank_key(m, any_bounds), m))
        .min_by(|a, b| compare_keys(&a.0, &b.0))
        .map(|(_, m)| m.clone())
        .unwrap_or_default()
}

/// Mass when at least as well constrained as msini, else msini
pub fn best_mass(measurements: &Measurements) -> (Measurement, &'static str) {
    let mass = measurements.get(Parameter::Mass);
    let msini = measurements.get(Parameter::Msini);
    match (mass.is_present(), msini.is_present()) {
        (true, true) => {
            let mass_err = mass.relative_error().unwrap_or(f64::INFINITY);
            let msini_err = msini.relative_error().unwrap_or(f64::INFINITY);
            if mass_err <= msini_err {
                (mass.clone(), "Mass")
            } else {
                (msini.clone(), "Msini")
            }
        }
        (true, false) => (mass.clone(), "Mass"),
        (false, true) => (msini.clone(), "Msini"),
        (false, false) => (Measurement::default(), ""),
    }
}

/// Discovery methods across rows; TOI's blanket label yields to any other source
pub fn combine_methods(rows: &[&PlanetRecord]) -> String {
    let reported: Vec<(CatalogKind, &str)> = rows
        .iter()
        .filter_map(|r| {
            let method = r.discovery_method.as_deref()?.trim();
            Some((r.catalog, method)).filter(|(_, m)| !m.is_empty())
        })
        .collect();
    let has_other = reported.iter().any(|(catalog, _)| *catalog != CatalogKind::Toi);
    let methods: BTreeSet<&str> = reported
        .into_iter()
        .filter(|(catalog, _)| !has_other || *catalog != CatalogKind::Toi)
        .map(|(_, method)| method)
        .collect();
    if methods.is_empty() {
        UNKNOWN_METHOD.to_string()
    } else {
        methods.into_iter().collect::<Vec<_>>().join(",")
    }
}

fn merge_group(rows: &[&PlanetRecord], merging_flag: u8, config: &MatchingConfig, decisions: &mut Vec<Decision>) -> MergedEntry {
    let first = rows[0];
    let main_id = first.main_id().to_string();
    let key = format!("{} {} {}", main_id, first.binary, first.letter);

    let mut measurements = Measurements::default();
    for parameter in Parameter::ALL {
        measurements.set(parameter, select_best(rows.iter().map(|r| r.measurements.get(parameter))));
    }
    let (bestmass, bestmass_provenance) = best_mass(&measurements);

    let statuses: BTreeSet<&str> = rows.iter().map(|r| r.status.as_str()).collect();
    let status = match statuses.len() {
        1 => statuses.iter().next().copied().unwrap_or_default().to_string(),
        _ => CONTROVERSIAL.to_string(),
    };
    let catalog_status = rows
        .iter()
        .map(|r| format!("{}: {}", r.catalog, r.status))
        .collect::<Vec<_>>()
        .join(",");

    // Catalog names and duplicate contributions
    let mut catalog_names: BTreeMap<CatalogKind, String> = BTreeMap::new();
    let mut per_catalog: BTreeMap<CatalogKind, usize> = BTreeMap::new();
    for row in rows {
        catalog_names.entry(row.catalog).or_insert_with(|| row.catalog_name.clone());
        *per_catalog.entry(row.catalog).or_default() += 1;
    }
    let duplicated = per_catalog.values().any(|count| *count > 1);
    let duplicate_names = if duplicated {
        rows.iter()
            .map(|r| format!("{}: {}", r.catalog, r.catalog_name))
            .collect::<Vec<_>>()
            .join(",")
    } else {
        String::new()
    };
    if duplicated {
        decisions.push(Decision::new(AuditStage::Merging, DecisionKind::DuplicateCatalog, key.clone(), duplicate_names.clone()));
    }

    // Main-identity coordinates, preferring the strongest provenance
    let provenances: BTreeSet<&str> = rows.iter().filter_map(|r| r.provenance()).map(|p| p.tag()).collect();
    let chosen = rows
        .iter()
        .filter(|r| r.identity.is_some())
        .min_by_key(|r| r.provenance().map(|p| p.rank()).unwrap_or(u8::MAX))
        .copied()
        .unwrap_or(first);
    if provenances.len() > 1 {
        let candidates = rows
            .iter()
            .filter_map(|r| {
                let identity = r.identity.as_ref()?;
                Some(format!("{}: {} ({:?}, {:?})", r.catalog, identity.provenance, identity.ra, identity.dec))
            })
            .collect::<Vec<_>>()
            .join("; ");
        warn!("Conflicting main_id provenance for {}: {}", key, candidates);
        decisions.push(Decision::new(AuditStage::Merging, DecisionKind::ProvenanceConflict, key.clone(), candidates));
    }
    let (main_id_ra, main_id_dec, provenance) = match &chosen.identity {
        Some(identity) => (identity.ra, identity.dec, identity.provenance),
        None => (chosen.ra, chosen.dec, MainIdProvenance::Catalog(chosen.catalog)),
    };

    // Per-axis spread of the catalogs' own coordinates
    let points: Vec<(f64, f64)> = rows.iter().filter_map(|r| Some((r.ra?, r.dec?))).collect();
    let mismatch = axis_mismatch(&points, config.coordinate_mismatch_tolerance_deg());
    if mismatch.flag() > 0 {
        decisions.push(Decision::new(
            AuditStage::CoordinateCheck,
            DecisionKind::CoordinateMismatch,
            key.clone(),
            format!(
                "{} disagree: {}",
                mismatch.label(),
                rows.iter()
                    .map(|r| format!("{} ({:?}, {:?})", r.catalog, r.ra, r.dec))
                    .collect::<Vec<_>>()
                    .join("; ")
            ),
        ));
    }

    // Each row's distance to the identity it resolved to
    let separations: Vec<(CatalogKind, f64)> = rows
        .iter()
        .filter_map(|r| Some((r.catalog, r.identity.as_ref()?.angular_separation?)))
        .collect();
    let angular_separation = separations
        .iter()
        .map(|(catalog, arcsec)| format!("{}: {:.3}", catalog, arcsec))
        .collect::<Vec<_>>()
        .join(",");
    let angular_separation_flag = u8::from(
        separations
            .iter()
            .any(|(_, arcsec)| *arcsec > config.angular_separation_tolerance_arcsec),
    );
    if angular_separation_flag == 1 {
        decisions.push(Decision::new(
            AuditStage::CoordinateCheck,
            DecisionKind::AngularSeparation,
            key.clone(),
            format!("beyond {} arcsec: {}", config.angular_separation_tolerance_arcsec, angular_separation),
        ));
    }

    let alias: Vec<String> = rows
        .iter()
        .flat_map(|r| {
            r.alias
                .iter()
                .chain(r.identity.iter().flat_map(|identity| identity.list_id.iter()))
        })
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    MergedEntry {
        name: first.name.clone(),
        main_id,
        host: first.host.clone(),
        binary: first.binary.clone(),
        letter: first.letter.clone(),
        catalogs: per_catalog.keys().copied().collect(),
        catalog_names,
        measurements,
        bestmass,
        bestmass_provenance: bestmass_provenance.to_string(),
        status,
        catalog_status,
        discovery_year: rows.iter().filter_map(|r| r.discovery_year).min(),
        discovery_method: combine_methods(rows),
        alias,
        main_id_ra,
        main_id_dec,
        main_id_provenance: provenance.tag().to_string(),
        angular_separation,
        angular_separation_flag,
        coordinate_mismatch: mismatch.label().to_string(),
        coordinate_mismatch_flag: mismatch.flag(),
        binary_mismatch_flag: rows.iter().map(|r| r.binary_mismatch_flag).max().unwrap_or(0),
        merging_mismatch_flag: merging_flag,
        duplicate_catalog_flag: u8::from(duplicated),
        duplicate_names,
        row_update: None,
    }
}

/// Groups by `(main_id, binary, letter)` and splits groups whose periods
/// (or semi-major axes) fall in several clusters
pub fn merge_records(records: &[PlanetRecord], config: &MatchingConfig) -> StageOutput<MergedEntry> {
    let mut decisions = Vec::new();
    let mut entries = Vec::new();

    let mut groups: BTreeMap<(&str, &str, &str), Vec<&PlanetRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry((record.main_id(), record.binary.as_str(), record.letter.as_str()))
            .or_default()
            .push(record);
    }

    for ((main_id, binary, letter), rows) in groups {
        let key = format!("{} {} {}", main_id, binary, letter);
        if rows.len() == 1 {
            entries.push(merge_group(&rows, 0, config, &mut decisions));
            continue;
        }

        let (parameter, ids) = working_clusters(&rows, config.period_tolerance);
        let clusters = distinct_clusters(&ids);
        match clusters.len() {
            0 => {
                decisions.push(Decision::new(
                    AuditStage::Merging,
                    DecisionKind::FallbackMerge,
                    key,
                    format!(
                        "no period or semi-major axis to validate: {}",
                        rows.iter().map(|r| r.describe()).collect::<Vec<_>>().join("; ")
                    ),
                ));
                entries.push(merge_group(&rows, 2, config, &mut decisions));
            }
            1 => entries.push(merge_group(&rows, 0, config, &mut decisions)),
            _ => {
                let detail = rows
                    .iter()
                    .zip(&ids)
                    .map(|(r, id)| format!("{} {}={:?} cluster {}", r.describe(), parameter.column(), r.measurements.value(parameter), id))
                    .collect::<Vec<_>>()
                    .join("; ");
                warn!("Splitting {} into {} entries on {}", key, clusters.len(), parameter.column());
                decisions.push(Decision::new(AuditStage::Merging, DecisionKind::PeriodSplit, key, detail));

                let mut parts: Vec<i64> = clusters;
                if ids.contains(&NO_CLUSTER) {
                    parts.push(NO_CLUSTER);
                }
                for cluster in parts {
                    let part: Vec<&PlanetRecord> = rows
                        .iter()
                        .zip(&ids)
                        .filter(|(_, id)| **id == cluster)
                        .map(|(r, _)| *r)
                        .collect();
                    entries.push(merge_group(&part, 1, config, &mut decisions));
                }
            }
        }
    }

    StageOutput::new(entries, decisions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ResolvedIdentity, Status};

    fn resolved(catalog: CatalogKind, name: &str, main_id: &str, period: Option<f64>) -> PlanetRecord {
        let mut r = PlanetRecord::new(catalog, name, "51 Peg", "b");
        r.status = Status::Confirmed;
        r.ra = Some(344.3666);
        r.dec = Some(20.7688);
        if let Some(p) = period {
            r.measurements
                .set(Parameter::Period, Measurement::new(p, Some(0.00001), Some(0.00001), Some(catalog.tag())));
        }
        r.identity = Some(ResolvedIdentity {
            main_id: main_id.to_string(),
            ra: Some(344.3666),
            dec: Some(20.7688),
            list_id: vec!["HD 217014".to_string()],
            provenance: MainIdProvenance::StarDbName,
            angular_separation: Some(0.0),
        });
        r
    }

    #[test]
    fn test_best_value_prefers_smaller_relative_error() {
        let small = Measurement::new(0.61, Some(0.13), Some(0.13), Some("2019A&A...1"));
        let large = Measurement::new(19.4, Some(1.5), Some(1.5), Some("2020AJ....2"));
        let best = select_best([&small, &large]);
        assert_eq!(best, large);
    }

    #[test]
    fn test_best_value_tie_breaks_on_reference() {
        // Heuristic: lexicographically first reference wins an exact tie
        let catalog = Measurement::new(2.0, Some(0.2), Some(0.2), Some("eu"));
        let paper = Measurement::new(2.0, Some(0.2), Some(0.2), Some("2011ApJ...7"));
        assert_eq!(select_best([&catalog, &paper]), paper);
    }

    #[test]
    fn test_best_value_without_bounds_uses_lower_error() {
        let a = Measurement::new(2.0, Some(0.5), None, Some("a"));
        let b = Measurement::new(2.0, Some(0.1), None, Some("b"));
        let c = Measurement::new(2.0, None, None, Some("0"));
        assert_eq!(select_best([&a, &b, &c]), b);
        assert_eq!(select_best([&Measurement::default()]), Measurement::default());
    }

    #[test]
    fn test_bestmass_selection() {
        let measurements = Measurements::default()
            .with(Parameter::Mass, Measurement::new(1.0, Some(0.5), Some(0.5), Some("m")))
            .with(Parameter::Msini, Measurement::new(0.9, Some(0.1), Some(0.1), Some("s")));
        let (best, provenance) = best_mass(&measurements);
        assert_eq!(best.value, Some(0.9));
        assert_eq!(provenance, "Msini");
        assert_eq!(best_mass(&Measurements::default()).1, "");
    }

    #[test]
    fn test_toi_method_dropped_when_richer_source_exists() {
        let mut toi = PlanetRecord::new(CatalogKind::Toi, "TOI-1.01", "TOI-1", ".01");
        toi.discovery_method = Some("Transit".to_string());
        let mut nasa = PlanetRecord::new(CatalogKind::Nasa, "X b", "X", "b");
        nasa.discovery_method = Some("Radial Velocity".to_string());
        assert_eq!(combine_methods(&[&toi, &nasa]), "Radial Velocity");
        assert_eq!(combine_methods(&[&toi]), "Transit");
        assert_eq!(combine_methods(&[]), UNKNOWN_METHOD);
    }

    #[test]
    fn test_single_merge_for_agreeing_periods() {
        let records = vec![
            resolved(CatalogKind::Nasa, "51 Peg b", "* 51 Peg", Some(4.2308)),
            resolved(CatalogKind::Oec, "51 Pegasi b", "* 51 Peg", Some(4.23077)),
        ];
        let out = merge_records(&records, &MatchingConfig::default());
        assert_eq!(out.records.len(), 1);
        let entry = &out.records[0];
        assert_eq!(entry.merging_mismatch_flag, 0);
        assert_eq!(entry.catalog_name(CatalogKind::Nasa), "51 Peg b");
        assert_eq!(entry.catalog_name(CatalogKind::Oec), "51 Pegasi b");
        assert_eq!(entry.catalog_name(CatalogKind::Eu), "");
        assert_eq!(entry.status, "CONFIRMED");
        assert_eq!(entry.duplicate_catalog_flag, 0);
        assert_eq!(entry.angular_separation_flag, 0);
    }

    #[test]
    fn test_period_split_and_fallback_merge() {
        let split = vec![
            resolved(CatalogKind::Nasa, "S b", "S", Some(3.0)),
            resolved(CatalogKind::Eu, "S b", "S", Some(30.0)),
            resolved(CatalogKind::Oec, "S b", "S", None),
        ];
        let out = merge_records(&split, &MatchingConfig::default());
        assert_eq!(out.records.len(), 3);
        assert!(out.records.iter().all(|e| e.merging_mismatch_flag == 1));
        assert!(out.decisions.iter().any(|d| d.kind == DecisionKind::PeriodSplit));

        let fallback = vec![
            resolved(CatalogKind::Nasa, "F b", "F", None),
            resolved(CatalogKind::Nasa, "F b.", "F", None),
        ];
        let out = merge_records(&fallback, &MatchingConfig::default());
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].merging_mismatch_flag, 2);
        assert_eq!(out.records[0].duplicate_catalog_flag, 1);
        assert_eq!(out.records[0].duplicate_names, "nasa: F b,nasa: F b.");
    }

    #[test]
    fn test_semi_major_axis_decides_when_periods_are_missing() {
        let with_axis = |catalog: CatalogKind, sma: f64| {
            let mut r = resolved(catalog, "K b", "K", None);
            r.measurements
                .set(Parameter::SemiMajorAxis, Measurement::new(sma, Some(0.001), Some(0.001), Some(catalog.tag())));
            r
        };

        let apart = vec![with_axis(CatalogKind::Nasa, 0.05), with_axis(CatalogKind::Eu, 0.5)];
        let out = merge_records(&apart, &MatchingConfig::default());
        assert_eq!(out.records.len(), 2);
        assert!(out.records.iter().all(|e| e.merging_mismatch_flag == 1));
        let split = out.decisions.iter().find(|d| d.kind == DecisionKind::PeriodSplit).unwrap();
        assert!(split.detail.contains(" a=Some(0.05)"));
        assert!(!split.detail.contains(" p="));

        let agreeing = vec![with_axis(CatalogKind::Nasa, 0.05), with_axis(CatalogKind::Eu, 0.051)];
        let out = merge_records(&agreeing, &MatchingConfig::default());
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].merging_mismatch_flag, 0);
        assert!(out.decisions.iter().all(|d| d.kind != DecisionKind::PeriodSplit));
    }

    #[test]
    fn test_status_disagreement_is_controversial() {
        let mut a = resolved(CatalogKind::Nasa, "X b", "X", Some(1.0));
        let b = resolved(CatalogKind::Eu, "X b", "X", Some(1.0));
        a.status = Status::Candidate;
        let out = merge_records(&[a, b], &MatchingConfig::default());
        assert_eq!(out.records[0].status, CONTROVERSIAL);
        assert_eq!(out.records[0].catalog_status, "nasa: CANDIDATE,eu: CONFIRMED");
    }

    #[test]
    fn test_provenance_conflict_prefers_name_match() {
        let a = resolved(CatalogKind::Nasa, "Y b", "Y", Some(1.0));
        let mut b = resolved(CatalogKind::Eu, "Y b", "Y", Some(1.0));
        if let Some(identity) = b.identity.as_mut() {
            identity.provenance = MainIdProvenance::Catalog(CatalogKind::Eu);
            identity.ra = Some(0.0);
        }
        let out = merge_records(&[b, a], &MatchingConfig::default());
        let entry = &out.records[0];
        assert_eq!(entry.main_id_provenance, "SIMBAD");
        assert_eq!(entry.main_id_ra, Some(344.3666));
        assert!(out.decisions.iter().any(|d| d.kind == DecisionKind::ProvenanceConflict));
    }

    #[test]
    fn test_angular_separation_uses_each_rows_identity() {
        let a = resolved(CatalogKind::Nasa, "Z b", "Z", Some(2.0));
        let mut b = resolved(CatalogKind::Eu, "Z b", "Z", Some(2.0));
        if let Some(identity) = b.identity.as_mut() {
            identity.angular_separation = Some(7.25);
        }
        let out = merge_records(&[a, b], &MatchingConfig::default());
        let entry = &out.records[0];
        assert_eq!(entry.angular_separation, "nasa: 0.000,eu: 7.250");
        assert_eq!(entry.angular_separation_flag, 1);
        assert!(out.decisions.iter().any(|d| d.kind == DecisionKind::AngularSeparation));
    }
}

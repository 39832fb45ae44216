//! Host-star resolution cascade.
//!
//! Each step sends one batch for every record still unresolved, so the number
//! of external calls is bounded by the number of steps. Steps run in a fixed
//! order from strongest to weakest evidence and a record's identity is never
//! replaced once set. Records nothing matches fall back to their own host.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, info, warn};

use crate::app::ports::{CoordinateQuery, ResolverHit, StarResolverPort};
use crate::constants::ARCSEC_PER_DEG;
use crate::domain::{CatalogKind, MainIdProvenance, PlanetRecord, ResolvedIdentity};
use crate::error::{ExoMercatError, Result};
use crate::metrics::ResolverMetrics;
use crate::pipeline::audit::{AuditStage, Decision, DecisionKind, StageOutput};
use crate::pipeline::processing::coordinates::separation;
use crate::pipeline::processing::names::{is_component_label, with_component, with_component_unspaced};

/// Resolution steps in cascade order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStep {
    HostWithComponent,
    AliasWithComponent,
    HostWithComponentUnspaced,
    AliasWithComponentUnspaced,
    BareHost,
    BareAlias,
    StarDbCoordinates,
    SurveyIdentifier,
    SurveyCoordinates,
}

impl ResolutionStep {
    pub const ALL: [ResolutionStep; 9] = [
        ResolutionStep::HostWithComponent,
        ResolutionStep::AliasWithComponent,
        ResolutionStep::HostWithComponentUnspaced,
        ResolutionStep::AliasWithComponentUnspaced,
        ResolutionStep::BareHost,
        ResolutionStep::BareAlias,
        ResolutionStep::StarDbCoordinates,
        ResolutionStep::SurveyIdentifier,
        ResolutionStep::SurveyCoordinates,
    ];

    pub fn provenance(&self) -> MainIdProvenance {
        match self {
            ResolutionStep::StarDbCoordinates => MainIdProvenance::StarDbCoordinate,
            ResolutionStep::SurveyIdentifier => MainIdProvenance::SurveyName,
            ResolutionStep::SurveyCoordinates => MainIdProvenance::SurveyCoordinate,
            _ => MainIdProvenance::StarDbName,
        }
    }

    /// Identifier strings this step tries for `record`, in preference order
    fn candidates(&self, record: &PlanetRecord) -> Vec<String> {
        let component = is_component_label(&record.binary);
        let names: Vec<String> = match self {
            ResolutionStep::HostWithComponent if component => vec![with_component(&record.host, &record.binary)],
            ResolutionStep::HostWithComponent => vec![record.host.clone()],
            ResolutionStep::AliasWithComponent if component => record
                .alias
                .iter()
                .map(|alias| with_component(alias, &record.binary))
                .collect(),
            ResolutionStep::AliasWithComponent => record.alias.clone(),
            ResolutionStep::HostWithComponentUnspaced if component => {
                vec![with_component_unspaced(&record.host, &record.binary)]
            }
            ResolutionStep::AliasWithComponentUnspaced if component => record
                .alias
                .iter()
                .map(|alias| with_component_unspaced(alias, &record.binary))
                .collect(),
            // Rows without a component label already tried these in the first two steps
            ResolutionStep::BareHost if component => vec![record.host.clone()],
            ResolutionStep::BareAlias if component => record.alias.clone(),
            ResolutionStep::SurveyIdentifier => std::iter::once(&record.host)
                .chain(record.alias.iter())
                .filter(|name| is_survey_identifier(name))
                .cloned()
                .collect(),
            _ => Vec::new(),
        };
        names
            .into_iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty() && name.is_ascii())
            .collect()
    }
}

impl fmt::Display for ResolutionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResolutionStep::HostWithComponent => "host+component",
            ResolutionStep::AliasWithComponent => "alias+component",
            ResolutionStep::HostWithComponentUnspaced => "host+component (unspaced)",
            ResolutionStep::AliasWithComponentUnspaced => "alias+component (unspaced)",
            ResolutionStep::BareHost => "bare host",
            ResolutionStep::BareAlias => "bare alias",
            ResolutionStep::StarDbCoordinates => "star database cone search",
            ResolutionStep::SurveyIdentifier => "survey identifier",
            ResolutionStep::SurveyCoordinates => "survey cone search",
        };
        f.write_str(label)
    }
}

/// `TIC 123456` style names the survey service knows natively
pub fn is_survey_identifier(name: &str) -> bool {
    let name = name.trim();
    match (name.get(..3), name.get(3..)) {
        (Some(prefix), Some(rest)) if prefix.eq_ignore_ascii_case("TIC") => {
            let digits = rest.trim_start_matches([' ', '-']);
            !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}

/// Survey lookups only apply to rows that are survey-native
fn is_survey_native(record: &PlanetRecord) -> bool {
    record.catalog == CatalogKind::Toi
        || is_survey_identifier(&record.host)
        || record.alias.iter().any(|alias| is_survey_identifier(alias))
}

/// Aborts when neither service answers
pub async fn probe_services(star_db: &dyn StarResolverPort, survey: &dyn StarResolverPort) -> Result<()> {
    let db = star_db.ping().await;
    let sv = survey.ping().await;
    match (&db, &sv) {
        (Err(a), Err(b)) => Err(ExoMercatError::ResolverUnavailable(format!(
            "{}: {}; {}: {}",
            star_db.service_name(),
            a,
            survey.service_name(),
            b
        ))),
        (Err(e), Ok(())) => {
            warn!("{} unreachable ({}), continuing with {}", star_db.service_name(), e, survey.service_name());
            Ok(())
        }
        (Ok(()), Err(e)) => {
            warn!("{} unreachable ({}), continuing with {}", survey.service_name(), e, star_db.service_name());
            Ok(())
        }
        (Ok(()), Ok(())) => Ok(()),
    }
}

/// Keeps the first hit per input key; extra distinct candidates are reported
fn first_hits(hits: Vec<ResolverHit>, step: ResolutionStep, decisions: &mut Vec<Decision>) -> BTreeMap<String, ResolverHit> {
    let mut first: BTreeMap<String, ResolverHit> = BTreeMap::new();
    let mut extra: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for hit in hits {
        match first.get(&hit.input_key) {
            Some(kept) if kept.main_id != hit.main_id => {
                extra.entry(hit.input_key.clone()).or_default().insert(hit.main_id);
            }
            Some(_) => {}
            None => {
                first.insert(hit.input_key.clone(), hit);
            }
        }
    }
    for (key, others) in extra {
        let kept = first.get(&key).map(|h| h.main_id.as_str()).unwrap_or_default();
        warn!("Ambiguous {} match for '{}': kept {}, also {:?}", step, key, kept, others);
        decisions.push(Decision::new(
            AuditStage::Resolution,
            DecisionKind::AmbiguousResolverMatch,
            key,
            format!(
                "{}: kept first candidate {}, ignored {}",
                step,
                kept,
                others.into_iter().collect::<Vec<_>>().join(", ")
            ),
        ));
    }
    first
}

/// Nearest hit per coordinate query; equidistant candidates are reported
fn nearest_hits(
    hits: Vec<ResolverHit>,
    queries: &[CoordinateQuery],
    step: ResolutionStep,
    decisions: &mut Vec<Decision>,
) -> BTreeMap<String, ResolverHit> {
    let positions: BTreeMap<&str, (f64, f64)> = queries.iter().map(|q| (q.key.as_str(), (q.ra, q.dec))).collect();
    let mut best: BTreeMap<String, (f64, ResolverHit)> = BTreeMap::new();
    let mut tied: BTreeSet<String> = BTreeSet::new();

    for hit in hits {
        let Some(&(ra, dec)) = positions.get(hit.input_key.as_str()) else {
            continue;
        };
        let Some(sep) = separation((Some(ra), Some(dec)), (hit.ra, hit.dec)) else {
            continue;
        };
        match best.get(&hit.input_key) {
            Some((current, kept)) if sep == *current && kept.main_id != hit.main_id => {
                tied.insert(hit.input_key.clone());
            }
            Some((current, _)) if sep >= *current => {}
            _ => {
                tied.remove(&hit.input_key);
                best.insert(hit.input_key.clone(), (sep, hit));
            }
        }
    }

    for key in tied {
        if let Some((_, kept)) = best.get(&key) {
            warn!("Equidistant {} candidates for query {}, kept {}", step, key, kept.main_id);
            decisions.push(Decision::new(
                AuditStage::Resolution,
                DecisionKind::AmbiguousResolverMatch,
                key,
                format!("{}: equidistant candidates, kept first {}", step, kept.main_id),
            ));
        }
    }

    best.into_iter().map(|(key, (_, hit))| (key, hit)).collect()
}

fn identity_from_hit(record: &PlanetRecord, hit: &ResolverHit, provenance: MainIdProvenance) -> ResolvedIdentity {
    ResolvedIdentity {
        main_id: hit.main_id.trim().to_string(),
        ra: hit.ra,
        dec: hit.dec,
        list_id: hit.cross_ids.clone(),
        provenance,
        angular_separation: separation((record.ra, record.dec), (hit.ra, hit.dec)).map(|deg| deg * ARCSEC_PER_DEG),
    }
}

/// Runs the full cascade then applies the catalog fallback to whatever is left
pub async fn resolve_identities(
    mut records: Vec<PlanetRecord>,
    star_db: &dyn StarResolverPort,
    survey: &dyn StarResolverPort,
    radius_deg: f64,
) -> StageOutput<PlanetRecord> {
    let mut decisions = Vec::new();

    for step in ResolutionStep::ALL {
        let pending: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.identity.is_none())
            .map(|(idx, _)| idx)
            .collect();
        if pending.is_empty() {
            break;
        }

        let resolved = match step {
            ResolutionStep::StarDbCoordinates | ResolutionStep::SurveyCoordinates => {
                let service = if step == ResolutionStep::StarDbCoordinates { star_db } else { survey };
                let queries: Vec<CoordinateQuery> = pending
                    .iter()
                    .filter(|idx| step == ResolutionStep::StarDbCoordinates || is_survey_native(&records[**idx]))
                    .filter_map(|idx| {
                        let record = &records[*idx];
                        Some(CoordinateQuery {
                            key: idx.to_string(),
                            ra: record.ra?,
                            dec: record.dec?,
                        })
                    })
                    .collect();
                if queries.is_empty() {
                    continue;
                }
                let hits = match service.resolve_by_coordinates(&queries, radius_deg).await {
                    Ok(hits) => hits,
                    Err(e) => {
                        warn!("{} batch failed on {}: {}; treating as no match", step, service.service_name(), e);
                        ResolverMetrics::record_batch_failure();
                        Vec::new()
                    }
                };
                ResolverMetrics::record_batch(queries.len());
                let nearest = nearest_hits(hits, &queries, step, &mut decisions);
                let mut assigned = 0usize;
                for (key, hit) in nearest {
                    if let Ok(idx) = key.parse::<usize>() {
                        let identity = identity_from_hit(&records[idx], &hit, step.provenance());
                        records[idx].identity = Some(identity);
                        assigned += 1;
                    }
                }
                assigned
            }
            _ => {
                let service = if step == ResolutionStep::SurveyIdentifier { survey } else { star_db };
                let candidates: Vec<(usize, Vec<String>)> = pending
                    .iter()
                    .map(|idx| (*idx, step.candidates(&records[*idx])))
                    .filter(|(_, names)| !names.is_empty())
                    .collect();
                let batch: Vec<String> = candidates
                    .iter()
                    .flat_map(|(_, names)| names.iter().cloned())
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect();
                if batch.is_empty() {
                    continue;
                }
                let hits = match service.resolve_by_name(&batch).await {
                    Ok(hits) => hits,
                    Err(e) => {
                        warn!("{} batch failed on {}: {}; treating as no match", step, service.service_name(), e);
                        ResolverMetrics::record_batch_failure();
                        Vec::new()
                    }
                };
                ResolverMetrics::record_batch(batch.len());
                let by_key = first_hits(hits, step, &mut decisions);
                let mut assigned = 0usize;
                for (idx, names) in candidates {
                    if let Some(hit) = names.iter().find_map(|name| by_key.get(name)) {
                        let identity = identity_from_hit(&records[idx], hit, step.provenance());
                        debug!("{} resolved to {} via {}", records[idx].describe(), identity.main_id, step);
                        records[idx].identity = Some(identity);
                        assigned += 1;
                    }
                }
                assigned
            }
        };

        ResolverMetrics::record_resolved(&step.to_string(), resolved);
        info!("Resolution step '{}': {} of {} pending records resolved", step, resolved, pending.len());
        decisions.push(Decision::new(
            AuditStage::Resolution,
            DecisionKind::ResolvedByStep,
            step.to_string(),
            format!("{} of {} pending records resolved", resolved, pending.len()),
        ));
    }

    for record in records.iter_mut().filter(|r| r.identity.is_none()) {
        record.identity = Some(ResolvedIdentity {
            main_id: record.host.clone(),
            ra: record.ra,
            dec: record.dec,
            list_id: Vec::new(),
            provenance: MainIdProvenance::Catalog(record.catalog),
            angular_separation: record.ra.and(record.dec).map(|_| 0.0),
        });
        ResolverMetrics::record_fallback();
        decisions.push(Decision::new(
            AuditStage::Resolution,
            DecisionKind::FallbackIdentity,
            record.host.clone(),
            format!("unresolved, using catalog host for {}", record.describe()),
        ));
    }

    StageOutput::new(records, decisions)
}

/// Post-resolution consistency checks between host strings and main_ids (log only)
pub fn check_main_id_consistency(records: &[PlanetRecord]) -> Vec<Decision> {
    let mut by_host: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut by_id: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for record in records {
        by_host.entry(record.host.as_str()).or_default().insert(record.main_id());
        by_id.entry(record.main_id()).or_default().insert(record.host.as_str());
    }

    let mut decisions = Vec::new();
    for (host, ids) in by_host.into_iter().filter(|(_, ids)| ids.len() > 1) {
        decisions.push(Decision::new(
            AuditStage::Resolution,
            DecisionKind::SameHostDifferentId,
            host,
            format!("resolved to {}", ids.into_iter().collect::<Vec<_>>().join(" | ")),
        ));
    }
    for (id, hosts) in by_id.into_iter().filter(|(_, hosts)| hosts.len() > 1) {
        decisions.push(Decision::new(
            AuditStage::Resolution,
            DecisionKind::SameIdDifferentHost,
            id,
            format!("reached from hosts {}", hosts.into_iter().collect::<Vec<_>>().join(" | ")),
        ));
    }
    decisions
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers from fixed tables and records every batch it receives
    struct MockResolver {
        names: BTreeMap<String, Vec<ResolverHit>>,
        cone: Vec<ResolverHit>,
        calls: Mutex<Vec<usize>>,
        name_batches: Mutex<Vec<Vec<String>>>,
        up: bool,
    }

    impl MockResolver {
        fn new(up: bool) -> Self {
            Self {
                names: BTreeMap::new(),
                cone: Vec::new(),
                calls: Mutex::new(Vec::new()),
                name_batches: Mutex::new(Vec::new()),
                up,
            }
        }

        fn with_name(mut self, key: &str, main_id: &str, ra: f64, dec: f64) -> Self {
            self.names.entry(key.to_string()).or_default().push(ResolverHit {
                input_key: key.to_string(),
                main_id: main_id.to_string(),
                ra: Some(ra),
                dec: Some(dec),
                cross_ids: vec![main_id.to_string()],
            });
            self
        }

        fn with_cone(mut self, main_id: &str, ra: f64, dec: f64) -> Self {
            self.cone.push(ResolverHit {
                input_key: String::new(),
                main_id: main_id.to_string(),
                ra: Some(ra),
                dec: Some(dec),
                cross_ids: Vec::new(),
            });
            self
        }
    }

    #[async_trait]
    impl StarResolverPort for MockResolver {
        fn service_name(&self) -> &str {
            "mock"
        }

        async fn ping(&self) -> std::result::Result<(), String> {
            if self.up {
                Ok(())
            } else {
                Err("down".to_string())
            }
        }

        async fn resolve_by_name(&self, identifiers: &[String]) -> std::result::Result<Vec<ResolverHit>, String> {
            self.calls.lock().unwrap().push(identifiers.len());
            self.name_batches.lock().unwrap().push(identifiers.to_vec());
            Ok(identifiers
                .iter()
                .filter_map(|id| self.names.get(id))
                .flatten()
                .cloned()
                .collect())
        }

        async fn resolve_by_coordinates(
            &self,
            queries: &[CoordinateQuery],
            radius_deg: f64,
        ) -> std::result::Result<Vec<ResolverHit>, String> {
            self.calls.lock().unwrap().push(queries.len());
            let mut hits = Vec::new();
            for query in queries {
                for star in &self.cone {
                    let sep = separation((Some(query.ra), Some(query.dec)), (star.ra, star.dec)).unwrap();
                    if sep <= radius_deg {
                        hits.push(ResolverHit {
                            input_key: query.key.clone(),
                            ..star.clone()
                        });
                    }
                }
            }
            Ok(hits)
        }
    }

    fn record(catalog: CatalogKind, host: &str, binary: &str) -> PlanetRecord {
        let mut r = PlanetRecord::new(catalog, &format!("{} b", host), host, "b");
        r.binary = binary.to_string();
        r.ra = Some(10.0);
        r.dec = Some(20.0);
        r
    }

    #[tokio::test]
    async fn test_cascade_prefers_component_name() {
        let db = MockResolver::new(true)
            .with_name("HD 41004 B", "HD 41004B", 10.0, 20.0)
            .with_name("HD 41004", "HD 41004", 10.0, 20.0);
        let survey = MockResolver::new(true);

        let out = resolve_identities(vec![record(CatalogKind::Eu, "HD 41004", "B")], &db, &survey, 1.0 / 3600.0).await;
        let identity = out.records[0].identity.as_ref().unwrap();
        assert_eq!(identity.main_id, "HD 41004B");
        assert_eq!(identity.provenance, MainIdProvenance::StarDbName);
        assert_eq!(identity.angular_separation, Some(0.0));
    }

    #[tokio::test]
    async fn test_name_steps_run_in_order_until_first_match() {
        let db = MockResolver::new(true).with_name("ALIAS 1B", "ID ALIAS 1B", 10.0, 20.0);
        let survey = MockResolver::new(true);
        let mut r = record(CatalogKind::Eu, "Host 1", "B");
        r.alias = vec!["ALIAS 1".to_string()];

        let out = resolve_identities(vec![r], &db, &survey, 1.0 / 3600.0).await;
        let batches = db.name_batches.lock().unwrap().clone();
        assert_eq!(
            batches,
            vec![
                vec!["Host 1 B".to_string()],
                vec!["ALIAS 1 B".to_string()],
                vec!["Host 1B".to_string()],
                vec!["ALIAS 1B".to_string()],
            ]
        );
        assert_eq!(out.records[0].main_id(), "ID ALIAS 1B");
        assert_eq!(out.records[0].provenance(), Some(MainIdProvenance::StarDbName));
        // nothing left pending, so the bare-name and coordinate steps never query
        assert_eq!(db.calls.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_bare_names_follow_component_forms() {
        let db = MockResolver::new(true).with_name("ALIAS 2", "ID ALIAS 2", 10.0, 20.0);
        let survey = MockResolver::new(true);
        let mut r = record(CatalogKind::Eu, "Host 2", "A");
        r.alias = vec!["ALIAS 2".to_string()];

        let out = resolve_identities(vec![r], &db, &survey, 1.0 / 3600.0).await;
        let batches = db.name_batches.lock().unwrap().clone();
        assert_eq!(batches.len(), 6);
        assert_eq!(batches[4], vec!["Host 2".to_string()]);
        assert_eq!(batches[5], vec!["ALIAS 2".to_string()]);
        assert_eq!(out.records[0].main_id(), "ID ALIAS 2");
        assert_eq!(out.records[0].provenance(), Some(MainIdProvenance::StarDbName));
    }

    #[tokio::test]
    async fn test_one_batch_per_step_and_fallback() {
        let db = MockResolver::new(true).with_name("Kepler-9", "Kepler-9", 10.0, 20.0);
        let survey = MockResolver::new(true);
        let records = vec![
            record(CatalogKind::Nasa, "Kepler-9", ""),
            record(CatalogKind::Eu, "Kepler-9", ""),
            record(CatalogKind::Oec, "Nowhere-1", ""),
        ];

        let out = resolve_identities(records, &db, &survey, 1.0 / 3600.0).await;
        // both Kepler-9 rows share one query string
        assert_eq!(db.calls.lock().unwrap()[0], 2);
        assert!(db.calls.lock().unwrap().len() <= ResolutionStep::ALL.len());

        let fallback = out.records[2].identity.as_ref().unwrap();
        assert_eq!(fallback.main_id, "Nowhere-1");
        assert_eq!(fallback.provenance, MainIdProvenance::Catalog(CatalogKind::Oec));
        assert!(out.decisions.iter().any(|d| d.kind == DecisionKind::FallbackIdentity));
    }

    #[tokio::test]
    async fn test_non_ascii_names_fall_through_to_coordinates() {
        let db = MockResolver::new(true)
            .with_name("Gliese 581", "GJ 581", 10.0, 20.0)
            .with_cone("GJ 581", 10.0, 20.0);
        let survey = MockResolver::new(true);
        let mut r = record(CatalogKind::Oec, "Gliese 581", "");
        r.host = "Glièse 581".to_string();

        let out = resolve_identities(vec![r], &db, &survey, 1.0 / 3600.0).await;
        let identity = out.records[0].identity.as_ref().unwrap();
        assert_eq!(identity.main_id, "GJ 581");
        assert_eq!(identity.provenance, MainIdProvenance::StarDbCoordinate);
    }

    #[tokio::test]
    async fn test_single_cone_lookup_returns_nearest_star() {
        let db = MockResolver::new(true)
            .with_cone("Far", 10.0 + 1.5 / 3600.0, 20.0)
            .with_cone("Near", 10.0 + 0.5 / 3600.0, 20.0);

        let hit = db.resolve_by_coordinate(10.0, 20.0, 2.0 / 3600.0).await.unwrap();
        assert_eq!(hit.unwrap().main_id, "Near");

        let miss = db.resolve_by_coordinate(11.0, 20.0, 2.0 / 3600.0).await.unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn test_ambiguous_name_keeps_first_and_warns() {
        let db = MockResolver::new(true)
            .with_name("Twin", "Twin A", 10.0, 20.0)
            .with_name("Twin", "Twin B", 10.0, 20.0);
        let survey = MockResolver::new(true);

        let out = resolve_identities(vec![record(CatalogKind::Nasa, "Twin", "")], &db, &survey, 1.0 / 3600.0).await;
        assert_eq!(out.records[0].main_id(), "Twin A");
        assert!(out.decisions.iter().any(|d| d.kind == DecisionKind::AmbiguousResolverMatch));
    }

    #[tokio::test]
    async fn test_survey_steps_only_for_survey_native_rows() {
        let db = MockResolver::new(true);
        let survey = MockResolver::new(true)
            .with_name("TIC 12345", "TIC 12345", 10.0, 20.0)
            .with_cone("TIC 99", 10.0, 20.0);

        let records = vec![
            record(CatalogKind::Toi, "TIC 12345", ""),
            record(CatalogKind::Toi, "TOI-9", ""),
            record(CatalogKind::Eu, "Plain", ""),
        ];
        let out = resolve_identities(records, &db, &survey, 1.0 / 3600.0).await;
        assert_eq!(out.records[0].provenance(), Some(MainIdProvenance::SurveyName));
        assert_eq!(out.records[1].provenance(), Some(MainIdProvenance::SurveyCoordinate));
        assert_eq!(out.records[1].main_id(), "TIC 99");
        assert_eq!(out.records[2].provenance(), Some(MainIdProvenance::Catalog(CatalogKind::Eu)));
    }

    #[tokio::test]
    async fn test_probe_fails_only_when_both_down() {
        assert!(probe_services(&MockResolver::new(true), &MockResolver::new(false)).await.is_ok());
        assert!(matches!(
            probe_services(&MockResolver::new(false), &MockResolver::new(false)).await,
            Err(ExoMercatError::ResolverUnavailable(_))
        ));
    }

    #[test]
    fn test_survey_identifier_detection() {
        assert!(is_survey_identifier("TIC 12345"));
        assert!(is_survey_identifier("TIC-12345"));
        assert!(!is_survey_identifier("TOI-12"));
        assert!(!is_survey_identifier("TIC"));
    }

    #[test]
    fn test_main_id_consistency_checks() {
        let mut a = record(CatalogKind::Nasa, "Host", "");
        a.identity = Some(ResolvedIdentity {
            main_id: "Id 1".to_string(),
            ra: None,
            dec: None,
            list_id: Vec::new(),
            provenance: MainIdProvenance::StarDbName,
            angular_separation: None,
        });
        let mut b = a.clone();
        b.identity.as_mut().unwrap().main_id = "Id 2".to_string();

        let decisions = check_main_id_consistency(&[a, b]);
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].kind, DecisionKind::SameHostDifferentId);
    }
}

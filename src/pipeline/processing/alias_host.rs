//! Alias-as-host consolidation.
//!
//! Catalogs sometimes file a planet under a host name that another catalog
//! lists only as an alias (e.g. `HD 217014` vs `51 Peg`). Before any keyed
//! reconciliation, such rows adopt the host of the catalog that owns the alias.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::PlanetRecord;
use crate::pipeline::audit::{AuditStage, Decision, DecisionKind, StageOutput};

pub fn consolidate_alias_hosts(mut records: Vec<PlanetRecord>) -> StageOutput<PlanetRecord> {
    let mut decisions = Vec::new();

    let hosts: BTreeSet<String> = records.iter().map(|r| r.host.clone()).collect();

    // alias -> hosts listing it
    let mut owners: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for record in &records {
        for alias in &record.alias {
            if alias != &record.host {
                owners.entry(alias.as_str()).or_default().insert(record.host.as_str());
            }
        }
    }

    let mut renames: BTreeMap<String, String> = BTreeMap::new();
    for host in &hosts {
        let Some(candidates) = owners.get(host.as_str()) else {
            continue;
        };
        let candidates: Vec<&str> = candidates.iter().copied().filter(|c| *c != host).collect();
        match candidates.as_slice() {
            [] => {}
            [owner] => {
                renames.insert(host.clone(), owner.to_string());
            }
            many => decisions.push(Decision::new(
                AuditStage::AliasAsHost,
                DecisionKind::AmbiguousAlias,
                host.clone(),
                format!("listed as alias by several hosts: {}", many.join(", ")),
            )),
        }
    }

    // Mutual aliasing: keep the lexicographically smaller host
    let mutual: Vec<String> = renames
        .iter()
        .filter(|(from, to)| renames.get(*to).map_or(false, |back| back == *from) && from.as_str() < to.as_str())
        .map(|(from, _)| from.clone())
        .collect();
    for host in mutual {
        renames.remove(&host);
    }

    // Chains are not followed; leave them for review
    let chained: Vec<String> = renames
        .iter()
        .filter(|(_, to)| renames.contains_key(*to))
        .map(|(from, _)| from.clone())
        .collect();
    for host in chained {
        if let Some(to) = renames.remove(&host) {
            decisions.push(Decision::new(
                AuditStage::AliasAsHost,
                DecisionKind::AmbiguousAlias,
                host,
                format!("alias of {} which is itself an alias; not renamed", to),
            ));
        }
    }

    for (from, to) in &renames {
        let affected: Vec<String> = records
            .iter()
            .filter(|r| &r.host == from)
            .map(|r| r.describe())
            .collect();
        decisions.push(Decision::new(
            AuditStage::AliasAsHost,
            DecisionKind::HostReplacedByAlias,
            from.clone(),
            format!("host -> {} for {}", to, affected.join("; ")),
        ));
    }

    for record in records.iter_mut() {
        if let Some(to) = renames.get(&record.host) {
            let old = std::mem::replace(&mut record.host, to.clone());
            if !record.alias.contains(&old) {
                record.alias.push(old);
            }
        }
    }

    StageOutput::new(records, decisions)
}

use crate::config::OverrideRules;
use crate::domain::PlanetRecord;
use crate::pipeline::audit::{AuditStage, Decision, DecisionKind, StageOutput};

/// Applies manual corrections; rules are keyed by the catalog's own spelling
pub fn apply_overrides(records: Vec<PlanetRecord>, rules: &OverrideRules) -> StageOutput<PlanetRecord> {
    if rules.is_empty() {
        return StageOutput::new(records, Vec::new());
    }

    let mut decisions = Vec::new();
    let mut kept = Vec::with_capacity(records.len());

    for mut record in records {
        let key = record.describe();
        if rules.drop.iter().any(|name| name == &record.catalog_name) {
            decisions.push(Decision::new(AuditStage::Overrides, DecisionKind::OverrideApplied, key, "dropped"));
            continue;
        }
        if let Some(name) = rules.name.get(&record.catalog_name) {
            decisions.push(Decision::new(
                AuditStage::Overrides,
                DecisionKind::OverrideApplied,
                key.clone(),
                format!("name {} -> {}", record.name, name),
            ));
            record.name = name.clone();
        }
        if let Some(host) = rules.host.get(&record.catalog_host) {
            decisions.push(Decision::new(
                AuditStage::Overrides,
                DecisionKind::OverrideApplied,
                key.clone(),
                format!("host {} -> {}", record.host, host),
            ));
            record.host = host.clone();
        }
        if let Some(binary) = rules.binary.get(&record.catalog_name) {
            decisions.push(Decision::new(
                AuditStage::Overrides,
                DecisionKind::OverrideApplied,
                key.clone(),
                format!("binary '{}' -> '{}'", record.binary, binary),
            ));
            record.binary = binary.clone();
        }
        if let Some(letter) = rules.letter.get(&record.catalog_name) {
            decisions.push(Decision::new(
                AuditStage::Overrides,
                DecisionKind::OverrideApplied,
                key,
                format!("letter '{}' -> '{}'", record.letter, letter),
            ));
            record.letter = letter.clone();
        }
        kept.push(record);
    }

    StageOutput::new(kept, decisions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CatalogKind;

    #[test]
    fn test_overrides_rename_and_drop() {
        let mut rules = OverrideRules::default();
        rules.drop.push("Bogus b".to_string());
        rules.host.insert("KOI-7".to_string(), "Kepler-4".to_string());
        rules.binary.insert("KOI-7 b".to_string(), "A".to_string());

        let records = vec![
            PlanetRecord::new(CatalogKind::Eu, "Bogus b", "Bogus", "b"),
            PlanetRecord::new(CatalogKind::Koi, "KOI-7 b", "KOI-7", "b"),
        ];

        let out = apply_overrides(records, &rules);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].host, "Kepler-4");
        assert_eq!(out.records[0].catalog_host, "KOI-7");
        assert_eq!(out.records[0].binary, "A");
        assert_eq!(out.decisions.len(), 3);
    }

    #[test]
    fn test_empty_rules_are_a_no_op() {
        let records = vec![PlanetRecord::new(CatalogKind::Nasa, "X b", "X", "b")];
        let out = apply_overrides(records.clone(), &OverrideRules::default());
        assert_eq!(out.records, records);
        assert!(out.decisions.is_empty());
    }
}

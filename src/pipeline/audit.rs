//! Typed decision records emitted by every reconciliation and merge stage.
//!
//! Stages never write files themselves; they return decisions alongside the
//! transformed records and the audit adapter renders them per concern.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Concern a decision belongs to; each renders to its own audit file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AuditStage {
    Overrides,
    AliasAsHost,
    Resolution,
    BinaryMismatch,
    CoordinateCheck,
    Grouping,
    Merging,
    PostProcessing,
}

impl AuditStage {
    pub const ALL: [AuditStage; 8] = [
        AuditStage::Overrides,
        AuditStage::AliasAsHost,
        AuditStage::Resolution,
        AuditStage::BinaryMismatch,
        AuditStage::CoordinateCheck,
        AuditStage::Grouping,
        AuditStage::Merging,
        AuditStage::PostProcessing,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            AuditStage::Overrides => "overrides.log",
            AuditStage::AliasAsHost => "alias_as_host.log",
            AuditStage::Resolution => "main_id.log",
            AuditStage::BinaryMismatch => "binary_mismatch.log",
            AuditStage::CoordinateCheck => "coordinate_check.log",
            AuditStage::Grouping => "grouping.log",
            AuditStage::Merging => "merging.log",
            AuditStage::PostProcessing => "post_processing.log",
        }
    }
}

/// What kind of judgment was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionKind {
    OverrideApplied,
    HostReplacedByAlias,
    AmbiguousAlias,
    ResolvedByStep,
    AmbiguousResolverMatch,
    FallbackIdentity,
    SameHostDifferentId,
    SameIdDifferentHost,
    WeakLabelsUnified,
    DefiniteLabelPropagated,
    CoordinateToleranceExceeded,
    BinaryConflict,
    NearestNeighbourRepair,
    MissedPotentialBinary,
    BinaryFlagChanged,
    LetterRepaired,
    BrownDwarfLetter,
    LetterDisagreement,
    PeriodSplit,
    FallbackMerge,
    DuplicateCatalog,
    ProvenanceConflict,
    CoordinateMismatch,
    AngularSeparation,
    BrownDwarfRemoved,
}

/// One audit line: kind, group key, and the inputs/outputs that justify it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub stage: AuditStage,
    pub kind: DecisionKind,
    pub key: String,
    pub detail: String,
}

impl Decision {
    pub fn new(stage: AuditStage, kind: DecisionKind, key: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            key: key.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}: {}", self.kind, self.key, self.detail)
    }
}

/// Records plus the decisions a stage made about them
#[derive(Debug, Clone, Default)]
pub struct StageOutput<T> {
    pub records: Vec<T>,
    pub decisions: Vec<Decision>,
}

impl<T> StageOutput<T> {
    pub fn new(records: Vec<T>, decisions: Vec<Decision>) -> Self {
        Self { records, decisions }
    }
}

/// Decisions accumulated over a whole run
#[derive(Debug, Clone, Default)]
pub struct AuditTrail {
    decisions: Vec<Decision>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, decisions: impl IntoIterator<Item = Decision>) {
        self.decisions.extend(decisions);
    }

    /// Absorbs a stage's decisions and hands back its records
    pub fn take<T>(&mut self, output: StageOutput<T>) -> Vec<T> {
        self.decisions.extend(output.decisions);
        output.records
    }

    pub fn for_stage(&self, stage: AuditStage) -> impl Iterator<Item = &Decision> {
        self.decisions.iter().filter(move |d| d.stage == stage)
    }

    pub fn count(&self, kind: DecisionKind) -> usize {
        self.decisions.iter().filter(|d| d.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Decision> {
        self.decisions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trail_filters_by_stage() {
        let mut trail = AuditTrail::new();
        let records = trail.take(StageOutput::new(
            vec![1, 2, 3],
            vec![
                Decision::new(AuditStage::Grouping, DecisionKind::LetterRepaired, "k", "d"),
                Decision::new(AuditStage::Merging, DecisionKind::FallbackMerge, "k", "d"),
            ],
        ));

        assert_eq!(records, vec![1, 2, 3]);
        assert_eq!(trail.for_stage(AuditStage::Grouping).count(), 1);
        assert_eq!(trail.count(DecisionKind::FallbackMerge), 1);
        assert_eq!(trail.len(), 2);
    }

    #[test]
    fn test_stage_file_names_are_distinct() {
        let mut names: Vec<_> = AuditStage::ALL.iter().map(|s| s.file_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), AuditStage::ALL.len());
    }
}

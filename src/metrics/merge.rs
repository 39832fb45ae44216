//! Reconciliation, merge and post-processing metrics

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};
use crate::pipeline::audit::{AuditTrail, DecisionKind};

pub struct MergeMetrics;

impl MergeMetrics {
    /// Counts decisions of each kind from a finished run
    pub fn record_decisions(trail: &AuditTrail) {
        for decision in trail.iter() {
            ::metrics::counter!(phase_metric!(counter, "merge", "decisions"), "kind" => format!("{:?}", decision.kind))
                .increment(1);
        }
        let conflicts = trail.count(DecisionKind::BinaryConflict);
        ::metrics::counter!(phase_metric!(counter, "merge", "binary_conflicts")).increment(conflicts as u64);
    }

    pub fn record_entries(written: usize, removed: usize, carried_forward: usize) {
        ::metrics::counter!(phase_metric!(counter, "merge", "entries")).increment(written as u64);
        ::metrics::counter!(phase_metric!(counter, "merge", "brown_dwarfs_removed")).increment(removed as u64);
        ::metrics::counter!(phase_metric!(counter, "merge", "rows_unchanged")).increment(carried_forward as u64);
    }

    pub fn record_duration(seconds: f64) {
        ::metrics::histogram!(phase_metric!(histogram, "merge", "run_duration_seconds")).record(seconds);
    }
}

impl PhaseMetrics for MergeMetrics {
    fn register_metrics() {
        let _ = ::metrics::counter!(phase_metric!(counter, "merge", "decisions"));
        let _ = ::metrics::counter!(phase_metric!(counter, "merge", "entries"));
        let _ = ::metrics::counter!(phase_metric!(counter, "merge", "brown_dwarfs_removed"));
        let _ = ::metrics::counter!(phase_metric!(counter, "merge", "rows_unchanged"));
        let _ = ::metrics::counter!(phase_metric!(counter, "merge", "binary_conflicts"));
        let _ = ::metrics::histogram!(phase_metric!(histogram, "merge", "run_duration_seconds"));
    }

    fn phase_name() -> &'static str {
        "merge"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "merge", "decisions"),
                metric_type: MetricType::Counter,
                help: "Audit decisions, labelled by kind",
            },
            MetricDoc {
                name: phase_metric!(counter, "merge", "binary_conflicts"),
                metric_type: MetricType::Counter,
                help: "Groups with several definite binary labels",
            },
            MetricDoc {
                name: phase_metric!(counter, "merge", "entries"),
                metric_type: MetricType::Counter,
                help: "Merged entries written",
            },
            MetricDoc {
                name: phase_metric!(counter, "merge", "brown_dwarfs_removed"),
                metric_type: MetricType::Counter,
                help: "Entries dropped by the brown-dwarf mass filter",
            },
            MetricDoc {
                name: phase_metric!(counter, "merge", "rows_unchanged"),
                metric_type: MetricType::Counter,
                help: "Rows whose row_update was carried from the previous run",
            },
            MetricDoc {
                name: phase_metric!(histogram, "merge", "run_duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Wall time of a full curation run",
            },
        ]
    }
}

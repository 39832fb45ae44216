//! Resolver phase metrics: external batches, per-step hits, fallbacks.

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct ResolverMetrics;

impl ResolverMetrics {
    pub fn record_batch(size: usize) {
        ::metrics::counter!(phase_metric!(counter, "resolver", "batches")).increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "resolver", "batch_size")).record(size as f64);
    }

    pub fn record_batch_failure() {
        ::metrics::counter!(phase_metric!(counter, "resolver", "batch_failures")).increment(1);
    }

    pub fn record_resolved(step: &str, count: usize) {
        ::metrics::counter!(phase_metric!(counter, "resolver", "resolved"), "step" => step.to_string())
            .increment(count as u64);
    }

    pub fn record_fallback() {
        ::metrics::counter!(phase_metric!(counter, "resolver", "fallbacks")).increment(1);
    }
}

impl PhaseMetrics for ResolverMetrics {
    fn register_metrics() {
        let _ = ::metrics::counter!(phase_metric!(counter, "resolver", "batches"));
        let _ = ::metrics::counter!(phase_metric!(counter, "resolver", "batch_failures"));
        let _ = ::metrics::counter!(phase_metric!(counter, "resolver", "fallbacks"));
        let _ = ::metrics::histogram!(phase_metric!(histogram, "resolver", "batch_size"));
    }

    fn phase_name() -> &'static str {
        "resolver"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "resolver", "batches"),
                metric_type: MetricType::Counter,
                help: "Batched queries sent to resolver services",
            },
            MetricDoc {
                name: phase_metric!(counter, "resolver", "batch_failures"),
                metric_type: MetricType::Counter,
                help: "Batches that failed and were treated as no match",
            },
            MetricDoc {
                name: phase_metric!(counter, "resolver", "resolved"),
                metric_type: MetricType::Counter,
                help: "Records resolved, labelled by cascade step",
            },
            MetricDoc {
                name: phase_metric!(counter, "resolver", "fallbacks"),
                metric_type: MetricType::Counter,
                help: "Records left unresolved and given their catalog host as main_id",
            },
            MetricDoc {
                name: phase_metric!(histogram, "resolver", "batch_size"),
                metric_type: MetricType::Histogram,
                help: "Identifiers or positions per batch",
            },
        ]
    }
}

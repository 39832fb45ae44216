//! Registers every phase's metrics and detects name clashes.

use crate::metrics::{MetricDoc, PhaseMetrics};
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub fn register_all_metrics() {
    let mut all_metrics = HashMap::new();

    register_phase_metrics::<super::ingest::IngestMetrics>(&mut all_metrics);
    register_phase_metrics::<super::resolver::ResolverMetrics>(&mut all_metrics);
    register_phase_metrics::<super::merge::MergeMetrics>(&mut all_metrics);

    info!("Registered {} metrics across all phases", all_metrics.len());
}

fn register_phase_metrics<T: PhaseMetrics>(all_metrics: &mut HashMap<&'static str, (&'static str, MetricDoc)>) {
    T::register_metrics();
    let phase_name = T::phase_name();

    for doc in T::metrics_documentation() {
        if phase_of(doc.name) != phase_name {
            warn!("Metric '{}' is documented by phase '{}' but named for '{}'", doc.name, phase_name, phase_of(doc.name));
        }
        if let Some((owner, _)) = all_metrics.get(doc.name) {
            warn!("Metric '{}' defined by both '{}' and '{}'", doc.name, owner, phase_name);
            continue;
        }
        debug!("{} ({:?}): {}", doc.name, doc.metric_type, doc.help);
        all_metrics.insert(doc.name, (phase_name, doc));
    }
}

/// Phase part of a metric name (`exo_merge_entries_total` -> `merge`)
pub fn phase_of(metric_name: &str) -> &str {
    metric_name
        .strip_prefix("exo_")
        .and_then(|rest| rest.split('_').next())
        .unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{IngestMetrics, MergeMetrics, MetricType, ResolverMetrics};
    use std::collections::HashSet;

    #[test]
    fn test_phase_of() {
        assert_eq!(phase_of("exo_merge_entries_total"), "merge");
        assert_eq!(phase_of("exo_resolver_batch_size"), "resolver");
        assert_eq!(phase_of("process_cpu_seconds_total"), "unknown");
    }

    #[test]
    fn test_documented_names_are_unique_and_prefixed() {
        let docs: Vec<MetricDoc> = IngestMetrics::metrics_documentation()
            .into_iter()
            .chain(ResolverMetrics::metrics_documentation())
            .chain(MergeMetrics::metrics_documentation())
            .collect();
        let names: HashSet<&str> = docs.iter().map(|d| d.name).collect();
        assert_eq!(names.len(), docs.len());
        assert!(docs.iter().all(|d| phase_of(d.name) != "unknown"));
    }

    #[test]
    fn test_documented_names_match_their_phase() {
        for doc in IngestMetrics::metrics_documentation() {
            assert_eq!(phase_of(doc.name), IngestMetrics::phase_name());
        }
        for doc in ResolverMetrics::metrics_documentation() {
            assert_eq!(phase_of(doc.name), ResolverMetrics::phase_name());
        }
        for doc in MergeMetrics::metrics_documentation() {
            assert_eq!(phase_of(doc.name), MergeMetrics::phase_name());
        }
    }

    #[test]
    fn test_merge_counters_render_before_first_run() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        ::metrics::with_local_recorder(&recorder, MergeMetrics::register_metrics);
        let rendered = handle.render();

        let docs = MergeMetrics::metrics_documentation();
        for doc in docs.iter().filter(|d| matches!(d.metric_type, MetricType::Counter)) {
            assert!(rendered.contains(doc.name), "{} missing from snapshot", doc.name);
        }
    }
}

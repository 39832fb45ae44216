use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

/// Catalog snapshot loading and normalization
pub struct IngestMetrics;

impl IngestMetrics {
    pub fn record_catalog_loaded(catalog: &str, rows: usize, records: usize) {
        ::metrics::counter!(phase_metric!(counter, "ingest", "rows_read"), "catalog" => catalog.to_string())
            .increment(rows as u64);
        ::metrics::counter!(phase_metric!(counter, "ingest", "records_normalized"), "catalog" => catalog.to_string())
            .increment(records as u64);
    }

    pub fn record_snapshot_fallback() {
        ::metrics::counter!(phase_metric!(counter, "ingest", "snapshot_fallbacks")).increment(1);
    }
}

impl PhaseMetrics for IngestMetrics {
    fn register_metrics() {
        let _ = ::metrics::counter!(phase_metric!(counter, "ingest", "snapshot_fallbacks"));
    }

    fn phase_name() -> &'static str {
        "ingest"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "ingest", "rows_read"),
                metric_type: MetricType::Counter,
                help: "Rows read from catalog snapshots",
            },
            MetricDoc {
                name: phase_metric!(counter, "ingest", "records_normalized"),
                metric_type: MetricType::Counter,
                help: "Rows that normalized into planet records",
            },
            MetricDoc {
                name: phase_metric!(counter, "ingest", "snapshot_fallbacks"),
                metric_type: MetricType::Counter,
                help: "Catalogs read from an earlier dated snapshot",
            },
        ]
    }
}

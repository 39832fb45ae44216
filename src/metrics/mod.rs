//! Per-phase pipeline metrics.
//!
//! Each phase owns its metric names in a submodule; all of them go through the
//! `phase_metric!` macro so the naming convention stays uniform. A Prometheus
//! recorder is installed in-process and its rendered snapshot is written next
//! to the run's audit files.

pub mod ingest;
pub mod merge;
pub mod registry;
pub mod resolver;

pub use ingest::IngestMetrics;
pub use merge::MergeMetrics;
pub use resolver::ResolverMetrics;

use std::path::Path;
use std::sync::{Once, OnceLock};
use tracing::{info, warn};

use crate::error::Result;

static INIT: Once = Once::new();
static HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();

/// Installs the Prometheus recorder and registers every phase's metrics. Idempotent.
pub fn init_metrics() {
    INIT.call_once(|| match metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if HANDLE.set(handle).is_err() {
                warn!("Prometheus handle was already set");
            }
            registry::register_all_metrics();
            info!("Prometheus recorder installed");
        }
        Err(e) => warn!("Failed to install Prometheus recorder: {}", e),
    });
}

/// Current snapshot in Prometheus text format, if the recorder is installed
pub fn render_metrics() -> Option<String> {
    HANDLE.get().map(|handle| handle.render())
}

/// Writes the snapshot to `path`; a missing recorder is not an error
pub fn write_snapshot(path: &Path) -> Result<bool> {
    let Some(text) = render_metrics() else {
        return Ok(false);
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    Ok(true)
}

/// Implemented by each phase's metrics collection
pub trait PhaseMetrics {
    /// Touches every metric so it appears in the snapshot even at zero
    fn register_metrics();

    fn phase_name() -> &'static str;

    fn metrics_documentation() -> Vec<MetricDoc>;
}

#[derive(Debug, Clone)]
pub struct MetricDoc {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub help: &'static str,
}

#[derive(Debug, Clone)]
pub enum MetricType {
    Counter,
    Histogram,
}

/// `exo_{phase}_{name}_total` for counters, `exo_{phase}_{name}` otherwise
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("exo_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("exo_", $phase, "_", $name)
    };
}

pub(crate) use phase_metric;

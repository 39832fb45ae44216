use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

use crate::app::ports::{AuditOutputPort, CatalogOutputPort, StarResolverPort};
use crate::config::{OverrideRules, PipelineConfig};
use crate::domain::{MergedEntry, PlanetRecord};
use crate::metrics::MergeMetrics;
use crate::pipeline::audit::{AuditTrail, DecisionKind};
use crate::pipeline::processing::alias_host::consolidate_alias_hosts;
use crate::pipeline::processing::binary::{find_missed_binaries, reconcile_binaries, BinaryKey};
use crate::pipeline::processing::grouping::repair_letters;
use crate::pipeline::processing::merge::merge_records;
use crate::pipeline::processing::overrides::apply_overrides;
use crate::pipeline::processing::postprocess::{
    assign_canonical_names, enforce_output_invariants, remove_brown_dwarfs, sort_entries,
};
use crate::pipeline::processing::resolve::{check_main_id_consistency, probe_services, resolve_identities};
use crate::pipeline::table::assign_row_updates;

/// In-memory result of the curation stages, before anything is written
#[derive(Debug, Clone)]
pub struct Curated {
    pub entries: Vec<MergedEntry>,
    pub removed: Vec<MergedEntry>,
    pub trail: AuditTrail,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub input_records: usize,
    pub entries: usize,
    pub brown_dwarfs_removed: usize,
    pub rows_unchanged: usize,
    pub decisions: usize,
}

/// Full merge run: resolution, reconciliation, merge, post-processing and output
pub struct CurateUseCase {
    star_db: Arc<dyn StarResolverPort>,
    survey: Arc<dyn StarResolverPort>,
    output: Arc<dyn CatalogOutputPort>,
    audit: Arc<dyn AuditOutputPort>,
    config: PipelineConfig,
    overrides: OverrideRules,
    run_id: String,
}

impl CurateUseCase {
    pub fn new(
        star_db: Arc<dyn StarResolverPort>,
        survey: Arc<dyn StarResolverPort>,
        output: Arc<dyn CatalogOutputPort>,
        audit: Arc<dyn AuditOutputPort>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            star_db,
            survey,
            output,
            audit,
            config,
            overrides: OverrideRules::default(),
            run_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_overrides(mut self, overrides: OverrideRules) -> Self {
        self.overrides = overrides;
        self
    }

    /// Reuse an id minted by the caller so the audit files and logs agree
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Every stage from overrides to the sorted, invariant-checked table
    #[instrument(skip(self, records), fields(run_id = %self.run_id, records = records.len()))]
    pub async fn curate(&self, records: Vec<PlanetRecord>) -> Result<Curated> {
        let matching = &self.config.matching;
        let mut trail = AuditTrail::new();

        let records = trail.take(apply_overrides(records, &self.overrides));
        let records = trail.take(consolidate_alias_hosts(records));
        let records = trail.take(reconcile_binaries(records, BinaryKey::Host, matching.binary_tolerance_deg()));

        probe_services(self.star_db.as_ref(), self.survey.as_ref()).await?;
        let records = trail.take(
            resolve_identities(
                records,
                self.star_db.as_ref(),
                self.survey.as_ref(),
                self.config.resolver.search_radius_deg(),
            )
            .await,
        );
        trail.extend(check_main_id_consistency(&records));

        let records = trail.take(reconcile_binaries(records, BinaryKey::MainId, matching.binary_tolerance_deg()));
        trail.extend(find_missed_binaries(&records));
        let conflicts = trail.count(DecisionKind::BinaryConflict);
        if conflicts > 0 {
            warn!("{} binary label conflicts need manual review", conflicts);
        }

        let records = trail.take(repair_letters(records, matching.period_tolerance));
        let mut entries = trail.take(merge_records(&records, matching));
        info!("Merged {} records into {} entries", records.len(), entries.len());
        assign_canonical_names(&mut entries);

        let mut split = remove_brown_dwarfs(entries, self.config.brown_dwarf.mass_limit);
        let mut entries = trail.take(split.kept);
        for part in [&mut entries, &mut split.removed] {
            enforce_output_invariants(part);
            sort_entries(part);
        }

        Ok(Curated {
            entries,
            removed: split.removed,
            trail,
        })
    }

    /// Curates, stamps row updates against the previous run, and writes every output
    #[instrument(skip(self, records), fields(run_id = %self.run_id, date = %run_date))]
    pub async fn run(&self, records: Vec<PlanetRecord>, run_date: NaiveDate) -> Result<RunSummary> {
        let started = Instant::now();
        let input_records = records.len();
        let mut curated = self.curate(records).await?;

        let previous = match self.output.previous_row_updates().await {
            Ok(previous) => previous,
            Err(e) => {
                warn!("Could not read previous output, every row is new: {}", e);
                Vec::new()
            }
        };
        let rows_unchanged = assign_row_updates(&mut curated.entries, &previous, run_date);

        self.output
            .write_catalog(&curated.entries)
            .await
            .map_err(|e| anyhow!("Failed to write catalog: {}", e))?;
        if self.config.brown_dwarf.write_removed {
            self.output
                .write_removed_brown_dwarfs(&curated.removed)
                .await
                .map_err(|e| anyhow!("Failed to write removed brown dwarfs: {}", e))?;
        }
        self.audit
            .write_audit(&curated.trail)
            .await
            .map_err(|e| anyhow!("Failed to write audit files: {}", e))?;

        MergeMetrics::record_decisions(&curated.trail);
        MergeMetrics::record_entries(curated.entries.len(), curated.removed.len(), rows_unchanged);
        MergeMetrics::record_duration(started.elapsed().as_secs_f64());

        let summary = RunSummary {
            run_id: self.run_id.clone(),
            input_records,
            entries: curated.entries.len(),
            brown_dwarfs_removed: curated.removed.len(),
            rows_unchanged,
            decisions: curated.trail.len(),
        };
        info!(
            "Run {} finished: {} entries, {} unchanged, {} brown dwarfs removed, {} decisions",
            summary.run_id, summary.entries, summary.rows_unchanged, summary.brown_dwarfs_removed, summary.decisions
        );
        Ok(summary)
    }
}

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use exo_mercat::app::check_use_case::CheckUseCase;
use exo_mercat::app::curate_use_case::{CurateUseCase, RunSummary};
use exo_mercat::app::ports::StarResolverPort;
use exo_mercat::config::{OverrideRules, PipelineConfig};
use exo_mercat::constants::{DATE_FORMAT, LATEST_OUTPUT, METRICS_SNAPSHOT};
use exo_mercat::error::ExoMercatError;
use exo_mercat::infra::audit_log_adapter::AuditLogAdapter;
use exo_mercat::infra::catalog_source::CatalogSnapshotSource;
use exo_mercat::infra::catalog_table_adapter::CatalogTableAdapter;
use exo_mercat::infra::simbad_resolver::SimbadResolver;
use exo_mercat::infra::tic_resolver::TicResolver;
use exo_mercat::{logging, metrics};

#[derive(Parser)]
#[command(name = "exo_mercat")]
#[command(about = "Merged, deduplicated exoplanet catalog from multiple source catalogs")]
#[command(version)]
struct Cli {
    /// Config file (defaults to exo_mercat.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve, reconcile and merge the catalog snapshots for a date
    Run {
        /// Snapshot date (YYYY-MM-DD), defaults to today
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        /// Manual override rules (TOML)
        #[arg(long)]
        overrides: Option<PathBuf>,
    },
    /// Verify the output invariants on a written table
    Check {
        /// Table to check, defaults to the latest output
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

fn parse_date(raw: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

async fn run(config: PipelineConfig, date: NaiveDate, overrides: Option<PathBuf>) -> Result<RunSummary> {
    let overrides = match overrides.or_else(|| config.overrides_path.clone()) {
        Some(path) => OverrideRules::load(&path).with_context(|| format!("Failed to load overrides {:?}", path))?,
        None => OverrideRules::default(),
    };

    let records = CatalogSnapshotSource::new(&config.input_dir).load_all(date)?;
    info!("Loaded {} records for {}", records.len(), date);

    let resolver = &config.resolver;
    let star_db: Arc<dyn StarResolverPort> =
        Arc::new(SimbadResolver::new(&resolver.simbad_url, resolver.timeout_seconds)?);
    let survey: Arc<dyn StarResolverPort> = Arc::new(TicResolver::new(
        &resolver.vizier_url,
        &resolver.tic_table,
        resolver.timeout_seconds,
    )?);

    let run_id = uuid::Uuid::new_v4().to_string();
    let use_case = CurateUseCase::new(
        star_db,
        survey,
        Arc::new(CatalogTableAdapter::new(&config.output_dir, date)),
        Arc::new(AuditLogAdapter::new(&config.logs_dir, date, run_id.clone())),
        config.clone(),
    )
    .with_overrides(overrides)
    .with_run_id(run_id);

    use_case.run(records, date).await
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let config = PipelineConfig::load(cli.config.as_deref())?;
    logging::init_logging(&config.logs_dir, cli.verbose);

    match cli.command {
        Commands::Run { date, overrides } => {
            metrics::init_metrics();
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let summary = match run(config.clone(), date, overrides).await {
                Ok(summary) => summary,
                Err(e) => {
                    if let Some(ExoMercatError::ResolverUnavailable(reason)) = e.downcast_ref::<ExoMercatError>() {
                        error!("Aborting before merge, resolver services unreachable: {}", reason);
                    }
                    return Err(e);
                }
            };
            println!(
                "Run {}: {} input records -> {} entries ({} unchanged, {} brown dwarfs removed, {} decisions)",
                summary.run_id,
                summary.input_records,
                summary.entries,
                summary.rows_unchanged,
                summary.brown_dwarfs_removed,
                summary.decisions
            );
            let snapshot = config
                .logs_dir
                .join(date.format(DATE_FORMAT).to_string())
                .join(METRICS_SNAPSHOT);
            if metrics::write_snapshot(&snapshot)? {
                info!("Metrics snapshot written to {:?}", snapshot);
            }
        }
        Commands::Check { file } => {
            let path = file.unwrap_or_else(|| config.output_dir.join(LATEST_OUTPUT));
            let report = CheckUseCase::run(&path)?;
            for violation in &report.violations {
                println!("FAIL {}", violation);
            }
            if !report.passed() {
                bail!(ExoMercatError::Check {
                    message: format!("{} violations in {} rows", report.violations.len(), report.rows),
                });
            }
            println!("PASS {} rows in {}", report.rows, path.display());
        }
    }
    Ok(())
}

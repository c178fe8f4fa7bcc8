//! Ingest command implementation
//!
//! Wires the configured source and store into a [`BatchCoordinator`]
//! and executes one run. The exit code reflects whether the shared
//! snapshot fetch succeeded; per-asset failures are reported in the
//! summary but never fail the process.

use crate::adapters::{HyperdashSource, InfluxDbStore, TimeSeriesStore};
use crate::config::load_config;
use crate::core::{BatchCoordinator, PipelineSettings};
use clap::Args;
use std::sync::Arc;

/// Arguments for the ingest command
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Dry run mode - fetch and process without writing to InfluxDB
    #[arg(long)]
    pub dry_run: bool,

    /// Override the asset list (comma-separated)
    #[arg(long)]
    pub assets: Option<String>,

    /// Override the batch size
    #[arg(long)]
    pub batch_size: Option<usize>,
}

impl IngestArgs {
    /// Execute the ingest command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting ingest command");

        let mut config = load_config(config_path)?;

        if let Some(assets) = &self.assets {
            let symbols: Vec<String> = assets
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            tracing::info!(assets = ?symbols, "Overriding asset list from CLI");
            config.assets.symbols = symbols;
        }

        if let Some(batch_size) = self.batch_size {
            if batch_size == 0 {
                eprintln!("Batch size must be greater than zero");
                return Ok(2);
            }
            tracing::info!(batch_size = batch_size, "Overriding batch size from CLI");
            config.pipeline.batch_size = batch_size;
        }

        let dry_run = self.dry_run || config.application.dry_run;
        if dry_run {
            tracing::info!("Dry run mode enabled, nothing will be written");
            println!("DRY RUN - no data will be written to InfluxDB");
            println!();
        }

        let source = Arc::new(HyperdashSource::new(config.sources.clone())?);
        let store = Arc::new(InfluxDbStore::new(config.influxdb.clone())?);

        // Buckets, retention and the downsampling task must exist
        // before the first write
        if !dry_run {
            if let Err(e) = store.ensure_buckets().await {
                tracing::error!(error = %e, "InfluxDB setup failed");
                eprintln!("InfluxDB setup failed: {e}");
                return Ok(3);
            }
        }

        let settings = PipelineSettings {
            batch_size: config.pipeline.batch_size,
            failure_threshold: config.pipeline.failure_threshold,
            reset_timeout: config.pipeline.reset_timeout(),
            price_interval: config.pipeline.price_interval,
            dry_run,
        };

        let coordinator = BatchCoordinator::new(source, store, settings);
        let report = coordinator.run(&config.assets.symbols).await;

        let summary = report.stats.summary();
        println!();
        println!("Ingestion Summary:");
        println!(
            "  Fetches:     {} ok / {} failed",
            summary.successful_fetches, summary.failed_fetches
        );
        println!(
            "  Processing:  {} ok / {} failed",
            summary.successful_processes, summary.failed_processes
        );
        println!(
            "  Validation:  {} ok / {} failed",
            summary.successful_validations, summary.failed_validations
        );
        println!(
            "  Writes:      {} ok / {} failed",
            summary.successful_writes, summary.failed_writes
        );
        println!("  Failures:    {}", summary.failure_count);
        println!("  Duration:    {:.1}s", report.duration.as_secs_f64());

        if report.completed {
            Ok(0)
        } else {
            eprintln!("Run aborted: the shared position snapshot could not be fetched");
            Ok(1)
        }
    }
}

//! Batch coordinator - main orchestrator for one ingestion run
//!
//! Drives the run state machine: fetch the shared snapshots once, then
//! per batch fan out asset fetches, process, validate and write, and
//! finally process the global aggregate. Per-asset failures never cross
//! an asset boundary; only a failed shared-snapshot fetch aborts the run.

use crate::adapters::traits::{MarketDataSource, TimeSeriesStore};
use crate::core::breaker::CircuitBreaker;
use crate::core::processor::AssetProcessor;
use crate::core::stats::{RunStats, Stage};
use crate::core::transform::{aggregate_global, normalize_trends};
use crate::core::validate::{validate_global, validate_positions, validate_trends};
use crate::domain::{extract_asset_names, PositionSummary};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Sentinel asset key for run-level failures
pub const GLOBAL_ASSET: &str = "GLOBAL";

/// Tunables for one coordinator instance
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Assets per batch
    pub batch_size: usize,

    /// Circuit-breaker failure threshold
    pub failure_threshold: u32,

    /// Circuit-breaker reset timeout
    pub reset_timeout: Duration,

    /// Liquidation price bucket width in USD
    pub price_interval: f64,

    /// Skip store writes, counting them as successful
    pub dry_run: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            batch_size: 5,
            failure_threshold: crate::core::breaker::DEFAULT_FAILURE_THRESHOLD,
            reset_timeout: crate::core::breaker::DEFAULT_RESET_TIMEOUT,
            price_interval: 500.0,
            dry_run: false,
        }
    }
}

/// Outcome of one full run
#[derive(Debug)]
pub struct RunReport {
    /// Run-level statistics, all batches merged in batch order
    pub stats: RunStats,

    /// Wall-clock duration of the run
    pub duration: Duration,

    /// False only when the shared-snapshot fetch failed and the run
    /// aborted before per-asset work
    pub completed: bool,
}

/// Orchestrates batches of per-asset work over one run
pub struct BatchCoordinator {
    source: Arc<dyn MarketDataSource>,
    store: Arc<dyn TimeSeriesStore>,
    processor: AssetProcessor,
    settings: PipelineSettings,
}

impl BatchCoordinator {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        store: Arc<dyn TimeSeriesStore>,
        settings: PipelineSettings,
    ) -> Self {
        let breaker = Arc::new(CircuitBreaker::new(
            settings.failure_threshold,
            settings.reset_timeout,
        ));
        let processor = AssetProcessor::new(source.clone(), breaker, settings.price_interval);
        Self {
            source,
            store,
            processor,
            settings,
        }
    }

    /// Execute one ingestion run
    ///
    /// When `assets` is empty the universe is derived from the shared
    /// position summary. The run always completes all batches once the
    /// shared snapshot is available; every per-asset, validation and
    /// write failure is recorded and the run moves on.
    pub async fn run(&self, assets: &[String]) -> RunReport {
        let start = Instant::now();
        let mut run_stats = RunStats::new();

        tracing::info!(configured_assets = assets.len(), "Starting ingestion run");

        // FETCH_COMMON: without the shared snapshot there is no
        // meaningful per-asset work
        let Some(summary) = self.source.fetch_position_summary().await else {
            tracing::error!("Position summary unavailable, aborting run");
            run_stats.record_failure(
                GLOBAL_ASSET,
                Stage::FetchCommon,
                "position summary unavailable",
            );
            run_stats.log_failures();
            return RunReport {
                stats: run_stats,
                duration: start.elapsed(),
                completed: false,
            };
        };

        let trend_rows = self.source.fetch_ls_trend().await;
        if trend_rows.is_none() {
            tracing::warn!("L/S trend snapshot unavailable, continuing without it");
        }

        let assets = self.resolve_universe(assets, &summary);
        let timestamp = parse_snapshot_time(&summary);

        // Batch loop: contiguous batches in input order
        let batch_count = assets.len().div_ceil(self.settings.batch_size.max(1));
        for (index, batch) in assets.chunks(self.settings.batch_size.max(1)).enumerate() {
            tracing::info!(
                batch = index + 1,
                of = batch_count,
                assets = ?batch,
                "Processing batch"
            );
            let batch_stats = self.process_batch(batch, &summary, timestamp).await;
            batch_stats.log_summary(&format!("batch {}", index + 1));
            batch_stats.log_failures();
            run_stats.merge_from(batch_stats);
            // Batch-local collections go out of scope here, before the
            // next batch starts
        }

        // FINALIZE_GLOBAL
        self.finalize_global(&summary, trend_rows.as_deref(), timestamp, &mut run_stats)
            .await;

        let duration = start.elapsed();
        tracing::info!(duration_secs = duration.as_secs(), "Run finished");
        run_stats.log_summary("run");
        run_stats.log_failures();

        RunReport {
            stats: run_stats,
            duration,
            completed: true,
        }
    }

    /// Use the configured universe, or derive it from the snapshot
    fn resolve_universe(&self, configured: &[String], summary: &PositionSummary) -> Vec<String> {
        if !configured.is_empty() {
            return configured.to_vec();
        }
        let derived = extract_asset_names(summary);
        if derived.is_empty() {
            tracing::warn!("No assets found in position summary and none configured");
        } else {
            tracing::info!(count = derived.len(), "Derived asset universe from snapshot");
        }
        derived
    }

    /// One batch: concurrent fetch fan-out, sequential process, then
    /// validate and write
    async fn process_batch(
        &self,
        batch: &[String],
        summary: &PositionSummary,
        timestamp: DateTime<Utc>,
    ) -> RunStats {
        let mut stats = RunStats::new();

        // Fan out fetches; join_all preserves input order at the fan-in
        let outcomes = futures::future::join_all(
            batch.iter().map(|asset| self.processor.fetch_asset(asset)),
        )
        .await;

        // Apply outcomes and process already-fetched assets; processing
        // is local CPU work and needs no further suspension
        let mut processed = Vec::with_capacity(batch.len());
        for outcome in outcomes {
            if let Some(failure) = outcome.failure {
                stats.failed_fetches += 1;
                stats.record_failure(&outcome.asset, Stage::Fetch, failure);
                continue;
            }
            let Some(fetched) = outcome.result else {
                continue;
            };
            stats.successful_fetches += 1;

            match self
                .processor
                .process_asset(&fetched, summary, timestamp, &mut stats)
            {
                Some(record) => {
                    stats.successful_processes += 1;
                    processed.push(record);
                }
                None => stats.failed_processes += 1,
            }
        }

        if processed.is_empty() {
            return stats;
        }

        // Validate: invalid records drop individually
        let (valid, rejected) = validate_positions(processed);
        stats.successful_validations += valid.len();
        stats.failed_validations += rejected.len();
        for (asset, reason) in rejected {
            stats.record_failure(&asset, Stage::Validate, reason);
        }

        if valid.is_empty() {
            return stats;
        }

        // Write: a store error is attributed to every record in the
        // attempt and never escapes the batch loop
        if self.settings.dry_run {
            tracing::info!(count = valid.len(), "Dry run, skipping position write");
            stats.successful_writes += valid.len();
            return stats;
        }

        match self.store.write_positions(&valid).await {
            Ok(()) => stats.successful_writes += valid.len(),
            Err(e) => {
                tracing::error!(error = %e, "Batch write failed");
                stats.failed_writes += valid.len();
                for record in &valid {
                    stats.record_failure(&record.asset, Stage::Write, e.to_string());
                }
            }
        }

        stats
    }

    /// Process, validate and write the shared snapshots exactly once
    async fn finalize_global(
        &self,
        summary: &PositionSummary,
        trend_rows: Option<&[crate::domain::TrendRow]>,
        timestamp: DateTime<Utc>,
        stats: &mut RunStats,
    ) {
        // Trend series are processed regardless of the global record's
        // fate; their rejections stand on their own
        if let Some(rows) = trend_rows {
            let trends = normalize_trends(rows);
            let (valid_trends, rejected) = validate_trends(trends);
            tracing::info!(count = valid_trends.len(), "Normalized L/S trend series");
            for (asset, reason) in rejected {
                stats.record_failure(&asset, Stage::ProcessGlobal, reason);
            }
        }

        let global = aggregate_global(summary, timestamp);

        if let Err(e) = validate_global(&global) {
            tracing::error!(error = %e, "Global metrics failed validation");
            stats.record_failure(GLOBAL_ASSET, Stage::ProcessGlobal, e.to_string());
            return;
        }

        if self.settings.dry_run {
            tracing::info!("Dry run, skipping global write");
            return;
        }

        if let Err(e) = self.store.write_global(&global).await {
            tracing::error!(error = %e, "Global write failed");
            stats.record_failure(GLOBAL_ASSET, Stage::ProcessGlobal, e.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        FundingEntry, GlobalMetrics, LiquidationLevels, PositionRow, ProcessedAsset, Result, Side,
        StoreError, TrendRow,
    };
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSource {
        summary: Option<PositionSummary>,
        trend: Option<Vec<TrendRow>>,
        liquidation: BTreeMap<String, LiquidationLevels>,
        funding: BTreeMap<String, Vec<FundingEntry>>,
    }

    #[async_trait]
    impl MarketDataSource for FakeSource {
        async fn fetch_position_summary(&self) -> Option<PositionSummary> {
            self.summary.clone()
        }
        async fn fetch_ls_trend(&self) -> Option<Vec<TrendRow>> {
            self.trend.clone()
        }
        async fn fetch_liquidation(&self, asset: &str) -> Option<LiquidationLevels> {
            self.liquidation.get(asset).cloned()
        }
        async fn fetch_funding_history(&self, asset: &str) -> Option<Vec<FundingEntry>> {
            self.funding.get(asset).cloned()
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        fail_writes: bool,
        positions: Mutex<Vec<String>>,
        globals: Mutex<Vec<GlobalMetrics>>,
    }

    #[async_trait]
    impl TimeSeriesStore for RecordingStore {
        async fn ensure_buckets(&self) -> Result<()> {
            Ok(())
        }

        async fn write_positions(&self, records: &[ProcessedAsset]) -> Result<()> {
            if self.fail_writes {
                return Err(StoreError::WriteFailed("store down".to_string()).into());
            }
            let mut written = self.positions.lock().unwrap();
            written.extend(records.iter().map(|r| r.asset.clone()));
            Ok(())
        }

        async fn write_global(&self, record: &GlobalMetrics) -> Result<()> {
            if self.fail_writes {
                return Err(StoreError::WriteFailed("store down".to_string()).into());
            }
            self.globals.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn summary_with(assets: &[&str]) -> PositionSummary {
        PositionSummary {
            data: assets
                .iter()
                .map(|asset| PositionRow {
                    asset: asset.to_string(),
                    total_notional: 100.0,
                    majority_side: Some(Side::Long),
                    majority_notional: 60.0,
                    minority_notional: 40.0,
                    ls_ratio: 1.5,
                    traders_long: 3,
                    traders_short: 2,
                    open_interest: 100.0,
                })
                .collect(),
            last_updated: "2025-06-01T12:00:00+00:00".to_string(),
        }
    }

    fn levels_with(price: &str, amount: f64) -> LiquidationLevels {
        let mut wallets = BTreeMap::new();
        wallets.insert("w1".to_string(), amount);
        let mut levels = LiquidationLevels::new();
        levels.insert(price.to_string(), wallets);
        levels
    }

    fn funding_ok() -> Vec<FundingEntry> {
        vec![FundingEntry {
            coin: "X".to_string(),
            funding_rate: "0.0001".to_string(),
            premium: "0".to_string(),
            time: 1717243200000,
        }]
    }

    fn settings() -> PipelineSettings {
        PipelineSettings {
            batch_size: 2,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_common_fetch_failure_is_fatal() {
        let source = Arc::new(FakeSource::default());
        let store = Arc::new(RecordingStore::default());
        let coordinator = BatchCoordinator::new(source, store.clone(), settings());

        let report = coordinator.run(&["BTC".to_string()]).await;

        assert!(!report.completed);
        assert_eq!(report.stats.failures().len(), 1);
        assert_eq!(report.stats.failures()[0].asset, GLOBAL_ASSET);
        assert_eq!(report.stats.failures()[0].stage, Stage::FetchCommon);
        assert!(store.positions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_one_bad_asset_does_not_abort_siblings() {
        // A, B, C with batch size 2 -> batches [A, B], [C].
        // B has data from neither source, so its fetch fails.
        let mut source = FakeSource::default();
        source.summary = Some(summary_with(&["A", "B", "C"]));
        for asset in ["A", "C"] {
            source
                .liquidation
                .insert(asset.to_string(), levels_with("1000", 5.0));
            source.funding.insert(asset.to_string(), funding_ok());
        }
        let store = Arc::new(RecordingStore::default());
        let coordinator = BatchCoordinator::new(Arc::new(source), store.clone(), settings());

        let assets = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let report = coordinator.run(&assets).await;

        assert!(report.completed);
        let written = store.positions.lock().unwrap();
        assert_eq!(*written, vec!["A".to_string(), "C".to_string()]);

        let summary = report.stats.summary();
        assert_eq!(summary.successful_fetches, 2);
        assert_eq!(summary.failed_fetches, 1);
        assert_eq!(summary.successful_processes, 2);
        assert_eq!(summary.successful_writes, 2);

        let b_failures: Vec<_> = report
            .stats
            .failures()
            .iter()
            .filter(|f| f.asset == "B")
            .collect();
        assert_eq!(b_failures.len(), 1);
        assert_eq!(b_failures[0].stage, Stage::Fetch);
    }

    #[tokio::test]
    async fn test_write_failure_attributed_to_every_record_and_run_continues() {
        let mut source = FakeSource::default();
        source.summary = Some(summary_with(&["A", "B"]));
        for asset in ["A", "B"] {
            source
                .liquidation
                .insert(asset.to_string(), levels_with("1000", 5.0));
        }
        let store = Arc::new(RecordingStore {
            fail_writes: true,
            ..Default::default()
        });
        let coordinator = BatchCoordinator::new(Arc::new(source), store, settings());

        let report = coordinator
            .run(&["A".to_string(), "B".to_string()])
            .await;

        assert!(report.completed);
        let summary = report.stats.summary();
        assert_eq!(summary.failed_writes, 2);
        let write_failures: Vec<_> = report
            .stats
            .failures()
            .iter()
            .filter(|f| f.stage == Stage::Write)
            .collect();
        assert_eq!(write_failures.len(), 2);
        // Global write failure recorded too, under the sentinel asset
        assert!(report
            .stats
            .failures()
            .iter()
            .any(|f| f.asset == GLOBAL_ASSET && f.stage == Stage::ProcessGlobal));
    }

    #[tokio::test]
    async fn test_global_aggregate_written_once() {
        let mut source = FakeSource::default();
        source.summary = Some(summary_with(&["A"]));
        source
            .liquidation
            .insert("A".to_string(), levels_with("1000", 5.0));
        let store = Arc::new(RecordingStore::default());
        let coordinator = BatchCoordinator::new(Arc::new(source), store.clone(), settings());

        coordinator.run(&["A".to_string()]).await;

        let globals = store.globals.lock().unwrap();
        assert_eq!(globals.len(), 1);
        assert_eq!(globals[0].total_tickers, 1);
        assert_eq!(globals[0].total_notional_volume, 100.0);
    }

    #[tokio::test]
    async fn test_universe_derived_from_snapshot_when_unconfigured() {
        let mut source = FakeSource::default();
        source.summary = Some(summary_with(&["ETH", "BTC"]));
        for asset in ["BTC", "ETH"] {
            source
                .liquidation
                .insert(asset.to_string(), levels_with("1000", 1.0));
        }
        let store = Arc::new(RecordingStore::default());
        let coordinator = BatchCoordinator::new(Arc::new(source), store.clone(), settings());

        let report = coordinator.run(&[]).await;

        assert!(report.completed);
        // Derived universe is sorted
        assert_eq!(
            *store.positions.lock().unwrap(),
            vec!["BTC".to_string(), "ETH".to_string()]
        );
    }

    #[tokio::test]
    async fn test_dry_run_counts_writes_without_storing() {
        let mut source = FakeSource::default();
        source.summary = Some(summary_with(&["A"]));
        source
            .liquidation
            .insert("A".to_string(), levels_with("1000", 5.0));
        let store = Arc::new(RecordingStore::default());
        let coordinator = BatchCoordinator::new(
            Arc::new(source),
            store.clone(),
            PipelineSettings {
                dry_run: true,
                ..settings()
            },
        );

        let report = coordinator.run(&["A".to_string()]).await;

        assert_eq!(report.stats.summary().successful_writes, 1);
        assert!(store.positions.lock().unwrap().is_empty());
        assert!(store.globals.lock().unwrap().is_empty());
    }

    #[test]
    fn test_parse_snapshot_time_rfc3339() {
        let summary = summary_with(&["A"]);
        let parsed = parse_snapshot_time(&summary);
        assert_eq!(parsed.to_rfc3339(), "2025-06-01T12:00:00+00:00");
    }
}

/// Parse the snapshot timestamp, falling back to now on malformed input
fn parse_snapshot_time(summary: &PositionSummary) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(&summary.last_updated) {
        Ok(time) => time.with_timezone(&Utc),
        Err(e) => {
            tracing::warn!(
                last_updated = %summary.last_updated,
                error = %e,
                "Snapshot timestamp unparsable, using current time"
            );
            Utc::now()
        }
    }
}

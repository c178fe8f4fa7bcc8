//! End-to-end pipeline tests over in-memory source and store fakes
//!
//! These exercise the full coordinator path: shared snapshot fetch,
//! batch fan-out, per-asset processing, validation, writes, and the
//! global finalize step.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tidemark::adapters::traits::{MarketDataSource, TimeSeriesStore};
use tidemark::core::{BatchCoordinator, PipelineSettings, Stage, GLOBAL_ASSET};
use tidemark::domain::{
    FundingEntry, GlobalMetrics, LiquidationLevels, PositionRow, PositionSummary, ProcessedAsset,
    Result, Side, TrendRow,
};

#[derive(Default)]
struct FakeSource {
    summary: Option<PositionSummary>,
    trend: Option<Vec<TrendRow>>,
    liquidation: BTreeMap<String, LiquidationLevels>,
    funding: BTreeMap<String, Vec<FundingEntry>>,
    liquidation_calls: AtomicUsize,
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
        self.liquidation_calls.fetch_add(1, Ordering::SeqCst);
        self.liquidation.get(asset).cloned()
    }

    async fn fetch_funding_history(&self, asset: &str) -> Option<Vec<FundingEntry>> {
        self.funding.get(asset).cloned()
    }
}

#[derive(Default)]
struct RecordingStore {
    position_batches: Mutex<Vec<Vec<String>>>,
    globals: Mutex<Vec<GlobalMetrics>>,
}

#[async_trait]
impl TimeSeriesStore for RecordingStore {
    async fn ensure_buckets(&self) -> Result<()> {
        Ok(())
    }

    async fn write_positions(&self, records: &[ProcessedAsset]) -> Result<()> {
        let batch: Vec<String> = records.iter().map(|r| r.asset.clone()).collect();
        self.position_batches.lock().unwrap().push(batch);
        Ok(())
    }

    async fn write_global(&self, record: &GlobalMetrics) -> Result<()> {
        self.globals.lock().unwrap().push(record.clone());
        Ok(())
    }
}

fn position_row(asset: &str) -> PositionRow {
    PositionRow {
        asset: asset.to_string(),
        total_notional: 500.0,
        majority_side: Some(Side::Long),
        majority_notional: 300.0,
        minority_notional: 200.0,
        ls_ratio: 1.5,
        traders_long: 6,
        traders_short: 4,
        open_interest: 550.0,
    }
}

fn summary_with(assets: &[&str]) -> PositionSummary {
    PositionSummary {
        data: assets.iter().map(|a| position_row(a)).collect(),
        last_updated: "2025-06-01T12:00:00+00:00".to_string(),
    }
}

fn levels_with(price: &str, amount: f64) -> LiquidationLevels {
    let mut wallets = BTreeMap::new();
    wallets.insert("0xwallet".to_string(), amount);
    let mut levels = LiquidationLevels::new();
    levels.insert(price.to_string(), wallets);
    levels
}

fn funding_ok(asset: &str) -> Vec<FundingEntry> {
    vec![FundingEntry {
        coin: asset.to_string(),
        funding_rate: "0.0000125".to_string(),
        premium: "0.0001".to_string(),
        time: Utc::now().timestamp_millis(),
    }]
}

fn settings(batch_size: usize) -> PipelineSettings {
    PipelineSettings {
        batch_size,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_three_assets_batch_size_two_writes_two_batches() {
    let mut source = FakeSource::default();
    source.summary = Some(summary_with(&["A", "B", "C"]));
    for asset in ["A", "B", "C"] {
        source
            .liquidation
            .insert(asset.to_string(), levels_with("1000", 5.0));
        source.funding.insert(asset.to_string(), funding_ok(asset));
    }
    let store = Arc::new(RecordingStore::default());
    let coordinator = BatchCoordinator::new(Arc::new(source), store.clone(), settings(2));

    let assets: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
    let report = coordinator.run(&assets).await;

    assert!(report.completed);
    let batches = store.position_batches.lock().unwrap();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0], vec!["A".to_string(), "B".to_string()]);
    assert_eq!(batches[1], vec!["C".to_string()]);

    let summary = report.stats.summary();
    assert_eq!(summary.successful_fetches, 3);
    assert_eq!(summary.successful_processes, 3);
    assert_eq!(summary.successful_validations, 3);
    assert_eq!(summary.successful_writes, 3);
    assert_eq!(summary.failure_count, 0);
}

#[tokio::test]
async fn test_one_asset_process_failure_does_not_block_siblings() {
    // B fetches fine (liquidation payload exists) but every processing
    // sub-step comes up empty: the prices are unparsable and B has no
    // row in the shared summary.
    let mut source = FakeSource::default();
    source.summary = Some(summary_with(&["A", "C"]));
    for asset in ["A", "C"] {
        source
            .liquidation
            .insert(asset.to_string(), levels_with("1000", 5.0));
        source.funding.insert(asset.to_string(), funding_ok(asset));
    }
    source
        .liquidation
        .insert("B".to_string(), levels_with("not-a-price", 5.0));

    let store = Arc::new(RecordingStore::default());
    let coordinator = BatchCoordinator::new(Arc::new(source), store.clone(), settings(2));

    let assets: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
    let report = coordinator.run(&assets).await;

    assert!(report.completed);
    let written: Vec<String> = store
        .position_batches
        .lock()
        .unwrap()
        .iter()
        .flatten()
        .cloned()
        .collect();
    assert_eq!(written, vec!["A".to_string(), "C".to_string()]);

    let summary = report.stats.summary();
    assert_eq!(summary.successful_fetches, 3);
    assert_eq!(summary.failed_processes, 1);
    assert_eq!(summary.successful_writes, 2);

    let process_failures: Vec<_> = report
        .stats
        .failures()
        .iter()
        .filter(|f| f.asset == "B" && f.stage == Stage::Process)
        .collect();
    assert_eq!(process_failures.len(), 1);
}

#[tokio::test]
async fn test_failure_log_preserves_batch_order() {
    // Both batches have one failing asset; the failure log must list
    // batch one's failure before batch two's.
    let mut source = FakeSource::default();
    source.summary = Some(summary_with(&["A", "D"]));
    for asset in ["A", "D"] {
        source
            .liquidation
            .insert(asset.to_string(), levels_with("1000", 5.0));
    }
    let store = Arc::new(RecordingStore::default());
    let coordinator = BatchCoordinator::new(Arc::new(source), store, settings(2));

    // B (batch 1) and C (batch 2) have no data anywhere
    let assets: Vec<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
    let report = coordinator.run(&assets).await;

    let fetch_failures: Vec<&str> = report
        .stats
        .failures()
        .iter()
        .filter(|f| f.stage == Stage::Fetch)
        .map(|f| f.asset.as_str())
        .collect();
    assert_eq!(fetch_failures, vec!["B", "C"]);
}

#[tokio::test]
async fn test_aborted_run_skips_batches_and_global() {
    let source = FakeSource {
        summary: None,
        ..Default::default()
    };
    let store = Arc::new(RecordingStore::default());
    let coordinator = BatchCoordinator::new(Arc::new(source), store.clone(), settings(2));

    let report = coordinator.run(&["A".to_string()]).await;

    assert!(!report.completed);
    assert!(store.position_batches.lock().unwrap().is_empty());
    assert!(store.globals.lock().unwrap().is_empty());
    assert_eq!(report.stats.failures().len(), 1);
    assert_eq!(report.stats.failures()[0].asset, GLOBAL_ASSET);
    assert_eq!(report.stats.failures()[0].stage, Stage::FetchCommon);
}

#[tokio::test]
async fn test_global_aggregate_reflects_summary() {
    let mut source = FakeSource::default();
    source.summary = Some(summary_with(&["A", "B"]));
    for asset in ["A", "B"] {
        source
            .liquidation
            .insert(asset.to_string(), levels_with("1000", 2.0));
    }
    let store = Arc::new(RecordingStore::default());
    let coordinator = BatchCoordinator::new(Arc::new(source), store.clone(), settings(5));

    coordinator
        .run(&["A".to_string(), "B".to_string()])
        .await;

    let globals = store.globals.lock().unwrap();
    assert_eq!(globals.len(), 1);
    let global = &globals[0];
    assert_eq!(global.total_tickers, 2);
    assert_eq!(global.total_notional_volume, 1000.0);
    // Both rows are majority-long, so all majority notional is long
    assert_eq!(global.long_positions_notional, 600.0);
    assert_eq!(global.short_positions_notional, 400.0);
}

#[tokio::test]
async fn test_invalid_global_still_reports_trend_rejections() {
    // A rogue summary row drags the global notional negative, so the
    // global record fails validation and is not written. Trend
    // processing happens regardless, so the unparsable trend series
    // still lands in the failure log.
    let mut source = FakeSource::default();
    let mut summary = summary_with(&["A"]);
    let mut rogue = position_row("Z");
    rogue.total_notional = -2000.0;
    summary.data.push(rogue);
    source.summary = Some(summary);
    source
        .liquidation
        .insert("A".to_string(), levels_with("1000", 5.0));
    source.funding.insert("A".to_string(), funding_ok("A"));

    let mut trend_row = TrendRow::new();
    trend_row.insert("Asset".to_string(), serde_json::json!("T"));
    trend_row.insert("2025-06-01".to_string(), serde_json::json!("NaN"));
    source.trend = Some(vec![trend_row]);

    let store = Arc::new(RecordingStore::default());
    let coordinator = BatchCoordinator::new(Arc::new(source), store.clone(), settings(2));

    let report = coordinator.run(&["A".to_string()]).await;

    assert!(report.completed);
    assert!(store.globals.lock().unwrap().is_empty());
    assert!(report
        .stats
        .failures()
        .iter()
        .any(|f| f.asset == GLOBAL_ASSET && f.stage == Stage::ProcessGlobal));
    assert!(report
        .stats
        .failures()
        .iter()
        .any(|f| f.asset == "T" && f.stage == Stage::ProcessGlobal));
}

#[tokio::test]
async fn test_circuit_opens_after_repeated_failing_runs() {
    let mut source = FakeSource::default();
    source.summary = Some(summary_with(&["A"]));
    // A never has any per-asset data, so every fetch fails
    let source = Arc::new(source);
    let store = Arc::new(RecordingStore::default());
    let coordinator = BatchCoordinator::new(
        source.clone(),
        store,
        PipelineSettings {
            batch_size: 2,
            failure_threshold: 3,
            reset_timeout: Duration::from_secs(300),
            ..Default::default()
        },
    );

    for _ in 0..3 {
        coordinator.run(&["A".to_string()]).await;
    }
    let calls_before = source.liquidation_calls.load(Ordering::SeqCst);
    assert_eq!(calls_before, 3);

    // Circuit is now open: the fourth run fails fast without a call
    let report = coordinator.run(&["A".to_string()]).await;
    assert_eq!(source.liquidation_calls.load(Ordering::SeqCst), calls_before);
    assert!(report
        .stats
        .failures()
        .iter()
        .any(|f| f.stage == Stage::Fetch && f.error.contains("circuit breaker open")));
}

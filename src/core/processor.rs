//! Per-asset fetch and transform
//!
//! One asset's work is isolated from every other asset's: fetch and
//! processing are guarded by the circuit breaker under separate key
//! namespaces (`fetch:<asset>` vs `process:<asset>`), and within
//! processing each sub-derivation fails on its own without dragging the
//! others down.

use crate::adapters::traits::MarketDataSource;
use crate::core::breaker::CircuitBreaker;
use crate::core::stats::{RunStats, Stage};
use crate::core::transform::{aggregate_liquidations, normalize_funding};
use crate::domain::{AssetFetchResult, PositionSummary, ProcessedAsset};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Outcome of one asset's fetch, returned to the fan-in point
///
/// Per-asset fetch tasks run concurrently, so instead of mutating a
/// shared statistics log they report their outcome and the coordinator
/// applies it after the fan-in.
#[derive(Debug)]
pub struct FetchOutcome {
    pub asset: String,

    /// Fetched data; `None` means this asset's fetch failed or was
    /// suppressed by the breaker
    pub result: Option<AssetFetchResult>,

    /// Failure description to record under the fetch stage, if any
    pub failure: Option<String>,
}

/// Fetches and transforms data for one asset
pub struct AssetProcessor {
    source: Arc<dyn MarketDataSource>,
    breaker: Arc<CircuitBreaker>,
    price_interval: f64,
}

impl AssetProcessor {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        breaker: Arc<CircuitBreaker>,
        price_interval: f64,
    ) -> Self {
        Self {
            source,
            breaker,
            price_interval,
        }
    }

    /// Fetch liquidation and funding data for one asset
    ///
    /// Skipped without a network call when the `fetch:<asset>` circuit is
    /// open. The two sources are fetched concurrently and may
    /// independently be absent; only both being absent counts as a
    /// failure.
    pub async fn fetch_asset(&self, asset: &str) -> FetchOutcome {
        let operation_key = format!("fetch:{asset}");

        if !self.breaker.can_proceed(&operation_key) {
            tracing::warn!(asset = asset, "Circuit open, skipping fetch");
            return FetchOutcome {
                asset: asset.to_string(),
                result: None,
                failure: Some("circuit breaker open".to_string()),
            };
        }

        let (liquidation, funding) = tokio::join!(
            self.source.fetch_liquidation(asset),
            self.source.fetch_funding_history(asset)
        );

        if liquidation.is_none() && funding.is_none() {
            self.breaker.record_failure(&operation_key);
            return FetchOutcome {
                asset: asset.to_string(),
                result: None,
                failure: Some("both liquidation and funding sources empty".to_string()),
            };
        }

        self.breaker.record_success(&operation_key);
        FetchOutcome {
            asset: asset.to_string(),
            result: Some(AssetFetchResult {
                asset: asset.to_string(),
                liquidation,
                funding,
            }),
            failure: None,
        }
    }

    /// Transform one asset's fetched data into a processed record
    ///
    /// Runs three independent sub-derivations: funding normalization,
    /// position lookup in the shared summary, and liquidation
    /// aggregation. Each sub-step's error is recorded under its own
    /// stage and does not abort the others; absent inputs (no funding
    /// history, no summary row) are not errors. Any single non-empty
    /// sub-result yields a (possibly partial) record.
    pub fn process_asset(
        &self,
        fetched: &AssetFetchResult,
        shared: &PositionSummary,
        timestamp: DateTime<Utc>,
        stats: &mut RunStats,
    ) -> Option<ProcessedAsset> {
        let asset = fetched.asset.as_str();
        let operation_key = format!("process:{asset}");

        if !self.breaker.can_proceed(&operation_key) {
            tracing::warn!(asset = asset, "Circuit open, skipping processing");
            stats.record_failure(asset, Stage::Process, "circuit breaker open");
            return None;
        }

        let funding = match fetched.funding.as_deref() {
            Some(entries) => match normalize_funding(entries) {
                Ok(rate) => rate,
                Err(e) => {
                    tracing::error!(asset = asset, error = %e, "Funding normalization failed");
                    stats.record_failure(asset, Stage::ProcessFunding, e.to_string());
                    None
                }
            },
            None => None,
        };

        // An asset without a summary row is plain absence, not a
        // sub-step failure
        let position = shared
            .data
            .iter()
            .find(|row| row.asset == asset)
            .map(Into::into);
        if position.is_none() {
            tracing::debug!(asset = asset, "Asset not present in position summary");
        }

        let (liquidation_metrics, distribution) = match fetched.liquidation.as_ref() {
            Some(levels) => {
                match aggregate_liquidations(levels, asset, self.price_interval, timestamp) {
                    Ok((metrics, dist)) => (Some(metrics), Some(dist)),
                    Err(e) => {
                        tracing::error!(asset = asset, error = %e, "Liquidation aggregation failed");
                        stats.record_failure(asset, Stage::ProcessLiquidation, e.to_string());
                        (None, None)
                    }
                }
            }
            None => (None, None),
        };

        let record = ProcessedAsset {
            asset: asset.to_string(),
            position,
            funding,
            liquidation_metrics,
            distribution,
            timestamp,
        };

        if record.is_empty() {
            self.breaker.record_failure(&operation_key);
            stats.record_failure(asset, Stage::Process, "no valid data to process");
            return None;
        }

        self.breaker.record_success(&operation_key);
        Some(record)
    }
}

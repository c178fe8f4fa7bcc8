//! Adapter seams for the pipeline core
//!
//! The coordinator and processor only see these traits; concrete
//! implementations live beside them in this module and test fakes
//! implement them in-memory.

use crate::domain::{
    FundingEntry, GlobalMetrics, LiquidationLevels, PositionSummary, ProcessedAsset, Result,
    TrendRow,
};
use async_trait::async_trait;

/// Upstream market-data source
///
/// Absence semantics: every method returns `None` for "no data", which
/// covers authorization rejections and exhausted retries as well as
/// genuinely empty responses. The fetch layer never raises for a failed
/// request; deciding whether absence is a failure is the caller's job.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch the shared position summary (one row per asset)
    async fn fetch_position_summary(&self) -> Option<PositionSummary>;

    /// Fetch the market-wide L/S trend rows
    async fn fetch_ls_trend(&self) -> Option<Vec<TrendRow>>;

    /// Fetch raw liquidation levels for one asset
    async fn fetch_liquidation(&self, asset: &str) -> Option<LiquidationLevels>;

    /// Fetch the funding-rate history for one asset
    async fn fetch_funding_history(&self, asset: &str) -> Option<Vec<FundingEntry>>;
}

/// Time-series store for validated records
///
/// Writes are idempotent per call, keyed by asset + timestamp; the core
/// does not deduplicate before writing. Retention and downsampling are
/// the store's own concern, configured once via [`ensure_buckets`].
///
/// [`ensure_buckets`]: TimeSeriesStore::ensure_buckets
#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    /// Create or update the raw and downsampled buckets and the
    /// promotion task between them
    async fn ensure_buckets(&self) -> Result<()>;

    /// Write a batch of validated per-asset records
    async fn write_positions(&self, records: &[ProcessedAsset]) -> Result<()>;

    /// Write the run's global aggregate record
    async fn write_global(&self, record: &GlobalMetrics) -> Result<()>;
}

//! Normalized per-asset records produced by the pipeline

use super::liquidation::LiquidationDistribution;
use super::market::{FundingEntry, LiquidationLevels, PositionRow, Side};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything fetched for a single asset, before transformation
///
/// Transient: held only while the asset is being processed. Either source
/// may be absent; both absent is treated as a fetch failure upstream.
#[derive(Debug, Clone)]
pub struct AssetFetchResult {
    pub asset: String,
    pub liquidation: Option<LiquidationLevels>,
    pub funding: Option<Vec<FundingEntry>>,
}

/// Normalized view of one asset's row in the shared position summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub asset: String,
    pub total_notional: f64,
    pub majority_side: Option<Side>,
    pub majority_notional: f64,
    pub minority_notional: f64,
    pub ls_ratio: f64,
    pub traders_long: u64,
    pub traders_short: u64,
    pub open_interest: f64,
}

impl From<&PositionRow> for PositionSnapshot {
    fn from(row: &PositionRow) -> Self {
        Self {
            asset: row.asset.clone(),
            total_notional: row.total_notional,
            majority_side: row.majority_side,
            majority_notional: row.majority_notional,
            minority_notional: row.minority_notional,
            ls_ratio: row.ls_ratio,
            traders_long: row.traders_long,
            traders_short: row.traders_short,
            open_interest: row.open_interest,
        }
    }
}

/// Normalized funding rate for one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingRate {
    /// When this rate was recorded
    pub time: DateTime<Utc>,

    /// Funding rate for the period (decimal, e.g. 0.01 = 1%)
    pub rate: f64,

    /// Premium over the oracle price
    pub premium: f64,
}

/// Scalar liquidation metrics over the fetch window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidationMetrics {
    /// Long liquidation volume
    pub long_volume: f64,

    /// Short liquidation volume
    pub short_volume: f64,

    /// Largest single liquidation by absolute size
    pub largest_single: f64,

    /// Total liquidation volume (long + short)
    pub total_volume: f64,
}

/// Merged per-asset output handed to validation and storage
///
/// Partial by design: any subset of the optional sections may be present,
/// as long as at least one is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedAsset {
    pub asset: String,
    pub position: Option<PositionSnapshot>,
    pub funding: Option<FundingRate>,
    pub liquidation_metrics: Option<LiquidationMetrics>,
    pub distribution: Option<LiquidationDistribution>,
    pub timestamp: DateTime<Utc>,
}

impl ProcessedAsset {
    /// True if no section carries data
    pub fn is_empty(&self) -> bool {
        self.position.is_none()
            && self.funding.is_none()
            && self.liquidation_metrics.is_none()
            && self.distribution.is_none()
    }
}

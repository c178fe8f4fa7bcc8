//! Liquidation distribution (histogram by price bucket)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One price bucket in the liquidation distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionPoint {
    /// Lower edge of the price bucket in USD
    pub price: f64,

    /// Long liquidation volume in this bucket
    pub long_liquidations: f64,

    /// Short liquidation volume in this bucket
    pub short_liquidations: f64,

    /// Running long total up to and including this bucket
    pub cumulative_longs: f64,

    /// Running short total up to and including this bucket
    pub cumulative_shorts: f64,
}

/// Liquidation histogram for one asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidationDistribution {
    pub asset: String,

    /// Buckets in ascending price order
    pub distribution: Vec<DistributionPoint>,

    /// Highest price level observed in the raw data
    pub current_price: f64,

    pub timestamp: DateTime<Utc>,

    /// Refresh rate in seconds
    pub update_interval: u32,

    pub base_currency: String,

    /// Decimal places used when rounding bucket volumes
    pub precision: u8,
}

//! Global (market-level) aggregate metrics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Market-wide aggregate derived from the shared position summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalMetrics {
    /// Sum of all position values in USD
    pub total_notional_volume: f64,

    /// Notional attributed to long positions
    pub long_positions_notional: f64,

    /// Notional attributed to short positions
    pub short_positions_notional: f64,

    /// Number of tickers in the snapshot
    pub total_tickers: usize,

    /// Count of long positions across all assets
    pub long_positions_count: u64,

    /// Count of short positions across all assets
    pub short_positions_count: u64,

    /// Long notional as a fraction of total notional (0 when total is 0)
    pub global_ls_ratio: f64,

    pub base_currency: String,

    pub timestamp: DateTime<Utc>,
}

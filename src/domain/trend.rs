//! Long/short ratio trend series

use super::market::Side;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day's point in an asset's L/S trend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,

    /// L/S ratio for the day (percentage long, 0-100)
    pub ls_ratio: f64,

    /// Side inferred from the ratio's movement
    pub majority_side: Side,

    /// Distance from the neutral 50/50 split
    pub notional_delta: f64,
}

/// Daily L/S trend for one asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LsTrend {
    pub asset: String,

    /// Points in chronological order
    pub points: Vec<TrendPoint>,

    /// Date of the most recent point
    pub last_updated: NaiveDate,

    /// Cadence descriptor, e.g. "daily"
    pub update_frequency: String,

    /// Number of days covered
    pub historical_days: usize,
}

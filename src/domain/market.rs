//! Raw market-data payloads as served by the upstream analytics APIs
//!
//! These types mirror the wire format (capitalized keys, decimal strings)
//! and are normalized by the transforms in [`crate::core::transform`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Position side of a trade or aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

/// Shared position summary fetched once per run
///
/// This is the common snapshot every asset's processing consults; its
/// `last_updated` field is the timestamp stamped onto every record of
/// the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSummary {
    /// One row per listed asset
    pub data: Vec<PositionRow>,

    /// Snapshot timestamp as reported by the API (RFC 3339)
    #[serde(rename = "lastUpdated")]
    pub last_updated: String,
}

/// One asset's row in the position summary
///
/// Field names follow the upstream JSON keys verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionRow {
    #[serde(rename = "Asset")]
    pub asset: String,

    #[serde(rename = "Total Notional", default)]
    pub total_notional: f64,

    #[serde(rename = "Majority Side")]
    pub majority_side: Option<Side>,

    #[serde(rename = "Majority Side Notional", default)]
    pub majority_notional: f64,

    #[serde(rename = "Minority Side Notional", default)]
    pub minority_notional: f64,

    #[serde(rename = "L/S Ratio", default)]
    pub ls_ratio: f64,

    #[serde(rename = "Number Long", default)]
    pub traders_long: u64,

    #[serde(rename = "Number Short", default)]
    pub traders_short: u64,

    #[serde(rename = "Open Interest", default)]
    pub open_interest: f64,
}

/// Raw liquidation levels: price level -> wallet -> signed notional
///
/// Positive amounts are long liquidations, negative amounts are short
/// liquidations. `BTreeMap` keeps iteration order deterministic.
pub type LiquidationLevels = BTreeMap<String, BTreeMap<String, f64>>;

/// One raw funding-history entry from the info API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingEntry {
    /// Asset discriminator, dropped during normalization
    pub coin: String,

    /// Funding rate as a decimal string
    pub funding_rate: String,

    /// Premium as a decimal string
    #[serde(default)]
    pub premium: String,

    /// Entry time in epoch milliseconds
    pub time: i64,
}

/// One raw L/S trend row: an `"Asset"` key plus date-keyed ratio values
///
/// Ratio values arrive as strings or numbers, with empty strings for
/// missing days.
pub type TrendRow = BTreeMap<String, serde_json::Value>;

/// Extract the sorted unique asset symbols present in a position summary
///
/// Used to derive the asset universe when none is configured. Rows with
/// an empty symbol are skipped.
pub fn extract_asset_names(summary: &PositionSummary) -> Vec<String> {
    let mut names: Vec<String> = summary
        .data
        .iter()
        .map(|row| row.asset.clone())
        .filter(|name| !name.is_empty())
        .collect();
    names.sort();
    names.dedup();
    names
}

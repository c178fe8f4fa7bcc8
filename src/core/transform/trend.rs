//! L/S trend normalization
//!
//! Turns raw date-keyed ratio rows into chronological trend series with
//! a majority side inferred from the ratio's day-over-day movement.

use crate::domain::{LsTrend, Side, TrendPoint, TrendRow};
use chrono::NaiveDate;

/// Normalize raw trend rows into per-asset series
///
/// Each row carries an `"Asset"` key plus `YYYY-MM-DD` keys with ratio
/// values (strings or numbers; empty strings mean no data for that day).
/// The first point's majority side is long when the ratio is at least
/// 50, later points compare against the previous day. Rows that yield
/// no usable points are skipped, as are malformed dates and ratios.
pub fn normalize_trends(rows: &[TrendRow]) -> Vec<LsTrend> {
    let mut trends = Vec::new();

    for row in rows {
        let Some(asset) = row.get("Asset").and_then(|v| v.as_str()) else {
            tracing::debug!("Skipping trend row without an Asset key");
            continue;
        };

        // BTreeMap already iterates date keys in chronological order
        let mut points = Vec::new();
        let mut prev_ratio: Option<f64> = None;
        for (key, value) in row {
            if key == "Asset" {
                continue;
            }
            let Ok(date) = NaiveDate::parse_from_str(key, "%Y-%m-%d") else {
                tracing::debug!(asset = asset, key = key, "Skipping non-date trend key");
                continue;
            };
            let Some(ratio) = parse_ratio(value) else {
                continue;
            };

            let majority_side = match prev_ratio {
                None if ratio >= 50.0 => Side::Long,
                None => Side::Short,
                Some(prev) if ratio > prev => Side::Long,
                Some(_) => Side::Short,
            };

            points.push(TrendPoint {
                date,
                ls_ratio: ratio,
                majority_side,
                notional_delta: (50.0 - ratio).abs(),
            });
            prev_ratio = Some(ratio);
        }

        let Some(last) = points.last() else {
            continue;
        };
        trends.push(LsTrend {
            asset: asset.to_string(),
            last_updated: last.date,
            historical_days: points.len(),
            update_frequency: "daily".to_string(),
            points,
        });
    }

    trends
}

fn parse_ratio(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) if !s.is_empty() => s.parse().ok(),
        _ => None,
    }
}

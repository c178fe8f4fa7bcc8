//! Market-wide aggregation over the shared position summary

use crate::domain::{GlobalMetrics, PositionSummary, Side};
use chrono::{DateTime, Utc};

/// Aggregate the position summary into global metrics
///
/// Long notional is attributed per asset from whichever side is long:
/// the majority-side notional when the majority is long, otherwise the
/// minority-side notional. Short notional is the remainder. A snapshot
/// with zero total notional yields a global L/S ratio of 0.
pub fn aggregate_global(summary: &PositionSummary, timestamp: DateTime<Utc>) -> GlobalMetrics {
    let total_notional_volume: f64 = summary.data.iter().map(|row| row.total_notional).sum();

    let long_positions_notional: f64 = summary
        .data
        .iter()
        .map(|row| match row.majority_side {
            Some(Side::Long) => row.majority_notional,
            _ => row.minority_notional,
        })
        .sum();
    let short_positions_notional = total_notional_volume - long_positions_notional;

    let long_positions_count: u64 = summary.data.iter().map(|row| row.traders_long).sum();
    let short_positions_count: u64 = summary.data.iter().map(|row| row.traders_short).sum();

    let global_ls_ratio = if total_notional_volume != 0.0 {
        long_positions_notional / total_notional_volume
    } else {
        0.0
    };

    GlobalMetrics {
        total_notional_volume,
        long_positions_notional,
        short_positions_notional,
        total_tickers: summary.data.len(),
        long_positions_count,
        short_positions_count,
        global_ls_ratio,
        base_currency: "USD".to_string(),
        timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PositionRow;

    fn row(asset: &str, side: Option<Side>, total: f64, maj: f64, min: f64) -> PositionRow {
        PositionRow {
            asset: asset.to_string(),
            total_notional: total,
            majority_side: side,
            majority_notional: maj,
            minority_notional: min,
            ls_ratio: 1.0,
            traders_long: 10,
            traders_short: 5,
            open_interest: total,
        }
    }

    #[test]
    fn test_long_notional_attribution_by_majority_side() {
        let summary = PositionSummary {
            data: vec![
                row("BTC", Some(Side::Long), 100.0, 70.0, 30.0),
                row("ETH", Some(Side::Short), 50.0, 35.0, 15.0),
            ],
            last_updated: "2025-06-01T12:00:00Z".to_string(),
        };

        let global = aggregate_global(&summary, Utc::now());
        assert_eq!(global.total_notional_volume, 150.0);
        // BTC majority is long (70), ETH minority is long (15)
        assert_eq!(global.long_positions_notional, 85.0);
        assert_eq!(global.short_positions_notional, 65.0);
        assert_eq!(global.total_tickers, 2);
        assert_eq!(global.long_positions_count, 20);
        assert_eq!(global.short_positions_count, 10);
        assert!((global.global_ls_ratio - 85.0 / 150.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_notional_yields_zero_ratio() {
        let summary = PositionSummary {
            data: vec![],
            last_updated: "2025-06-01T12:00:00Z".to_string(),
        };
        let global = aggregate_global(&summary, Utc::now());
        assert_eq!(global.global_ls_ratio, 0.0);
        assert_eq!(global.total_tickers, 0);
    }
}

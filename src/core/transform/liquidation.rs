//! Liquidation aggregation
//!
//! Groups raw liquidation events into fixed-width price buckets, splits
//! long (positive) from short (negative) volume, and derives the scalar
//! metrics alongside the distribution. Deterministic given its input.

use crate::domain::{
    DistributionPoint, LiquidationDistribution, LiquidationLevels, LiquidationMetrics, Result,
    TidemarkError,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Seconds between refreshes, stamped onto every distribution
const UPDATE_INTERVAL_SECS: u32 = 60;

/// Decimal places for bucket volumes
const VOLUME_PRECISION: u8 = 2;

/// Decimal places for scalar metrics
const METRIC_PRECISION: u8 = 8;

fn round_to(value: f64, places: u8) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Aggregate raw liquidation levels into metrics and a price-bucketed
/// distribution
///
/// Bucketing uses floor division: a price level lands in the bucket
/// `floor(price / interval) * interval`. Cumulative totals are running
/// sums in ascending price order.
///
/// # Errors
///
/// Returns a validation error if a price key is not numeric or the
/// interval is not positive.
pub fn aggregate_liquidations(
    levels: &LiquidationLevels,
    asset: &str,
    price_interval: f64,
    timestamp: DateTime<Utc>,
) -> Result<(LiquidationMetrics, LiquidationDistribution)> {
    if price_interval <= 0.0 {
        return Err(TidemarkError::Validation(format!(
            "price_interval must be positive, got {price_interval}"
        )));
    }

    let mut total_longs = 0.0f64;
    let mut total_shorts = 0.0f64;
    let mut largest_single = 0.0f64;
    let mut current_price = 0.0f64;

    // Bucket key is the integer lower edge; BTreeMap keeps price order
    let mut buckets: BTreeMap<i64, (f64, f64)> = BTreeMap::new();

    for (price_key, wallets) in levels {
        let price: f64 = price_key.parse().map_err(|_| {
            TidemarkError::Validation(format!(
                "{asset}: invalid price level '{price_key}' in liquidation data"
            ))
        })?;
        current_price = current_price.max(price);
        let bucket = ((price / price_interval).floor() * price_interval) as i64;

        let entry = buckets.entry(bucket).or_insert((0.0, 0.0));
        for amount in wallets.values() {
            largest_single = largest_single.max(amount.abs());
            if *amount > 0.0 {
                entry.0 += amount;
                total_longs += amount;
            } else {
                entry.1 += amount.abs();
                total_shorts += amount.abs();
            }
        }
    }

    let mut distribution = Vec::with_capacity(buckets.len());
    let mut cumulative_longs = 0.0f64;
    let mut cumulative_shorts = 0.0f64;
    for (bucket, (longs, shorts)) in buckets {
        if longs <= 0.0 && shorts <= 0.0 {
            continue;
        }
        cumulative_longs += longs;
        cumulative_shorts += shorts;
        distribution.push(DistributionPoint {
            price: bucket as f64,
            long_liquidations: round_to(longs, VOLUME_PRECISION),
            short_liquidations: round_to(shorts, VOLUME_PRECISION),
            cumulative_longs: round_to(cumulative_longs, VOLUME_PRECISION),
            cumulative_shorts: round_to(cumulative_shorts, VOLUME_PRECISION),
        });
    }

    let metrics = LiquidationMetrics {
        long_volume: round_to(total_longs, METRIC_PRECISION),
        short_volume: round_to(total_shorts, METRIC_PRECISION),
        largest_single: round_to(largest_single, METRIC_PRECISION),
        total_volume: round_to(total_longs + total_shorts, METRIC_PRECISION),
    };

    let dist = LiquidationDistribution {
        asset: asset.to_string(),
        distribution,
        current_price,
        timestamp,
        update_interval: UPDATE_INTERVAL_SECS,
        base_currency: "USD".to_string(),
        precision: VOLUME_PRECISION,
    };

    Ok((metrics, dist))
}

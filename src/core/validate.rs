//! Record validation
//!
//! Mirrors the declared schema constraints: non-negative ratios and
//! volumes, non-empty payloads, positive distribution prices. Invalid
//! records are dropped and reported individually; a bad record never
//! rejects its siblings.

use crate::domain::{GlobalMetrics, LsTrend, ProcessedAsset, Result, TidemarkError};

/// A per-record validation rejection: asset plus reason
pub type ValidationFailure = (String, String);

/// Validate a batch of processed per-asset records
///
/// Returns the records that satisfy the schema plus one failure entry
/// per dropped record.
pub fn validate_positions(
    records: Vec<ProcessedAsset>,
) -> (Vec<ProcessedAsset>, Vec<ValidationFailure>) {
    let mut valid = Vec::with_capacity(records.len());
    let mut failures = Vec::new();

    for record in records {
        match check_position(&record) {
            Ok(()) => valid.push(record),
            Err(reason) => {
                tracing::warn!(asset = %record.asset, reason = %reason, "Dropping invalid record");
                failures.push((record.asset.clone(), reason));
            }
        }
    }

    (valid, failures)
}

fn check_position(record: &ProcessedAsset) -> std::result::Result<(), String> {
    if record.asset.is_empty() {
        return Err("asset symbol is empty".to_string());
    }
    if record.is_empty() {
        return Err("record carries no data sections".to_string());
    }

    if let Some(position) = &record.position {
        if position.ls_ratio < 0.0 {
            return Err(format!("ls_ratio must be >= 0, got {}", position.ls_ratio));
        }
        if position.total_notional < 0.0 {
            return Err(format!(
                "total_notional must be >= 0, got {}",
                position.total_notional
            ));
        }
    }

    if let Some(funding) = &record.funding {
        if !funding.rate.is_finite() {
            return Err(format!("funding rate is not finite: {}", funding.rate));
        }
    }

    if let Some(metrics) = &record.liquidation_metrics {
        if metrics.total_volume < 0.0 || metrics.long_volume < 0.0 || metrics.short_volume < 0.0 {
            return Err("liquidation volumes must be >= 0".to_string());
        }
        if metrics.largest_single < 0.0 {
            return Err("largest_single must be >= 0".to_string());
        }
    }

    if let Some(dist) = &record.distribution {
        for point in &dist.distribution {
            if point.price <= 0.0 {
                return Err(format!("distribution price must be positive, got {}", point.price));
            }
            if point.long_liquidations < 0.0 || point.short_liquidations < 0.0 {
                return Err("distribution volumes must be >= 0".to_string());
            }
        }
    }

    Ok(())
}

/// Validate the global aggregate record
///
/// # Errors
///
/// Returns a validation error naming the violated constraint.
pub fn validate_global(record: &GlobalMetrics) -> Result<()> {
    if record.global_ls_ratio < 0.0 {
        return Err(TidemarkError::Validation(format!(
            "global_ls_ratio must be >= 0, got {}",
            record.global_ls_ratio
        )));
    }
    if record.total_notional_volume < 0.0 {
        return Err(TidemarkError::Validation(format!(
            "total_notional_volume must be >= 0, got {}",
            record.total_notional_volume
        )));
    }
    Ok(())
}

/// Validate normalized trend series, dropping invalid entries individually
pub fn validate_trends(trends: Vec<LsTrend>) -> (Vec<LsTrend>, Vec<ValidationFailure>) {
    let mut valid = Vec::with_capacity(trends.len());
    let mut failures = Vec::new();

    for trend in trends {
        if trend.points.is_empty() {
            failures.push((trend.asset.clone(), "trend has no points".to_string()));
            continue;
        }
        if trend.points.iter().any(|p| !p.ls_ratio.is_finite()) {
            failures.push((trend.asset.clone(), "non-finite ls_ratio".to_string()));
            continue;
        }
        if trend.points.iter().any(|p| p.notional_delta < 0.0) {
            failures.push((trend.asset.clone(), "negative notional_delta".to_string()));
            continue;
        }
        valid.push(trend);
    }

    (valid, failures)
}

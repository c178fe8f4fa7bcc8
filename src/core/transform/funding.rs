//! Funding-history normalization

use crate::domain::{FundingEntry, FundingRate, Result, TidemarkError};
use chrono::{TimeZone, Utc};

/// Normalize the most recent funding entry
///
/// The upstream history is ordered oldest-first; only the latest entry is
/// kept. The `coin` discriminator is dropped and the decimal strings are
/// parsed. Returns `Ok(None)` for an empty history.
///
/// # Errors
///
/// Returns a validation error if the rate or premium cannot be parsed,
/// or the timestamp is out of range.
pub fn normalize_funding(entries: &[FundingEntry]) -> Result<Option<FundingRate>> {
    let Some(latest) = entries.last() else {
        return Ok(None);
    };

    let rate: f64 = latest.funding_rate.parse().map_err(|_| {
        TidemarkError::Validation(format!(
            "{}: invalid funding rate '{}'",
            latest.coin, latest.funding_rate
        ))
    })?;

    let premium: f64 = if latest.premium.is_empty() {
        0.0
    } else {
        latest.premium.parse().map_err(|_| {
            TidemarkError::Validation(format!(
                "{}: invalid premium '{}'",
                latest.coin, latest.premium
            ))
        })?
    };

    let time = Utc
        .timestamp_millis_opt(latest.time)
        .single()
        .ok_or_else(|| {
            TidemarkError::Validation(format!(
                "{}: funding timestamp {} out of range",
                latest.coin, latest.time
            ))
        })?;

    Ok(Some(FundingRate {
        time,
        rate,
        premium,
    }))
}

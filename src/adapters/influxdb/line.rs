//! Line protocol encoding
//!
//! Builds InfluxDB line protocol by hand: measurement, tags sorted as
//! given, fields, nanosecond timestamp. Records carry time-partition
//! tags (year/month/day) alongside business tags so day-scoped queries
//! prune cheaply without inflating measurement cardinality.

use crate::domain::{GlobalMetrics, ProcessedAsset};
use chrono::{DateTime, Datelike, Utc};
use std::fmt::Write as _;

/// Incremental builder for one line-protocol point
pub struct LineBuilder {
    measurement: String,
    tags: Vec<(String, String)>,
    fields: Vec<(String, String)>,
    timestamp_ns: i64,
}

impl LineBuilder {
    pub fn new(measurement: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            measurement: measurement.to_string(),
            tags: Vec::new(),
            fields: Vec::new(),
            timestamp_ns: timestamp_nanos(timestamp),
        }
    }

    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.tags.push((key.to_string(), value.to_string()));
        self
    }

    pub fn field_f64(mut self, key: &str, value: f64) -> Self {
        self.fields.push((key.to_string(), format!("{value}")));
        self
    }

    pub fn field_i64(mut self, key: &str, value: i64) -> Self {
        self.fields.push((key.to_string(), format!("{value}i")));
        self
    }

    /// Render the point, or `None` when it has no fields (a fieldless
    /// point is invalid line protocol)
    pub fn build(self) -> Option<String> {
        if self.fields.is_empty() {
            return None;
        }

        let mut line = escape_measurement(&self.measurement);
        for (key, value) in &self.tags {
            let _ = write!(line, ",{}={}", escape_tag(key), escape_tag(value));
        }
        line.push(' ');
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            let _ = write!(line, "{}={}", escape_tag(key), value);
        }
        let _ = write!(line, " {}", self.timestamp_ns);
        Some(line)
    }
}

/// Encode one processed asset record as an `asset_positions` point
///
/// Only the sections the record actually carries become fields, so a
/// partial record still produces a valid point.
pub fn encode_position(record: &ProcessedAsset) -> Option<String> {
    let mut builder = LineBuilder::new("asset_positions", record.timestamp);

    for (key, value) in time_partition(record.timestamp) {
        builder = builder.tag(key, &value);
    }
    builder = builder.tag("asset", &record.asset);

    if let Some(position) = &record.position {
        if let Some(side) = &position.majority_side {
            builder = builder.tag("majority_side", &side.to_string());
        }
        builder = builder
            .field_f64("total_notional", position.total_notional)
            .field_f64("ls_ratio", position.ls_ratio)
            .field_f64("majority_notional", position.majority_notional)
            .field_f64("minority_notional", position.minority_notional)
            .field_i64("traders_long", position.traders_long as i64)
            .field_i64("traders_short", position.traders_short as i64)
            .field_f64("open_interest", position.open_interest);
    }

    if let Some(funding) = &record.funding {
        builder = builder
            .field_f64("funding_rate", funding.rate)
            .field_f64("funding_premium", funding.premium);
    }

    if let Some(metrics) = &record.liquidation_metrics {
        builder = builder
            .field_f64("liquidation_total_volume", metrics.total_volume)
            .field_f64("liquidation_largest_single", metrics.largest_single)
            .field_f64("liquidation_long_volume", metrics.long_volume)
            .field_f64("liquidation_short_volume", metrics.short_volume);
    }

    builder.build()
}

/// Encode the global aggregate as a `global_positions` point
pub fn encode_global(record: &GlobalMetrics) -> Option<String> {
    let mut builder = LineBuilder::new("global_positions", record.timestamp);

    for (key, value) in time_partition(record.timestamp) {
        builder = builder.tag(key, &value);
    }

    builder
        .tag("base_currency", &record.base_currency)
        .field_f64("total_notional_volume", record.total_notional_volume)
        .field_f64("long_positions_notional", record.long_positions_notional)
        .field_f64("short_positions_notional", record.short_positions_notional)
        .field_i64("total_tickers", record.total_tickers as i64)
        .field_i64("long_positions_count", record.long_positions_count as i64)
        .field_i64("short_positions_count", record.short_positions_count as i64)
        .field_f64("global_ls_ratio", record.global_ls_ratio)
        .build()
}

fn time_partition(timestamp: DateTime<Utc>) -> [(&'static str, String); 3] {
    [
        ("year", format!("{:04}", timestamp.year())),
        ("month", format!("{:02}", timestamp.month())),
        ("day", format!("{:02}", timestamp.day())),
    ]
}

fn timestamp_nanos(timestamp: DateTime<Utc>) -> i64 {
    timestamp
        .timestamp_nanos_opt()
        .unwrap_or_else(|| timestamp.timestamp_millis().saturating_mul(1_000_000))
}

fn escape_measurement(value: &str) -> String {
    value.replace(',', "\\,").replace(' ', "\\ ")
}

fn escape_tag(value: &str) -> String {
    value
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

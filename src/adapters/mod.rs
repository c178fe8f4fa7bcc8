//! External system integrations
//!
//! This module provides adapters for the systems the pipeline talks to:
//!
//! - [`hyperdash`] - Hyperdash analytics + Hyperliquid info APIs
//! - [`influxdb`] - InfluxDB v2 time-series storage
//!
//! The pipeline core depends only on the traits in [`traits`]; the
//! concrete clients here implement them, and tests swap in in-memory
//! fakes.

pub mod hyperdash;
pub mod influxdb;
pub mod traits;

pub use hyperdash::HyperdashSource;
pub use influxdb::InfluxDbStore;
pub use traits::{MarketDataSource, TimeSeriesStore};

//! Core domain types and models
//!
//! This module defines the data model shared by the pipeline core and the
//! adapters: raw wire payloads, normalized records, and the error
//! hierarchy. Raw types mirror the upstream JSON; normalized types are
//! what validation and storage consume.

pub mod errors;
pub mod global;
pub mod liquidation;
pub mod market;
pub mod position;
pub mod result;
pub mod trend;

// Re-export commonly used types
pub use errors::{SourceError, StoreError, TidemarkError};
pub use global::GlobalMetrics;
pub use liquidation::{DistributionPoint, LiquidationDistribution};
pub use market::{
    extract_asset_names, FundingEntry, LiquidationLevels, PositionRow, PositionSummary, Side,
    TrendRow,
};
pub use position::{
    AssetFetchResult, FundingRate, LiquidationMetrics, PositionSnapshot, ProcessedAsset,
};
pub use result::Result;
pub use trend::{LsTrend, TrendPoint};

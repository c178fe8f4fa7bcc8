//! Pure transformation functions
//!
//! Each transform is deterministic given its input; failures surface as
//! validation errors and are isolated per sub-step by the processor.

pub mod funding;
pub mod global;
pub mod liquidation;
pub mod trend;

pub use funding::normalize_funding;
pub use global::aggregate_global;
pub use liquidation::aggregate_liquidations;
pub use trend::normalize_trends;

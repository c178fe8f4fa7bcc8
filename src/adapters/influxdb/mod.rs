//! InfluxDB v2 adapter
//!
//! Line-protocol writes, bucket retention management, and the
//! downsampling task that feeds the compressed bucket.

pub mod client;
pub mod line;

pub use client::InfluxDbStore;
pub use line::{encode_global, encode_position, LineBuilder};

//! Hyperdash / Hyperliquid source adapter

pub mod client;

pub use client::HyperdashSource;

// Tidemark - Perpetuals Market-Data Ingestion Pipeline
// Copyright (c) 2025 Tidemark Contributors
// Licensed under the MIT License

//! # Tidemark - Perpetuals Market-Data Ingestion
//!
//! Tidemark is a single-process batch ingestion job that pulls
//! market-position, funding-rate and liquidation data for a set of
//! crypto assets from the Hyperdash analytics and Hyperliquid info
//! APIs, transforms it into normalized records, and persists them into
//! InfluxDB with tiered retention.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Fetching** per-asset liquidation and funding data, plus shared
//!   position and L/S trend snapshots, with retry and backoff
//! - **Transforming** raw payloads into typed records (price-bucketed
//!   liquidation distributions, normalized funding rates, global
//!   aggregates, trend series)
//! - **Validating** records against declared constraints, dropping bad
//!   records individually
//! - **Loading** validated records into InfluxDB via line protocol
//!
//! ## Architecture
//!
//! Tidemark follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (coordinator, processor, breaker, stats,
//!   transforms, validation)
//! - [`adapters`] - External integrations (Hyperdash, InfluxDB)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tidemark::adapters::{HyperdashSource, InfluxDbStore};
//! use tidemark::config::load_config;
//! use tidemark::core::{BatchCoordinator, PipelineSettings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("tidemark.toml")?;
//!
//!     let source = Arc::new(HyperdashSource::new(config.sources.clone())?);
//!     let store = Arc::new(InfluxDbStore::new(config.influxdb.clone())?);
//!
//!     let coordinator = BatchCoordinator::new(source, store, PipelineSettings::default());
//!     let report = coordinator.run(&config.assets.symbols).await;
//!
//!     println!("completed: {}", report.completed);
//!     Ok(())
//! }
//! ```
//!
//! ## Failure Isolation
//!
//! Per-asset work is guarded by a keyed circuit breaker with separate
//! `fetch:` and `process:` namespaces; a failing asset is skipped after
//! repeated failures and retried once its reset timeout passes. Only a
//! failed shared-snapshot fetch aborts a run. Every failure is recorded
//! in an ordered, per-stage failure log emitted with the run summary.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;

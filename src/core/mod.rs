//! Core pipeline logic
//!
//! This module contains the orchestration and transformation logic for
//! one ingestion run.
//!
//! # Modules
//!
//! - [`coordinator`] - Run state machine: shared fetch, batch loop, global finalize
//! - [`processor`] - Per-asset fetch and transform under circuit-breaker guard
//! - [`breaker`] - Keyed circuit breaker
//! - [`stats`] - Per-stage counters and the ordered failure log
//! - [`transform`] - Pure data transforms (liquidation, funding, global, trend)
//! - [`validate`] - Record constraint checks
//!
//! # Run Workflow
//!
//! 1. **Fetch common**: position summary and L/S trend snapshots, once
//! 2. **Batch loop**: per batch, fan out asset fetches, process, validate, write
//! 3. **Finalize global**: aggregate, validate and write the global record
//! 4. **Report**: merge batch statistics and emit the run summary

pub mod breaker;
pub mod coordinator;
pub mod processor;
pub mod stats;
pub mod transform;
pub mod validate;

pub use breaker::CircuitBreaker;
pub use coordinator::{BatchCoordinator, PipelineSettings, RunReport, GLOBAL_ASSET};
pub use processor::{AssetProcessor, FetchOutcome};
pub use stats::{FailureRecord, RunStats, Stage, StatsSummary};

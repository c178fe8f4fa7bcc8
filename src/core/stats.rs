//! Run statistics and failure accounting
//!
//! Tracks per-stage success/failure counts plus an ordered, append-only
//! failure log. One instance is scoped per batch and one per run; batch
//! stats are merged into the run stats at each batch boundary, so the
//! concatenation order of failure records follows batch order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pipeline stage a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Per-asset fetch
    Fetch,
    /// Per-asset processing (asset-level outcome)
    Process,
    /// Funding normalization sub-step
    ProcessFunding,
    /// Position lookup sub-step
    ProcessPosition,
    /// Liquidation aggregation sub-step
    ProcessLiquidation,
    /// Schema validation
    Validate,
    /// Store write
    Write,
    /// Shared-snapshot fetch at run start
    FetchCommon,
    /// Global aggregate processing at run end
    ProcessGlobal,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Process => "process",
            Stage::ProcessFunding => "process_funding",
            Stage::ProcessPosition => "process_position",
            Stage::ProcessLiquidation => "process_liquidation",
            Stage::Validate => "validate",
            Stage::Write => "write",
            Stage::FetchCommon => "fetch_common",
            Stage::ProcessGlobal => "process_global",
        };
        write!(f, "{name}")
    }
}

/// One recorded failure; immutable once created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Asset the failure is attributed to (`GLOBAL` for run-level failures)
    pub asset: String,

    /// Stage the failure occurred in
    pub stage: Stage,

    /// Human-readable error description
    pub error: String,

    /// When the failure was recorded
    pub timestamp: DateTime<Utc>,
}

/// Read-only snapshot of all counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSummary {
    pub successful_fetches: usize,
    pub failed_fetches: usize,
    pub successful_processes: usize,
    pub failed_processes: usize,
    pub successful_validations: usize,
    pub failed_validations: usize,
    pub successful_writes: usize,
    pub failed_writes: usize,
    pub failure_count: usize,
}

/// Accumulator of per-stage outcomes and the itemized failure log
///
/// Append-only and infallible.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub successful_fetches: usize,
    pub failed_fetches: usize,
    pub successful_processes: usize,
    pub failed_processes: usize,
    pub successful_validations: usize,
    pub failed_validations: usize,
    pub successful_writes: usize,
    pub failed_writes: usize,
    failures: Vec<FailureRecord>,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a failure record with the current time
    pub fn record_failure(&mut self, asset: &str, stage: Stage, error: impl Into<String>) {
        self.failures.push(FailureRecord {
            asset: asset.to_string(),
            stage,
            error: error.into(),
            timestamp: Utc::now(),
        });
    }

    /// Absorb another instance: field-wise counter sums plus ordered
    /// concatenation of its failure log
    pub fn merge_from(&mut self, other: RunStats) {
        self.successful_fetches += other.successful_fetches;
        self.failed_fetches += other.failed_fetches;
        self.successful_processes += other.successful_processes;
        self.failed_processes += other.failed_processes;
        self.successful_validations += other.successful_validations;
        self.failed_validations += other.failed_validations;
        self.successful_writes += other.successful_writes;
        self.failed_writes += other.failed_writes;
        self.failures.extend(other.failures);
    }

    /// Ordered view of every recorded failure
    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    /// Read-only counter snapshot; does not mutate state
    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            successful_fetches: self.successful_fetches,
            failed_fetches: self.failed_fetches,
            successful_processes: self.successful_processes,
            failed_processes: self.failed_processes,
            successful_validations: self.successful_validations,
            failed_validations: self.failed_validations,
            successful_writes: self.successful_writes,
            failed_writes: self.failed_writes,
            failure_count: self.failures.len(),
        }
    }

    /// Log the counter summary at info level
    pub fn log_summary(&self, scope: &str) {
        tracing::info!(
            scope = scope,
            successful_fetches = self.successful_fetches,
            failed_fetches = self.failed_fetches,
            successful_processes = self.successful_processes,
            failed_processes = self.failed_processes,
            successful_validations = self.successful_validations,
            failed_validations = self.failed_validations,
            successful_writes = self.successful_writes,
            failed_writes = self.failed_writes,
            "Pipeline stage totals"
        );
    }

    /// Log every failure record, or a note that there were none
    pub fn log_failures(&self) {
        if self.failures.is_empty() {
            tracing::info!("No failures recorded");
            return;
        }

        tracing::warn!(count = self.failures.len(), "Failure details");
        for failure in &self.failures {
            tracing::warn!(
                asset = %failure.asset,
                stage = %failure.stage,
                error = %failure.error,
                timestamp = %failure.timestamp.format("%Y-%m-%d %H:%M:%S"),
                "Recorded failure"
            );
        }
    }
}

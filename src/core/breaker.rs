//! Circuit breaker keyed by operation
//!
//! Prevents repeated calls against a systematically failing upstream.
//! Failure tracking is keyed (e.g. `fetch:BTC`), so one asset tripping
//! its breaker never blocks the others. Recovery is evaluated lazily at
//! the next [`CircuitBreaker::can_proceed`] check, not on a timer.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default number of consecutive failures before a key's circuit opens
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Default cooldown before an open circuit may close again
pub const DEFAULT_RESET_TIMEOUT: Duration = Duration::from_secs(300);

/// Per-key failure state
///
/// Invariant: `is_open` is only set once `consecutive_failures` has
/// reached the breaker's threshold.
#[derive(Debug, Clone, Default)]
struct OperationState {
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    is_open: bool,
}

/// Per-operation-key failure tracker with timed recovery
///
/// Entries are created lazily on first reference and live for the whole
/// run; the key space is bounded by the asset universe. The internal map
/// is mutex-guarded because per-asset tasks run on a multi-threaded
/// runtime.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    reset_timeout: Duration,
    states: Mutex<HashMap<String, OperationState>>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_THRESHOLD, DEFAULT_RESET_TIMEOUT)
    }
}

impl CircuitBreaker {
    /// Create a breaker with the given threshold and reset timeout
    ///
    /// Both apply per instance, not per key.
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            reset_timeout,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Check whether an operation may proceed
    ///
    /// Returns `true` if the key's circuit is closed, or if it is open
    /// but the reset timeout has elapsed since the last failure. The
    /// latter also closes the circuit and clears the failure count; the
    /// next `record_failure`/`record_success` determines the new state.
    pub fn can_proceed(&self, operation_key: &str) -> bool {
        let mut states = self.states.lock().expect("breaker lock poisoned");
        let state = states.entry(operation_key.to_string()).or_default();

        if !state.is_open {
            return true;
        }

        let elapsed = state.last_failure.map(|at| at.elapsed());
        if matches!(elapsed, Some(e) if e > self.reset_timeout) {
            state.is_open = false;
            state.consecutive_failures = 0;
            return true;
        }

        false
    }

    /// Record a failure for an operation
    ///
    /// A failure older than the reset timeout starts a fresh streak at 1;
    /// otherwise the streak increments. Reaching the threshold opens the
    /// circuit.
    pub fn record_failure(&self, operation_key: &str) {
        let mut states = self.states.lock().expect("breaker lock poisoned");
        let state = states.entry(operation_key.to_string()).or_default();

        let stale = matches!(
            state.last_failure.map(|at| at.elapsed()),
            Some(e) if e > self.reset_timeout
        );
        if stale {
            state.consecutive_failures = 1;
        } else {
            state.consecutive_failures += 1;
        }

        state.last_failure = Some(Instant::now());
        if state.consecutive_failures >= self.failure_threshold {
            state.is_open = true;
            tracing::warn!(
                operation_key = operation_key,
                failures = state.consecutive_failures,
                "Circuit opened"
            );
        }
    }

    /// Record a success, closing the key's circuit and resetting its streak
    pub fn record_success(&self, operation_key: &str) {
        let mut states = self.states.lock().expect("breaker lock poisoned");
        let state = states.entry(operation_key.to_string()).or_default();
        state.consecutive_failures = 0;
        state.is_open = false;
    }

    /// True if the key's circuit is currently open (no lazy reset applied)
    pub fn is_open(&self, operation_key: &str) -> bool {
        let states = self.states.lock().expect("breaker lock poisoned");
        states.get(operation_key).is_some_and(|s| s.is_open)
    }
}

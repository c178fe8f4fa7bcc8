//! Logging and observability
//!
//! Structured logging built on `tracing`: console output for
//! development plus an optional JSON rolling-file layer.
//!
//! # Example
//!
//! ```no_run
//! use tidemark::logging::init_logging;
//! use tidemark::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

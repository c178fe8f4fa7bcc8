//! Configuration management
//!
//! TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! Tidemark uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - Environment variable overrides (`TIDEMARK_*` prefix)
//! - Default values for optional settings
//! - Validation on load
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [sources]
//! hyperdash_url = "https://hyperdash.example/api/v1"
//! hyperliquid_url = "https://api.hyperliquid.example"
//! api_key = "${TIDEMARK_SOURCES_API_KEY}"
//!
//! [assets]
//! symbols = ["BTC", "ETH", "SOL"]
//!
//! [pipeline]
//! batch_size = 5
//! price_interval = 500.0
//!
//! [influxdb]
//! url = "http://localhost:8086"
//! token = "${TIDEMARK_INFLUXDB_TOKEN}"
//! org = "tidemark"
//! ```

pub mod loader;
pub mod schema;

pub use loader::load_config;
pub use schema::{
    ApplicationConfig, AssetsConfig, InfluxDbConfig, LoggingConfig, PipelineConfig, RetryConfig,
    SourcesConfig, TidemarkConfig,
};

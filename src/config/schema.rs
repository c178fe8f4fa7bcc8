//! Configuration schema types
//!
//! Defines the structure of the TOML configuration file. Every section
//! validates itself on load so a bad file fails before any network call.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TidemarkConfig {
    /// Application-level settings
    pub application: ApplicationConfig,

    /// Upstream market-data source configuration
    pub sources: SourcesConfig,

    /// Asset universe
    #[serde(default)]
    pub assets: AssetsConfig,

    /// Pipeline tuning (batching, circuit breaker, transforms)
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// InfluxDB target configuration
    pub influxdb: InfluxDbConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TidemarkConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid value found.
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.sources.validate()?;
        self.pipeline.validate()?;
        self.influxdb.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name used in logs
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dry run mode (skip InfluxDB writes)
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Retry configuration for the HTTP source layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per request (including the first)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay in seconds; attempt n waits base * 2^n
    #[serde(default = "default_backoff_base_seconds")]
    pub backoff_base_seconds: u64,

    /// Cap on any single backoff delay in seconds
    #[serde(default = "default_max_delay_seconds")]
    pub max_delay_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_base_seconds: default_backoff_base_seconds(),
            max_delay_seconds: default_max_delay_seconds(),
        }
    }
}

/// Upstream source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Base URL of the Hyperdash analytics API
    pub hyperdash_url: String,

    /// Base URL of the Hyperliquid info API
    pub hyperliquid_url: String,

    /// API key for the Hyperdash analytics API
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Days of liquidation history to request
    #[serde(default = "default_liquidation_days")]
    pub liquidation_days: u32,

    /// Hours of funding history to request
    #[serde(default = "default_funding_window_hours")]
    pub funding_window_hours: u64,

    /// Retry behavior
    #[serde(default)]
    pub retry: RetryConfig,
}

impl SourcesConfig {
    fn validate(&self) -> Result<(), String> {
        if self.hyperdash_url.is_empty() {
            return Err("sources.hyperdash_url must not be empty".to_string());
        }
        if self.hyperliquid_url.is_empty() {
            return Err("sources.hyperliquid_url must not be empty".to_string());
        }
        for url in [&self.hyperdash_url, &self.hyperliquid_url] {
            url::Url::parse(url).map_err(|e| format!("Invalid source URL '{url}': {e}"))?;
        }
        if self.timeout_seconds == 0 {
            return Err("sources.timeout_seconds must be > 0".to_string());
        }
        if self.liquidation_days == 0 {
            return Err("sources.liquidation_days must be > 0".to_string());
        }
        Ok(())
    }
}

/// Asset universe configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Assets to ingest; empty means derive from the position summary
    #[serde(default)]
    pub symbols: Vec<String>,
}

/// Pipeline tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Assets per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Consecutive failures before a circuit opens
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Seconds an open circuit stays open
    #[serde(default = "default_reset_timeout_seconds")]
    pub reset_timeout_seconds: u64,

    /// Liquidation price bucket width in USD
    #[serde(default = "default_price_interval")]
    pub price_interval: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            failure_threshold: default_failure_threshold(),
            reset_timeout_seconds: default_reset_timeout_seconds(),
            price_interval: default_price_interval(),
        }
    }
}

impl PipelineConfig {
    fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("pipeline.batch_size must be > 0".to_string());
        }
        if self.failure_threshold == 0 {
            return Err("pipeline.failure_threshold must be > 0".to_string());
        }
        if self.price_interval <= 0.0 {
            return Err(format!(
                "pipeline.price_interval must be > 0, got {}",
                self.price_interval
            ));
        }
        Ok(())
    }

    pub fn reset_timeout(&self) -> Duration {
        Duration::from_secs(self.reset_timeout_seconds)
    }
}

/// InfluxDB target configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluxDbConfig {
    /// Base URL of the InfluxDB v2 instance
    pub url: String,

    /// API token
    pub token: String,

    /// Organization name
    pub org: String,

    /// Raw data bucket name
    #[serde(default = "default_raw_bucket")]
    pub bucket: String,

    /// Downsampled data bucket name
    #[serde(default = "default_compressed_bucket")]
    pub compressed_bucket: String,

    /// Raw bucket retention in days
    #[serde(default = "default_raw_retention_days")]
    pub raw_retention_days: u64,

    /// Compressed bucket retention in days
    #[serde(default = "default_compressed_retention_days")]
    pub compressed_retention_days: u64,

    /// Hours a point must age in the raw bucket before downsampling
    #[serde(default = "default_compression_after_hours")]
    pub compression_after_hours: u64,

    /// Downsampling aggregation window in hours
    #[serde(default = "default_compression_window_hours")]
    pub compression_window_hours: u64,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl InfluxDbConfig {
    fn validate(&self) -> Result<(), String> {
        if self.url.is_empty() {
            return Err("influxdb.url must not be empty".to_string());
        }
        url::Url::parse(&self.url).map_err(|e| format!("Invalid influxdb.url: {e}"))?;
        if self.token.is_empty() {
            return Err("influxdb.token must not be empty".to_string());
        }
        if self.org.is_empty() {
            return Err("influxdb.org must not be empty".to_string());
        }
        if self.bucket == self.compressed_bucket {
            return Err("influxdb.bucket and influxdb.compressed_bucket must differ".to_string());
        }
        if self.raw_retention_days == 0 || self.compressed_retention_days == 0 {
            return Err("influxdb retention must be > 0 days".to_string());
        }
        if self.compression_window_hours == 0 {
            return Err("influxdb.compression_window_hours must be > 0".to_string());
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Write JSON logs to a rolling file in addition to the console
    #[serde(default)]
    pub file_enabled: bool,

    /// Directory for rolling log files
    #[serde(default = "default_log_path")]
    pub file_path: String,

    /// Rotation policy: daily or hourly
    #[serde(default = "default_log_rotation")]
    pub file_rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file_enabled: false,
            file_path: default_log_path(),
            file_rotation: default_log_rotation(),
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        if !["daily", "hourly"].contains(&self.file_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.file_rotation '{}'. Must be 'daily' or 'hourly'",
                self.file_rotation
            ));
        }
        Ok(())
    }
}

fn default_app_name() -> String {
    "tidemark".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base_seconds() -> u64 {
    1
}

fn default_max_delay_seconds() -> u64 {
    30
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_liquidation_days() -> u32 {
    7
}

fn default_funding_window_hours() -> u64 {
    3
}

fn default_batch_size() -> usize {
    5
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_reset_timeout_seconds() -> u64 {
    300
}

fn default_price_interval() -> f64 {
    500.0
}

fn default_raw_bucket() -> String {
    "market-data".to_string()
}

fn default_compressed_bucket() -> String {
    "market-data-compressed".to_string()
}

fn default_raw_retention_days() -> u64 {
    7
}

fn default_compressed_retention_days() -> u64 {
    90
}

fn default_compression_after_hours() -> u64 {
    24
}

fn default_compression_window_hours() -> u64 {
    1
}

fn default_log_path() -> String {
    "logs".to_string()
}

fn default_log_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> TidemarkConfig {
        TidemarkConfig {
            application: ApplicationConfig::default(),
            sources: SourcesConfig {
                hyperdash_url: "https://api.hyperdash.example".to_string(),
                hyperliquid_url: "https://api.hyperliquid.example".to_string(),
                api_key: Some("key".to_string()),
                timeout_seconds: 30,
                liquidation_days: 7,
                funding_window_hours: 24,
                retry: RetryConfig::default(),
            },
            assets: AssetsConfig::default(),
            pipeline: PipelineConfig::default(),
            influxdb: InfluxDbConfig {
                url: "http://localhost:8086".to_string(),
                token: "token".to_string(),
                org: "tidemark".to_string(),
                bucket: default_raw_bucket(),
                compressed_bucket: default_compressed_bucket(),
                raw_retention_days: 7,
                compressed_retention_days: 90,
                compression_after_hours: 24,
                compression_window_hours: 1,
                timeout_seconds: 30,
            },
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_minimal_config_is_valid() {
        assert!(minimal().validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut config = minimal();
        config.application.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = minimal();
        config.pipeline.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_price_interval_rejected() {
        let mut config = minimal();
        config.pipeline.price_interval = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_same_bucket_names_rejected() {
        let mut config = minimal();
        config.influxdb.compressed_bucket = config.influxdb.bucket.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_source_url_rejected() {
        let mut config = minimal();
        config.sources.hyperdash_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_defaults_from_empty_sections() {
        let pipeline: PipelineConfig = toml::from_str("").unwrap();
        assert_eq!(pipeline.batch_size, 5);
        assert_eq!(pipeline.failure_threshold, 3);
        assert_eq!(pipeline.reset_timeout_seconds, 300);
        assert_eq!(pipeline.price_interval, 500.0);
    }
}

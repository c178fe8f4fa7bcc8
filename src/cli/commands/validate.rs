//! Validate config command implementation

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("Configuration is valid");
                c
            }
            Err(e) => {
                println!("Configuration is invalid");
                println!("  Error: {e}");
                return Ok(2);
            }
        };

        println!();
        println!("Configuration Summary:");
        println!("  Application: {}", config.application.name);
        println!("  Log Level: {}", config.application.log_level);
        println!("  Hyperdash URL: {}", config.sources.hyperdash_url);
        println!("  Hyperliquid URL: {}", config.sources.hyperliquid_url);
        println!(
            "  Assets: {}",
            if config.assets.symbols.is_empty() {
                "derived from position summary".to_string()
            } else {
                config.assets.symbols.join(", ")
            }
        );
        println!("  Batch Size: {}", config.pipeline.batch_size);
        println!("  Price Interval: {}", config.pipeline.price_interval);
        println!("  InfluxDB URL: {}", config.influxdb.url);
        println!("  InfluxDB Org: {}", config.influxdb.org);
        println!(
            "  Buckets: {} ({}d) -> {} ({}d)",
            config.influxdb.bucket,
            config.influxdb.raw_retention_days,
            config.influxdb.compressed_bucket,
            config.influxdb.compressed_retention_days
        );
        println!();
        Ok(0)
    }
}

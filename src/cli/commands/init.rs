//! Init command implementation
//!
//! Writes a starter configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "tidemark.toml")]
    pub output: String,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        if Path::new(&self.output).exists() && !self.force {
            println!("Configuration file already exists: {}", self.output);
            println!("  Use --force to overwrite");
            return Ok(2);
        }

        match fs::write(&self.output, example_config()) {
            Ok(()) => {
                println!("Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Export TIDEMARK_SOURCES_API_KEY and TIDEMARK_INFLUXDB_TOKEN");
                println!("     (or put them in a .env file)");
                println!("  3. Validate: tidemark validate-config");
                println!("  4. Run: tidemark ingest");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("Failed to write configuration file");
                println!("  Error: {e}");
                Ok(5)
            }
        }
    }
}

/// Starter configuration template
fn example_config() -> &'static str {
    r#"# Tidemark Configuration File
# Perpetuals market-data ingestion pipeline

[application]
# Log level: trace, debug, info, warn, error
log_level = "info"
# Fetch and process without writing to InfluxDB
dry_run = false

[sources]
hyperdash_url = "https://api.hyperdash.info"
hyperliquid_url = "https://api.hyperliquid.xyz"
# API key for the liquidation endpoint
api_key = "${TIDEMARK_SOURCES_API_KEY}"
timeout_seconds = 30
# Days of liquidation history per request
liquidation_days = 7
# Hours of funding history per request
funding_window_hours = 3

[sources.retry]
max_retries = 3
backoff_base_seconds = 1
max_delay_seconds = 30

[assets]
# Leave empty to derive the universe from the position summary
symbols = ["BTC", "ETH", "SOL"]

[pipeline]
# Assets processed per batch
batch_size = 5
# Consecutive failures before an asset's circuit opens
failure_threshold = 3
# Seconds an open circuit stays open
reset_timeout_seconds = 300
# Liquidation price bucket width in USD
price_interval = 500.0

[influxdb]
url = "http://localhost:8086"
token = "${TIDEMARK_INFLUXDB_TOKEN}"
org = "tidemark"
bucket = "market-data"
compressed_bucket = "market-data-compressed"
raw_retention_days = 7
compressed_retention_days = 90
# Points older than this are downsampled into the compressed bucket
compression_after_hours = 24
compression_window_hours = 1

[logging]
file_enabled = false
file_path = "logs"
file_rotation = "daily"
"#
}

//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::TidemarkConfig;
use crate::domain::errors::TidemarkError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into TidemarkConfig
/// 4. Applies environment variable overrides (TIDEMARK_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsing fails, a
/// referenced environment variable is missing, or validation fails.
pub fn load_config(path: impl AsRef<Path>) -> Result<TidemarkConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(TidemarkError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        TidemarkError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: TidemarkConfig = toml::from_str(&contents)
        .map_err(|e| TidemarkError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        TidemarkError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are passed through untouched. Missing variables are
/// collected and reported together.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("static regex");
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        let trimmed = line.trim_start();

        if trimmed.starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{var_name}}}");
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(TidemarkError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the TIDEMARK_* prefix
///
/// Variables follow the pattern TIDEMARK_<SECTION>_<KEY>, for example
/// TIDEMARK_SOURCES_API_KEY or TIDEMARK_INFLUXDB_TOKEN.
fn apply_env_overrides(config: &mut TidemarkConfig) {
    if let Ok(val) = std::env::var("TIDEMARK_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("TIDEMARK_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }

    if let Ok(val) = std::env::var("TIDEMARK_SOURCES_HYPERDASH_URL") {
        config.sources.hyperdash_url = val;
    }
    if let Ok(val) = std::env::var("TIDEMARK_SOURCES_HYPERLIQUID_URL") {
        config.sources.hyperliquid_url = val;
    }
    if let Ok(val) = std::env::var("TIDEMARK_SOURCES_API_KEY") {
        config.sources.api_key = Some(val);
    }

    if let Ok(val) = std::env::var("TIDEMARK_ASSETS_SYMBOLS") {
        config.assets.symbols = val
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    if let Ok(val) = std::env::var("TIDEMARK_PIPELINE_BATCH_SIZE") {
        if let Ok(size) = val.parse() {
            config.pipeline.batch_size = size;
        }
    }
    if let Ok(val) = std::env::var("TIDEMARK_PIPELINE_PRICE_INTERVAL") {
        if let Ok(interval) = val.parse() {
            config.pipeline.price_interval = interval;
        }
    }

    if let Ok(val) = std::env::var("TIDEMARK_INFLUXDB_URL") {
        config.influxdb.url = val;
    }
    if let Ok(val) = std::env::var("TIDEMARK_INFLUXDB_TOKEN") {
        config.influxdb.token = val;
    }
    if let Ok(val) = std::env::var("TIDEMARK_INFLUXDB_ORG") {
        config.influxdb.org = val;
    }
    if let Ok(val) = std::env::var("TIDEMARK_INFLUXDB_BUCKET") {
        config.influxdb.bucket = val;
    }

    if let Ok(val) = std::env::var("TIDEMARK_LOGGING_FILE_ENABLED") {
        config.logging.file_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("TIDEMARK_LOGGING_FILE_PATH") {
        config.logging.file_path = val;
    }
}

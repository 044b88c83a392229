//! Configuration loader for the `sensordash` backend service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Everything is fixed at process start; the running
//! service never re-reads configuration.

use std::env;

use anyhow::{anyhow, Result};

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u64 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u64>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Read an optional string environment variable with a default value.
macro_rules! env_or {
    ($var_name:expr, $default:expr) => {
        env::var($var_name).unwrap_or_else(|_| $default.to_owned())
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Opaque identifier of the spreadsheet holding the sensor readings.
    pub spreadsheet_id: String,

    /// Path to the local service-account credential file.
    pub credentials_path: String,

    /// Base URL of the Sheets API (overridable for tests).
    pub sheets_api_url: String,

    /// How long a fetched dataset is reused before hitting the sheet again.
    pub cache_ttl_secs: u64,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `SPREADSHEET_ID` – spreadsheet to read sensor rows from
///
/// Optional:
/// - `CREDENTIALS_PATH` – service-account file (default: `credentials.json`)
/// - `SHEETS_API_URL` – API base URL (default: `https://sheets.googleapis.com`)
/// - `CACHE_TTL_SECS` – memoization window in seconds (default: 300)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let spreadsheet_id = require_env!("SPREADSHEET_ID");
    let credentials_path = env_or!("CREDENTIALS_PATH", "credentials.json");
    let sheets_api_url = env_or!("SHEETS_API_URL", "https://sheets.googleapis.com");
    let cache_ttl_secs = parse_env_u64!("CACHE_TTL_SECS", 300);

    Ok(Config {
        spreadsheet_id,
        credentials_path,
        sheets_api_url,
        cache_ttl_secs,
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// The spreadsheet id is shortened the same way an access key would be
    /// masked, since it is the only value worth keeping out of full view.
    pub fn log_config(&self) {
        // ---
        let masked_id = if self.spreadsheet_id.len() > 8 {
            format!("{}****", &self.spreadsheet_id[..8])
        } else {
            self.spreadsheet_id.clone()
        };

        tracing::info!("Configuration loaded:");
        tracing::info!("  SPREADSHEET_ID   : {}", masked_id);
        tracing::info!("  CREDENTIALS_PATH : {}", self.credentials_path);
        tracing::info!("  SHEETS_API_URL   : {}", self.sheets_api_url);
        tracing::info!("  CACHE_TTL_SECS   : {}", self.cache_ttl_secs);
    }
}

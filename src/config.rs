//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `COOLDOWN_SECS` (optional): minimum interval between successful
///   generates per key, defaults to 300 seconds
/// - `DATA_DIR` (optional): directory holding the SQLite database file,
///   defaults to `data`
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: i64,

    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

/// Default generate cooldown if COOLDOWN_SECS is not set.
fn default_cooldown_secs() -> i64 {
    300
}

/// Default data directory if DATA_DIR is not set.
fn default_data_dir() -> String {
    "data".to_string()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable value cannot be parsed
    /// into the expected type (e.g. a non-numeric SERVER_PORT).
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Parse environment variables into Config struct
        // Field names are automatically converted: server_port -> SERVER_PORT
        envy::from_env::<Config>()
    }
}

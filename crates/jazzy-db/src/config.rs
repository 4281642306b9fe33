//! # Application Configuration
//!
//! Settings for the back office, read from defaults and `JAZZY_*` variables.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     JAZZY_DB_PATH=./data/jazzy.db                                      │
//! │     JAZZY_MAX_CONNECTIONS=5                                            │
//! │     JAZZY_ACTIVE_STATUS=Active                                         │
//! │     JAZZY_SOLD_OUT_STATUS="Sold Out"                                   │
//! │     JAZZY_CURRENCY_SYMBOL=$                                            │
//! │                                                                         │
//! │  2. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

use jazzy_core::{ACTIVE_STATUS_NAME, SOLD_OUT_STATUS_NAME};

use crate::pool::DbConfig;

/// Back-office settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Pool size. Default: 5
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Status assigned to new and replenished frames.
    #[serde(default = "default_active_status")]
    pub active_status: String,

    /// Protected status assigned when a frame's quantity reaches zero.
    #[serde(default = "default_sold_out_status")]
    pub sold_out_status: String,

    /// Shown by report output.
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("jazzy.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_active_status() -> String {
    ACTIVE_STATUS_NAME.to_string()
}

fn default_sold_out_status() -> String {
    SOLD_OUT_STATUS_NAME.to_string()
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: default_database_path(),
            max_connections: default_max_connections(),
            active_status: default_active_status(),
            sold_out_status: default_sold_out_status(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

impl AppConfig {
    /// Defaults overridden by `JAZZY_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = AppConfig::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Applies overrides from `lookup` (an environment in production, a map
    /// in tests).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("JAZZY_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database_path = PathBuf::from(path);
        }

        if let Some(max) = lookup("JAZZY_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) if n > 0 => self.max_connections = n,
                _ => warn!(value = %max, "Ignoring invalid JAZZY_MAX_CONNECTIONS"),
            }
        }

        if let Some(name) = lookup("JAZZY_ACTIVE_STATUS").filter(|n| !n.trim().is_empty()) {
            self.active_status = name.trim().to_string();
        }

        if let Some(name) = lookup("JAZZY_SOLD_OUT_STATUS").filter(|n| !n.trim().is_empty()) {
            self.sold_out_status = name.trim().to_string();
        }

        if let Some(symbol) = lookup("JAZZY_CURRENCY_SYMBOL") {
            self.currency_symbol = symbol;
        }
    }

    /// Pool configuration for this application.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path).max_connections(self.max_connections)
    }
}

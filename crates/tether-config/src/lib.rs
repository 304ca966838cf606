//! Tether configuration.
//!
//! TOML-based configuration for the IPC bridge. All sections use
//! defaults, so an empty or partial file is a working config.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tether_config::load_config;
//!
//! let config = load_config().expect("failed to load config");
//! println!("{}", config.logging.filter);
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{BridgeConfig, LoggingConfig, TetherConfig, CONFIG_SCHEMA_VERSION};
pub use toml_loader::{load_from_path, load_from_str};

use tether_common::ConfigError;

/// Load config from the platform default path, creating it if missing.
pub fn load_config() -> Result<TetherConfig, ConfigError> {
    toml_loader::load_default()
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &TetherConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}

//! Core TOML config loading: read from path or platform default.

use crate::schema::TetherConfig;
use crate::validation;
use std::path::Path;
use tether_common::ConfigError;
use tracing::info;

use super::paths::{create_default_config, default_config_path};

/// Parse and validate config from TOML text.
pub fn load_from_str(content: &str) -> Result<TetherConfig, ConfigError> {
    let config: TetherConfig = toml::from_str(content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;
    validation::validate(&config)?;
    Ok(config)
}

/// Load config from a specific TOML file path.
///
/// Missing fields take their serde defaults. Unlike a partial file, an
/// invalid one is an error: a bad allowlist would silently disable host
/// modules.
pub fn load_from_path(path: &Path) -> Result<TetherConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let config = load_from_str(&content)?;
    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load config from the platform-specific default path.
///
/// On macOS: `~/Library/Application Support/tether/config.toml`
/// On Linux: `~/.config/tether/config.toml`
///
/// If the file does not exist, creates a default config file and returns defaults.
pub fn load_default() -> Result<TetherConfig, ConfigError> {
    let path = default_config_path()?;

    match load_from_path(&path) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(_)) => {
            info!("no config found at {}, creating default", path.display());
            create_default_config(&path)?;
            Ok(TetherConfig::default())
        }
        Err(e) => Err(e),
    }
}

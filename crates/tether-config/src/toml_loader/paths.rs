//! Where the config file lives, and seeding it with the template.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tether_common::ConfigError;
use tracing::{debug, info};

use super::template::default_config_toml;

const APP_DIR: &str = "tether";
const FILE_NAME: &str = "config.toml";

/// `<base>/tether/config.toml`.
pub fn config_path_in(base: &Path) -> PathBuf {
    base.join(APP_DIR).join(FILE_NAME)
}

/// Config file under the platform config directory.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|base| config_path_in(&base))
        .ok_or(ConfigError::NoConfigDir)
}

/// Write the commented template to `path`, creating parent directories.
///
/// An existing file is never overwritten. Returns whether a file was
/// written.
pub fn create_default_config(path: &Path) -> Result<bool, ConfigError> {
    let io_error = |at: &Path, source: std::io::Error| ConfigError::Io {
        path: at.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            debug!("config already present at {}", path.display());
            return Ok(false);
        }
        Err(e) => return Err(io_error(path, e)),
    };
    file.write_all(default_config_toml().as_bytes())
        .map_err(|e| io_error(path, e))?;

    info!("created default config at {}", path.display());
    Ok(true)
}

use std::path::PathBuf;

use crate::types::ModuleName;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),

    #[error("no config directory on this platform")]
    NoConfigDir,

    #[error("config I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to hand an envelope to the host. Raised before any callback
/// is left registered.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to serialize envelope: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("transport channel closed")]
    Closed,

    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The host answered through the failure callback. The payload is
    /// relayed untouched.
    #[error("command rejected by host: {0}")]
    Rejected(serde_json::Value),

    #[error("module `{0}` is not allowlisted")]
    NotAllowed(ModuleName),

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("failed to decode host response: {0}")]
    Decode(serde_json::Error),

    #[error("invocation abandoned before the host responded")]
    Abandoned,
}

impl InvokeError {
    /// The host-supplied rejection payload, if this is a host rejection.
    pub fn rejection(&self) -> Option<&serde_json::Value> {
        match self {
            InvokeError::Rejected(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TetherError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Invoke(#[from] InvokeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("host globals error: {0}")]
    Globals(String),
}

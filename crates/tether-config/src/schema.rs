//! Configuration schema types for the bridge.
//!
//! All structs use `serde(default)` so partial configs work correctly.

use serde::{Deserialize, Serialize};
use tether_common::ModuleName;

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

// =============================================================================
// Bridge Config
// =============================================================================

/// Invocation and registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Host modules commands may be addressed to. Anything else is
    /// refused before a callback pair is registered.
    pub allowlist: Vec<ModuleName>,
    /// Registry size at which a leak warning is logged (valid range: 1-1000000).
    pub registry_warn_threshold: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            allowlist: ModuleName::ALL.to_vec(),
            registry_warn_threshold: 1024,
        }
    }
}

impl BridgeConfig {
    pub fn allows(&self, module: ModuleName) -> bool {
        self.allowlist.contains(&module)
    }
}

// =============================================================================
// Logging Config
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "tether=info".into(),
        }
    }
}

// =============================================================================
// Root
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TetherConfig {
    pub bridge: BridgeConfig,
    pub logging: LoggingConfig,
}

//! Configuration validation.
//!
//! Collects every problem into a single `ConfigError` instead of stopping
//! at the first one.

use crate::schema::TetherConfig;
use tether_common::{ConfigError, ModuleName};

const WARN_THRESHOLD_MIN: usize = 1;
const WARN_THRESHOLD_MAX: usize = 1_000_000;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &TetherConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_bridge(&mut errors, config);
    validate_logging(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_bridge(errors: &mut Vec<String>, config: &TetherConfig) {
    let bridge = &config.bridge;

    let threshold = bridge.registry_warn_threshold;
    if !(WARN_THRESHOLD_MIN..=WARN_THRESHOLD_MAX).contains(&threshold) {
        errors.push(format!(
            "bridge.registry_warn_threshold = {threshold} is out of range [{WARN_THRESHOLD_MIN}, {WARN_THRESHOLD_MAX}]"
        ));
    }

    // Event listeners and window commands cannot work without these.
    for required in [ModuleName::Event, ModuleName::Window] {
        if !bridge.allows(required) {
            errors.push(format!("bridge.allowlist must contain \"{required}\""));
        }
    }

    let mut seen = Vec::new();
    for module in &bridge.allowlist {
        if seen.contains(module) {
            errors.push(format!("bridge.allowlist lists \"{module}\" more than once"));
        } else {
            seen.push(*module);
        }
    }
}

fn validate_logging(errors: &mut Vec<String>, config: &TetherConfig) {
    if config.logging.filter.trim().is_empty() {
        errors.push("logging.filter must not be empty".into());
    }
}

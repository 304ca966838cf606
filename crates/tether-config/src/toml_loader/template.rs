//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Tether Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[bridge]
# Host modules commands may target. "event" and "window" are required.
# allowlist = [
#     "filesystem", "window", "process-spawn", "event", "dialog",
#     "notification", "network", "global-shortcut", "internal",
# ]
# Log a warning when this many callbacks are registered at once.
# registry_warn_threshold = 1024   # 1-1000000

[logging]
# filter = "tether=info"
"##
    .to_string()
}

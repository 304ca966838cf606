use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Host module a command is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleName {
    Filesystem,
    Window,
    ProcessSpawn,
    Event,
    Dialog,
    Notification,
    Network,
    GlobalShortcut,
    Internal,
}

impl ModuleName {
    pub const ALL: [ModuleName; 9] = [
        ModuleName::Filesystem,
        ModuleName::Window,
        ModuleName::ProcessSpawn,
        ModuleName::Event,
        ModuleName::Dialog,
        ModuleName::Notification,
        ModuleName::Network,
        ModuleName::GlobalShortcut,
        ModuleName::Internal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleName::Filesystem => "filesystem",
            ModuleName::Window => "window",
            ModuleName::ProcessSpawn => "process-spawn",
            ModuleName::Event => "event",
            ModuleName::Dialog => "dialog",
            ModuleName::Notification => "notification",
            ModuleName::Network => "network",
            ModuleName::GlobalShortcut => "global-shortcut",
            ModuleName::Internal => "internal",
        }
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModuleName::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unknown module: {s}"))
    }
}

/// The window an event subscription or emission pertains to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum WindowScope {
    /// Wildcard: every window.
    #[default]
    All,
    Window(String),
}

impl WindowScope {
    pub fn window(label: impl Into<String>) -> Self {
        WindowScope::Window(label.into())
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            WindowScope::All => None,
            WindowScope::Window(label) => Some(label),
        }
    }

    /// Whether a delivery targeted at `target` reaches this scope.
    /// An untargeted delivery is a broadcast.
    pub fn accepts(&self, target: Option<&str>) -> bool {
        match (self, target) {
            (WindowScope::All, _) | (_, None) => true,
            (WindowScope::Window(label), Some(target)) => label == target,
        }
    }
}

impl From<Option<String>> for WindowScope {
    fn from(label: Option<String>) -> Self {
        label.map_or(WindowScope::All, WindowScope::Window)
    }
}

impl fmt::Display for WindowScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowScope::All => f.write_str("*"),
            WindowScope::Window(label) => f.write_str(label),
        }
    }
}

/// A logical window known to the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowDescriptor {
    pub label: String,
}

impl WindowDescriptor {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

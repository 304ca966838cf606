//! Window descriptors injected by the host before the bridge starts.

use serde::Deserialize;
use serde_json::Value;
use tether_common::WindowDescriptor;

#[derive(Deserialize)]
struct RawGlobals {
    #[serde(rename = "__windows", default)]
    windows: Vec<WindowDescriptor>,
    #[serde(rename = "__currentWindow")]
    current: WindowDescriptor,
}

/// Immutable snapshot of the host's window list and the window this
/// bridge runs in. Read once; never refreshed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostGlobals {
    windows: Vec<WindowDescriptor>,
    current: WindowDescriptor,
}

impl HostGlobals {
    /// Build a snapshot directly. The current window is added to the
    /// list if it is missing.
    pub fn new(current: WindowDescriptor, mut windows: Vec<WindowDescriptor>) -> Self {
        if !windows.iter().any(|w| w.label == current.label) {
            windows.insert(0, current.clone());
        }
        Self { windows, current }
    }

    /// A single-window snapshot.
    pub fn single(label: impl Into<String>) -> Self {
        Self::new(WindowDescriptor::new(label), Vec::new())
    }

    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let raw: RawGlobals = serde_json::from_value(value)?;
        Ok(Self::new(raw.current, raw.windows))
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let raw: RawGlobals = serde_json::from_str(raw)?;
        Ok(Self::new(raw.current, raw.windows))
    }

    pub fn windows(&self) -> &[WindowDescriptor] {
        &self.windows
    }

    pub fn current(&self) -> &WindowDescriptor {
        &self.current
    }

    pub fn find(&self, label: &str) -> Option<&WindowDescriptor> {
        self.windows.iter().find(|w| w.label == label)
    }
}

//! Window handles and the window manager.
//!
//! `WindowManager` hands out [`WindowHandle`]s for the windows listed in
//! the host's [`HostGlobals`] snapshot. Lookups are local and may be stale
//! relative to windows the host created or closed since startup.

mod globals;
mod handle;
pub mod types;

pub use globals::HostGlobals;
pub use handle::WindowHandle;

use tether_common::{InvokeError, WindowDescriptor};
use tracing::{debug, info};

use crate::command::{Command, WindowCmd};
use crate::events::EventBus;
use crate::invoke::Invoker;
use types::WindowOptions;

#[derive(Debug, Clone)]
pub struct WindowManager {
    globals: HostGlobals,
    invoker: Invoker,
    bus: EventBus,
}

impl WindowManager {
    pub fn new(globals: HostGlobals, invoker: Invoker, bus: EventBus) -> Self {
        debug!(
            current = %globals.current().label,
            windows = globals.windows().len(),
            "window manager ready"
        );
        Self {
            globals,
            invoker,
            bus,
        }
    }

    pub fn globals(&self) -> &HostGlobals {
        &self.globals
    }

    fn handle(&self, label: &str) -> WindowHandle {
        WindowHandle::new(
            label.to_string(),
            label == self.globals.current().label,
            self.invoker.clone(),
            self.bus.clone(),
        )
    }

    /// The window this bridge runs in.
    pub fn get_current(&self) -> WindowHandle {
        self.handle(&self.globals.current().label)
    }

    /// Handle to the current window addressed by label rather than
    /// implicitly. Useful when passing it to code that expects a label.
    pub fn app_window(&self) -> WindowHandle {
        WindowHandle::new(
            self.globals.current().label.clone(),
            false,
            self.invoker.clone(),
            self.bus.clone(),
        )
    }

    pub fn get_all(&self) -> &[WindowDescriptor] {
        self.globals.windows()
    }

    /// Local lookup against the startup snapshot; no host round-trip.
    pub fn get_by_label(&self, label: &str) -> Option<WindowHandle> {
        self.globals.find(label).map(|w| self.handle(&w.label))
    }

    /// Ask the host to create a window. The snapshot is not updated, so
    /// `get_by_label` will not find the new window; keep the returned
    /// handle instead.
    pub async fn create(&self, options: WindowOptions) -> Result<WindowHandle, InvokeError> {
        if options.label.is_empty() {
            return Err(InvokeError::InvalidCommand(
                "window label must not be empty".into(),
            ));
        }
        let label = options.label.clone();
        self.invoker
            .invoke_raw(Command::window(WindowCmd::CreateWebview { options }))
            .await?;
        info!(label = %label, "window created");
        Ok(WindowHandle::new(
            label,
            false,
            self.invoker.clone(),
            self.bus.clone(),
        ))
    }
}

//! Assembled bridge: one registry shared by the invoker, the event bus
//! and the window manager, plus the inbound entry point.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tether_common::{CallbackId, InvokeError, WindowScope};
use tether_config::BridgeConfig;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::command::Command;
use crate::events::{EventBus, EventHandler, Unlisten};
use crate::invoke::Invoker;
use crate::ipc::HostMessage;
use crate::registry::CallbackRegistry;
use crate::transport::Transport;
use crate::window::{HostGlobals, WindowManager};

#[derive(Debug, Clone)]
pub struct Bridge {
    registry: CallbackRegistry,
    invoker: Invoker,
    events: EventBus,
    windows: WindowManager,
}

impl Bridge {
    /// Bridge with every module allowed and the default warning threshold.
    pub fn new(transport: Arc<dyn Transport>, globals: HostGlobals) -> Self {
        Self::with_config(transport, globals, &BridgeConfig::default())
    }

    pub fn with_config(
        transport: Arc<dyn Transport>,
        globals: HostGlobals,
        config: &BridgeConfig,
    ) -> Self {
        let registry = CallbackRegistry::with_warn_threshold(config.registry_warn_threshold);
        let invoker = Invoker::with_allowlist(registry.clone(), transport, &config.allowlist);
        let events = EventBus::new(invoker.clone());
        let windows = WindowManager::new(globals, invoker.clone(), events.clone());
        info!(
            modules = config.allowlist.len(),
            warn_threshold = config.registry_warn_threshold,
            "bridge initialized"
        );
        Self {
            registry,
            invoker,
            events,
            windows,
        }
    }

    /// Run callback `id` with `payload`. Returns `false` for an unknown,
    /// stale or already-consumed id.
    pub fn deliver(&self, id: CallbackId, payload: Value) -> bool {
        self.registry.invoke(id, payload)
    }

    /// Deliver a JSON text [`HostMessage`]. Malformed messages are logged
    /// and dropped.
    pub fn deliver_message(&self, raw: &str) -> bool {
        match HostMessage::from_json(raw) {
            Some(message) => self.deliver(message.callback, message.payload),
            None => {
                warn!(len = raw.len(), "malformed host message dropped");
                false
            }
        }
    }

    /// Feed host messages from `inbound` into the bridge until the host
    /// side closes.
    pub fn spawn_inbound(&self, mut inbound: mpsc::UnboundedReceiver<String>) -> JoinHandle<()> {
        let bridge = self.clone();
        tokio::spawn(async move {
            while let Some(raw) = inbound.recv().await {
                bridge.deliver_message(&raw);
            }
            debug!("host message stream closed");
        })
    }

    /// Drop every registration. Pending invocations resolve to
    /// [`InvokeError::Abandoned`]; listeners go silent.
    pub fn shutdown(&self) -> usize {
        let listeners = self.events.clear();
        let dropped = self.registry.clear();
        info!(listeners, dropped, "bridge shut down");
        listeners + dropped
    }

    pub fn registry(&self) -> &CallbackRegistry {
        &self.registry
    }

    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn windows(&self) -> &WindowManager {
        &self.windows
    }

    pub async fn invoke<T: DeserializeOwned>(&self, command: Command) -> Result<T, InvokeError> {
        self.invoker.invoke(command).await
    }

    pub async fn invoke_raw(&self, command: Command) -> Result<Value, InvokeError> {
        self.invoker.invoke_raw(command).await
    }

    /// Listen across all windows.
    pub async fn listen<H: EventHandler>(
        &self,
        event: impl Into<String>,
        handler: H,
    ) -> Result<Unlisten, InvokeError> {
        self.events.listen(event, WindowScope::All, handler).await
    }

    pub async fn once<H: EventHandler>(
        &self,
        event: impl Into<String>,
        handler: H,
    ) -> Result<Unlisten, InvokeError> {
        self.events.once(event, WindowScope::All, handler).await
    }

    /// Emit to every window.
    pub async fn emit(
        &self,
        event: impl Into<String>,
        payload: Option<String>,
    ) -> Result<(), InvokeError> {
        self.events.emit(event, None, payload).await
    }
}

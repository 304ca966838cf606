//! Named, window-scoped event dispatch on top of the callback registry.
//!
//! A listener is a persistent registry entry. The host is told which
//! callback id to route an event name to and calls that id for every
//! occurrence; the entry filters by event name and window scope before
//! running the user handler.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tether_common::{CallbackId, InvokeError, WindowScope};
use tracing::{debug, trace, warn};

use crate::command::{Command, EventCmd};
use crate::invoke::Invoker;
use crate::registry::CallbackRegistry;

/// What a handler receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event: String,
    /// Callback id of the subscription that received this event.
    pub id: CallbackId,
    pub payload: Value,
}

impl Event {
    /// Decode the payload. Emitted payloads travel as strings, so a string
    /// payload is parsed as JSON first.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        if let Value::String(text) = &self.payload {
            if let Ok(value) = serde_json::from_str(text) {
                return Ok(value);
            }
        }
        serde_json::from_value(self.payload.clone())
    }
}

/// Payload the host passes to a listener's callback id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDelivery {
    pub event: String,
    /// Target window; absent for a broadcast.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_label: Option<String>,
    #[serde(default)]
    pub payload: Value,
}

pub trait EventHandler: Send + Sync + 'static {
    fn handle(&self, event: Event);
}

impl<F> EventHandler for F
where
    F: Fn(Event) + Send + Sync + 'static,
{
    fn handle(&self, event: Event) {
        self(event)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSubscription {
    pub event: String,
    pub scope: WindowScope,
    pub id: CallbackId,
    pub once: bool,
}

struct BusInner {
    registry: CallbackRegistry,
    invoker: Invoker,
    subscriptions: Mutex<HashMap<CallbackId, EventSubscription>>,
}

impl BusInner {
    fn subscriptions(&self) -> MutexGuard<'_, HashMap<CallbackId, EventSubscription>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop a listener locally. Returns whether it was still registered.
    fn forget(&self, id: CallbackId) -> bool {
        self.subscriptions().remove(&id);
        self.registry.unregister(id)
    }
}

#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new(invoker: Invoker) -> Self {
        Self {
            inner: Arc::new(BusInner {
                registry: invoker.registry().clone(),
                invoker,
                subscriptions: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to `event` until the returned handle is used to unlisten.
    pub async fn listen<H: EventHandler>(
        &self,
        event: impl Into<String>,
        scope: WindowScope,
        handler: H,
    ) -> Result<Unlisten, InvokeError> {
        self.subscribe(event.into(), scope, handler, false).await
    }

    /// Subscribe to the next occurrence of `event` within `scope` only.
    pub async fn once<H: EventHandler>(
        &self,
        event: impl Into<String>,
        scope: WindowScope,
        handler: H,
    ) -> Result<Unlisten, InvokeError> {
        self.subscribe(event.into(), scope, handler, true).await
    }

    /// Ask the host to emit `event`. Resolves when the host has accepted
    /// the emission, not when listeners have run.
    pub async fn emit(
        &self,
        event: impl Into<String>,
        window_label: Option<&str>,
        payload: Option<String>,
    ) -> Result<(), InvokeError> {
        let command = Command::Event(EventCmd::Emit {
            event: event.into(),
            window_label: window_label.map(str::to_string),
            payload,
        });
        self.inner.invoker.invoke_raw(command).await.map(|_| ())
    }

    /// Emit with a payload serialized to JSON text.
    pub async fn emit_json<T: Serialize>(
        &self,
        event: impl Into<String>,
        window_label: Option<&str>,
        payload: &T,
    ) -> Result<(), InvokeError> {
        let payload = serde_json::to_string(payload)
            .map_err(|e| InvokeError::InvalidCommand(format!("unserializable payload: {e}")))?;
        self.emit(event, window_label, Some(payload)).await
    }

    pub fn subscriptions(&self) -> Vec<EventSubscription> {
        let mut subs: Vec<_> = self.inner.subscriptions().values().cloned().collect();
        subs.sort_by_key(|s| s.id);
        subs
    }

    pub fn subscription_count(&self, event: &str) -> usize {
        self.inner
            .subscriptions()
            .values()
            .filter(|s| s.event == event)
            .count()
    }

    /// Forget every subscription locally. The host is not told; used when
    /// the whole bridge goes away.
    pub fn clear(&self) -> usize {
        let drained: Vec<CallbackId> = self
            .inner
            .subscriptions()
            .drain()
            .map(|(id, _)| id)
            .collect();
        for id in &drained {
            self.inner.registry.unregister(*id);
        }
        drained.len()
    }

    async fn subscribe<H: EventHandler>(
        &self,
        event: String,
        scope: WindowScope,
        handler: H,
        once: bool,
    ) -> Result<Unlisten, InvokeError> {
        let id = self.register_listener(event.clone(), scope.clone(), handler, once);

        let command = Command::Event(EventCmd::Listen {
            event: event.clone(),
            handler: id,
            once,
            window_label: scope.label().map(str::to_string),
        });
        if let Err(e) = self.inner.invoker.invoke_raw(command).await {
            self.inner.forget(id);
            warn!(%id, event = %event, error = %e, "host refused listener");
            return Err(e);
        }

        debug!(%id, event = %event, %scope, once, "listening");
        Ok(Unlisten {
            bus: self.clone(),
            event,
            id,
        })
    }

    fn register_listener<H: EventHandler>(
        &self,
        event: String,
        scope: WindowScope,
        handler: H,
        once: bool,
    ) -> CallbackId {
        let bus: Weak<BusInner> = Arc::downgrade(&self.inner);
        let name = event.clone();
        let filter = scope.clone();

        // Persistent even for `once`: a delivery for another window must
        // not consume the listener, so it removes itself after filtering.
        let id = self.inner.registry.register_with(
            move |id| {
                let fired = AtomicBool::new(false);
                move |payload: Value| {
                    let delivery: EventDelivery = match serde_json::from_value(payload) {
                        Ok(delivery) => delivery,
                        Err(e) => {
                            warn!(%id, error = %e, "malformed event delivery dropped");
                            return;
                        }
                    };
                    if delivery.event != name {
                        trace!(%id, expected = %name, got = %delivery.event, "event name mismatch");
                        return;
                    }
                    if !filter.accepts(delivery.window_label.as_deref()) {
                        trace!(%id, scope = %filter, window = ?delivery.window_label, "out of scope");
                        return;
                    }
                    if once {
                        if fired.swap(true, Ordering::AcqRel) {
                            return;
                        }
                        if let Some(bus) = bus.upgrade() {
                            bus.forget(id);
                        }
                    }
                    handler.handle(Event {
                        event: delivery.event,
                        id,
                        payload: delivery.payload,
                    });
                }
            },
            true,
        );

        self.inner.subscriptions().insert(
            id,
            EventSubscription {
                event,
                scope,
                id,
                once,
            },
        );
        id
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.inner.subscriptions().len())
            .finish()
    }
}

/// Handle returned by `listen`/`once`.
#[must_use = "dropping an Unlisten keeps the listener registered"]
#[derive(Debug)]
pub struct Unlisten {
    bus: EventBus,
    event: String,
    id: CallbackId,
}

impl Unlisten {
    pub fn id(&self) -> CallbackId {
        self.id
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    /// Stop deliveries to this listener and tell the host to stop routing.
    ///
    /// Local removal happens first, so anything the host sends after this
    /// call starts is dropped as stale.
    pub async fn unlisten(self) -> Result<(), InvokeError> {
        if !self.bus.inner.forget(self.id) {
            debug!(id = %self.id, event = %self.event, "listener already removed");
        }
        let command = Command::Event(EventCmd::Unlisten {
            event: self.event,
            handler: self.id,
        });
        self.bus.inner.invoker.invoke_raw(command).await.map(|_| ())
    }
}

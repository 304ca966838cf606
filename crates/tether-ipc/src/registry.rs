//! Callback table correlating host notifications with local handlers.
//!
//! Every outbound request and every event listener owns one or two
//! entries here, keyed by a `CallbackId` the host echoes back through
//! `deliver`. One-shot entries are evicted before their handler runs;
//! persistent entries stay until unregistered.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tether_common::{CallbackId, IdAllocator};
use tracing::{debug, warn};

/// Registry size at which a warning is logged unless configured otherwise.
pub const DEFAULT_WARN_THRESHOLD: usize = 1024;

/// Something the host can call back with a JSON payload.
pub trait CallbackHandler: Send + Sync {
    fn call(&self, payload: Value);
}

impl<F> CallbackHandler for F
where
    F: Fn(Value) + Send + Sync,
{
    fn call(&self, payload: Value) {
        self(payload)
    }
}

struct CallbackEntry {
    handler: Arc<dyn CallbackHandler>,
    persistent: bool,
    /// Other half of a success/failure pair. Evicted together.
    twin: Option<CallbackId>,
}

struct Table {
    entries: HashMap<CallbackId, CallbackEntry>,
    warn_threshold: usize,
    warned: bool,
}

/// Entries taken out of the table, dropped by the caller once the lock is
/// released. Handlers may own channel senders whose drop wakes other tasks.
type Evicted = (CallbackEntry, Option<CallbackEntry>);

impl Table {
    fn insert(&mut self, id: CallbackId, entry: CallbackEntry) {
        self.entries.insert(id, entry);
        self.check_growth();
    }

    /// Warn once when the table reaches the threshold.
    fn check_growth(&mut self) {
        if self.entries.len() >= self.warn_threshold && !self.warned {
            self.warned = true;
            warn!(
                size = self.entries.len(),
                threshold = self.warn_threshold,
                "callback registry is growing; unresolved invocations or listeners that were never unlistened"
            );
        }
    }

    /// Remove an entry together with its twin.
    fn remove(&mut self, id: CallbackId) -> Option<Evicted> {
        let entry = self.entries.remove(&id)?;
        let twin = entry.twin.and_then(|twin| self.entries.remove(&twin));
        if self.entries.len() < self.warn_threshold {
            self.warned = false;
        }
        Some((entry, twin))
    }
}

/// Shared handle to the callback table. Clones refer to the same table.
#[derive(Clone)]
pub struct CallbackRegistry {
    ids: Arc<IdAllocator>,
    table: Arc<Mutex<Table>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::with_warn_threshold(DEFAULT_WARN_THRESHOLD)
    }

    pub fn with_warn_threshold(warn_threshold: usize) -> Self {
        Self {
            ids: Arc::new(IdAllocator::new()),
            table: Arc::new(Mutex::new(Table {
                entries: HashMap::new(),
                warn_threshold: warn_threshold.max(1),
                warned: false,
            })),
        }
    }

    // Handlers never run under this lock, so poisoning only happens on a
    // bug in the bookkeeping itself; the table stays usable either way.
    fn table(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a handler and return its freshly allocated id.
    pub fn register<H>(&self, handler: H, persistent: bool) -> CallbackId
    where
        H: CallbackHandler + 'static,
    {
        self.register_with(|_| handler, persistent)
    }

    /// Like `register`, for handlers that need to know their own id.
    pub fn register_with<H, F>(&self, build: F, persistent: bool) -> CallbackId
    where
        H: CallbackHandler + 'static,
        F: FnOnce(CallbackId) -> H,
    {
        let id = self.ids.next_id();
        let handler: Arc<dyn CallbackHandler> = Arc::new(build(id));
        self.table().insert(
            id,
            CallbackEntry {
                handler,
                persistent,
                twin: None,
            },
        );
        debug!(%id, persistent, "callback registered");
        id
    }

    /// Register a one-shot success/failure pair. Whichever fires first
    /// evicts both, so the other can never run.
    pub fn register_pair<S, F>(&self, success: S, failure: F) -> (CallbackId, CallbackId)
    where
        S: CallbackHandler + 'static,
        F: CallbackHandler + 'static,
    {
        let success_id = self.ids.next_id();
        let failure_id = self.ids.next_id();
        let mut table = self.table();
        table.insert(
            success_id,
            CallbackEntry {
                handler: Arc::new(success),
                persistent: false,
                twin: Some(failure_id),
            },
        );
        table.insert(
            failure_id,
            CallbackEntry {
                handler: Arc::new(failure),
                persistent: false,
                twin: Some(success_id),
            },
        );
        drop(table);
        debug!(%success_id, %failure_id, "callback pair registered");
        (success_id, failure_id)
    }

    /// Run the handler for `id`. Returns `false` for an unknown id, which
    /// is how late or duplicate host notifications show up.
    pub fn invoke(&self, id: CallbackId, payload: Value) -> bool {
        let (handler, evicted) = {
            let mut table = self.table();
            let persistent = match table.entries.get(&id) {
                Some(entry) => entry.persistent,
                None => {
                    debug!(%id, "stale or already consumed callback");
                    return false;
                }
            };
            if persistent {
                let handler = table.entries.get(&id).map(|entry| Arc::clone(&entry.handler));
                (handler, None)
            } else {
                match table.remove(id) {
                    Some((entry, twin)) => (Some(Arc::clone(&entry.handler)), Some((entry, twin))),
                    None => (None, None),
                }
            }
        };
        drop(evicted);

        let Some(handler) = handler else {
            return false;
        };
        // A panicking handler must not take the caller (usually the inbound
        // pump) down with it. One-shot eviction has already happened.
        if panic::catch_unwind(AssertUnwindSafe(|| handler.call(payload))).is_err() {
            warn!(%id, "callback handler panicked");
        }
        true
    }

    /// Drop the entry for `id` (and its twin, for a pair).
    pub fn unregister(&self, id: CallbackId) -> bool {
        let evicted = self.table().remove(id);
        let removed = evicted.is_some();
        drop(evicted);
        if removed {
            debug!(%id, "callback unregistered");
        }
        removed
    }

    pub fn contains(&self, id: CallbackId) -> bool {
        self.table().entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.table().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Pending invocations resolve as abandoned.
    pub fn clear(&self) -> usize {
        let drained: Vec<CallbackEntry> = {
            let mut table = self.table();
            table.warned = false;
            table.entries.drain().map(|(_, entry)| entry).collect()
        };
        let count = drained.len();
        // Handlers are dropped outside the lock; some own channel senders.
        drop(drained);
        debug!(count, "callback registry cleared");
        count
    }

    /// Change the threshold and re-arm the warning. A table already at or
    /// above the new threshold warns immediately.
    pub fn set_warn_threshold(&self, warn_threshold: usize) {
        let mut table = self.table();
        table.warn_threshold = warn_threshold.max(1);
        table.warned = false;
        table.check_growth();
    }

    pub(crate) fn growth_warned(&self) -> bool {
        self.table().warned
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("len", &self.len())
            .field("next_id", &self.ids.peek())
            .finish()
    }
}

//! Correlated request/response over the callback registry.
//!
//! Each invocation registers a success/failure pair, ships an envelope
//! naming both ids, and waits for the host to call one of them.

use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tether_common::{CallbackId, InvokeError, ModuleName};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::command::{command_name, Command};
use crate::ipc::Envelope;
use crate::registry::CallbackRegistry;
use crate::transport::Transport;

type Outcome = Result<Value, Value>;
type Slot = Arc<Mutex<Option<oneshot::Sender<Outcome>>>>;

fn complete(slot: &Slot, outcome: Outcome) {
    let sender = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    if let Some(sender) = sender {
        // The caller may have dropped the pending future; nothing to do then.
        let _ = sender.send(outcome);
    }
}

/// An invocation the host has not answered yet.
#[derive(Debug)]
pub struct PendingInvocation {
    success_id: CallbackId,
    failure_id: CallbackId,
    receiver: oneshot::Receiver<Outcome>,
}

impl PendingInvocation {
    pub fn success_id(&self) -> CallbackId {
        self.success_id
    }

    pub fn failure_id(&self) -> CallbackId {
        self.failure_id
    }

    /// Wait for the host. A rejection carries the host's payload as-is.
    pub async fn wait(self) -> Result<Value, InvokeError> {
        match self.receiver.await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(payload)) => Err(InvokeError::Rejected(payload)),
            Err(_) => Err(InvokeError::Abandoned),
        }
    }
}

/// Sends commands to the host and resolves their answers.
#[derive(Clone)]
pub struct Invoker {
    registry: CallbackRegistry,
    transport: Arc<dyn Transport>,
    allowlist: Arc<[ModuleName]>,
}

impl Invoker {
    pub fn new(registry: CallbackRegistry, transport: Arc<dyn Transport>) -> Self {
        Self::with_allowlist(registry, transport, &ModuleName::ALL)
    }

    pub fn with_allowlist(
        registry: CallbackRegistry,
        transport: Arc<dyn Transport>,
        allowlist: &[ModuleName],
    ) -> Self {
        Self {
            registry,
            transport,
            allowlist: allowlist.into(),
        }
    }

    pub fn registry(&self) -> &CallbackRegistry {
        &self.registry
    }

    pub fn allows(&self, module: ModuleName) -> bool {
        self.allowlist.contains(&module)
    }

    /// Register the callback pair and ship the envelope without waiting.
    ///
    /// Every failure here happens before the pair is left in the registry:
    /// refused modules and unserializable commands never register, and a
    /// transport error unregisters both halves before returning.
    pub fn submit(&self, command: Command) -> Result<PendingInvocation, InvokeError> {
        let module = command.module();
        if !self.allows(module) {
            warn!(%module, "command rejected: module not allowlisted");
            return Err(InvokeError::NotAllowed(module));
        }

        let message = command.to_message()?;
        let (sender, receiver) = oneshot::channel();
        let on_success: Slot = Arc::new(Mutex::new(Some(sender)));
        let on_failure = Arc::clone(&on_success);

        let (success_id, failure_id) = self.registry.register_pair(
            move |payload: Value| complete(&on_success, Ok(payload)),
            move |payload: Value| complete(&on_failure, Err(payload)),
        );

        let envelope = Envelope {
            module,
            command: message,
            success_id,
            failure_id,
        };

        if let Err(e) = self.transport.send(&envelope) {
            self.registry.unregister(success_id);
            warn!(
                %module,
                cmd = command_name(&envelope.command),
                error = %e,
                "failed to submit command"
            );
            return Err(e.into());
        }

        debug!(
            %module,
            cmd = command_name(&envelope.command),
            %success_id,
            %failure_id,
            "command submitted"
        );
        Ok(PendingInvocation {
            success_id,
            failure_id,
            receiver,
        })
    }

    /// Submit and wait, returning the raw success payload.
    pub async fn invoke_raw(&self, command: Command) -> Result<Value, InvokeError> {
        self.submit(command)?.wait().await
    }

    /// Submit and wait, decoding the success payload into `T`.
    pub async fn invoke<T: DeserializeOwned>(&self, command: Command) -> Result<T, InvokeError> {
        let payload = self.invoke_raw(command).await?;
        serde_json::from_value(payload).map_err(InvokeError::Decode)
    }
}

impl std::fmt::Debug for Invoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invoker")
            .field("registry", &self.registry)
            .field("allowlist", &self.allowlist)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::WindowCmd;
    use crate::transport::ChannelTransport;
    use serde_json::json;
    use tether_common::TransportError;
    use tokio::sync::mpsc;

    fn setup() -> (Invoker, mpsc::UnboundedReceiver<String>) {
        let (transport, rx) = ChannelTransport::new();
        let invoker = Invoker::new(CallbackRegistry::new(), Arc::new(transport));
        (invoker, rx)
    }

    #[tokio::test]
    async fn success_resolves_and_evicts_failure() {
        let (invoker, mut rx) = setup();
        let pending = invoker
            .submit(Command::window(WindowCmd::IsMaximized))
            .unwrap();
        assert_eq!(pending.success_id(), CallbackId::new(1));
        assert_eq!(pending.failure_id(), CallbackId::new(2));

        let envelope = Envelope::from_json(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(envelope.success_id, pending.success_id());
        assert_eq!(envelope.failure_id, pending.failure_id());
        assert_eq!(envelope.command, json!({"cmd": "isMaximized"}));

        let registry = invoker.registry().clone();
        assert!(registry.invoke(CallbackId::new(1), json!({"ok": true})));
        assert!(!registry.contains(CallbackId::new(2)));

        let result = pending.wait().await.unwrap();
        assert_eq!(result, json!({"ok": true}));
        assert!(!registry.invoke(CallbackId::new(2), json!("x")));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn failure_relays_payload_and_evicts_success() {
        let (invoker, _rx) = setup();
        let pending = invoker.submit(Command::window(WindowCmd::Close)).unwrap();
        let registry = invoker.registry().clone();

        let reason = json!({"code": "denied", "detail": [1, 2]});
        assert!(registry.invoke(pending.failure_id(), reason.clone()));
        assert!(!registry.contains(pending.success_id()));

        let err = pending.wait().await.unwrap_err();
        assert_eq!(err.rejection(), Some(&reason));
    }

    #[tokio::test]
    async fn duplicate_answers_resolve_once() {
        let (invoker, _rx) = setup();
        let pending = invoker.submit(Command::window(WindowCmd::Show)).unwrap();
        let registry = invoker.registry().clone();
        let (ok, fail) = (pending.success_id(), pending.failure_id());

        assert!(registry.invoke(ok, json!(1)));
        assert!(!registry.invoke(ok, json!(2)));
        assert!(!registry.invoke(fail, json!("late")));
        assert_eq!(pending.wait().await.unwrap(), json!(1));
    }

    #[tokio::test]
    async fn transport_failure_leaves_registry_empty() {
        let registry = CallbackRegistry::new();
        let transport = |_: String| -> Result<(), TransportError> { Err(TransportError::Closed) };
        let invoker = Invoker::new(registry.clone(), Arc::new(transport));

        let err = invoker
            .invoke_raw(Command::window(WindowCmd::Hide))
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::Transport(TransportError::Closed)));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn refused_module_never_registers() {
        let (transport, mut rx) = ChannelTransport::new();
        let registry = CallbackRegistry::new();
        let invoker = Invoker::with_allowlist(
            registry.clone(),
            Arc::new(transport),
            &[ModuleName::Window, ModuleName::Event],
        );

        let command = Command::raw(ModuleName::Filesystem, json!({"cmd": "readDir"})).unwrap();
        let err = invoker.invoke_raw(command).await.unwrap_err();
        assert!(matches!(err, InvokeError::NotAllowed(ModuleName::Filesystem)));
        assert!(registry.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn concurrent_invocations_resolve_independently() {
        let (invoker, _rx) = setup();
        let registry = invoker.registry().clone();
        let first = invoker.submit(Command::window(WindowCmd::InnerSize)).unwrap();
        let second = invoker.submit(Command::window(WindowCmd::OuterSize)).unwrap();

        // Answer out of submission order.
        registry.invoke(second.success_id(), json!("second"));
        registry.invoke(first.failure_id(), json!("first failed"));

        assert_eq!(second.wait().await.unwrap(), json!("second"));
        assert_eq!(
            first.wait().await.unwrap_err().rejection(),
            Some(&json!("first failed"))
        );
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn cleared_registry_abandons_pending() {
        let (invoker, _rx) = setup();
        let pending = invoker.submit(Command::window(WindowCmd::Minimize)).unwrap();
        invoker.registry().clear();
        assert!(matches!(
            pending.wait().await.unwrap_err(),
            InvokeError::Abandoned
        ));
    }

    #[tokio::test]
    async fn typed_invoke_decodes_payload() {
        let (invoker, mut rx) = setup();
        let registry = invoker.registry().clone();

        let answer = tokio::spawn(async move {
            let envelope = Envelope::from_json(&rx.recv().await.unwrap()).unwrap();
            registry.invoke(envelope.success_id, json!(1.5));
            let envelope = Envelope::from_json(&rx.recv().await.unwrap()).unwrap();
            registry.invoke(envelope.success_id, json!("not a bool"));
        });

        let scale: f64 = invoker
            .invoke(Command::window(WindowCmd::ScaleFactor))
            .await
            .unwrap();
        assert_eq!(scale, 1.5);

        let err = invoker
            .invoke::<bool>(Command::window(WindowCmd::IsFullscreen))
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::Decode(_)));
        answer.await.unwrap();
    }
}

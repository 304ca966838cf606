use serde::de::DeserializeOwned;
use tether_common::{InvokeError, WindowScope};

use super::types::{Icon, Monitor, PhysicalPosition, PhysicalSize, Position, Size};
use crate::command::{Command, WindowCmd};
use crate::events::{EventBus, EventHandler, Unlisten};
use crate::invoke::Invoker;

/// Addressable proxy for one host window.
///
/// Carries nothing but its label; whether the window still exists is
/// decided by the host when a command arrives.
#[derive(Debug, Clone)]
pub struct WindowHandle {
    label: String,
    /// Commands for the current window go out unlabelled.
    is_current: bool,
    invoker: Invoker,
    bus: EventBus,
}

impl WindowHandle {
    pub(crate) fn new(label: String, is_current: bool, invoker: Invoker, bus: EventBus) -> Self {
        Self {
            label,
            is_current,
            invoker,
            bus,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_current(&self) -> bool {
        self.is_current
    }

    fn command(&self, cmd: WindowCmd) -> Command {
        if self.is_current {
            Command::window(cmd)
        } else {
            Command::window_for(self.label.clone(), cmd)
        }
    }

    async fn run(&self, cmd: WindowCmd) -> Result<(), InvokeError> {
        self.invoker.invoke_raw(self.command(cmd)).await.map(|_| ())
    }

    async fn query<T: DeserializeOwned>(&self, cmd: WindowCmd) -> Result<T, InvokeError> {
        self.invoker.invoke(self.command(cmd)).await
    }

    // -- Getters ------------------------------------------------------------

    pub async fn scale_factor(&self) -> Result<f64, InvokeError> {
        self.query(WindowCmd::ScaleFactor).await
    }

    pub async fn inner_position(&self) -> Result<PhysicalPosition, InvokeError> {
        self.query(WindowCmd::InnerPosition).await
    }

    pub async fn outer_position(&self) -> Result<PhysicalPosition, InvokeError> {
        self.query(WindowCmd::OuterPosition).await
    }

    pub async fn inner_size(&self) -> Result<PhysicalSize, InvokeError> {
        self.query(WindowCmd::InnerSize).await
    }

    pub async fn outer_size(&self) -> Result<PhysicalSize, InvokeError> {
        self.query(WindowCmd::OuterSize).await
    }

    pub async fn is_fullscreen(&self) -> Result<bool, InvokeError> {
        self.query(WindowCmd::IsFullscreen).await
    }

    pub async fn is_maximized(&self) -> Result<bool, InvokeError> {
        self.query(WindowCmd::IsMaximized).await
    }

    /// Monitor the window is on, or `None` when the host cannot tell.
    pub async fn current_monitor(&self) -> Result<Option<Monitor>, InvokeError> {
        self.query(WindowCmd::CurrentMonitor).await
    }

    pub async fn primary_monitor(&self) -> Result<Option<Monitor>, InvokeError> {
        self.query(WindowCmd::PrimaryMonitor).await
    }

    pub async fn available_monitors(&self) -> Result<Vec<Monitor>, InvokeError> {
        self.query(WindowCmd::AvailableMonitors).await
    }

    // -- Setters ------------------------------------------------------------

    pub async fn set_resizable(&self, resizable: bool) -> Result<(), InvokeError> {
        self.run(WindowCmd::SetResizable(resizable)).await
    }

    pub async fn set_title(&self, title: impl Into<String>) -> Result<(), InvokeError> {
        self.run(WindowCmd::SetTitle(title.into())).await
    }

    pub async fn maximize(&self) -> Result<(), InvokeError> {
        self.run(WindowCmd::Maximize).await
    }

    pub async fn unmaximize(&self) -> Result<(), InvokeError> {
        self.run(WindowCmd::Unmaximize).await
    }

    pub async fn minimize(&self) -> Result<(), InvokeError> {
        self.run(WindowCmd::Minimize).await
    }

    pub async fn unminimize(&self) -> Result<(), InvokeError> {
        self.run(WindowCmd::Unminimize).await
    }

    pub async fn show(&self) -> Result<(), InvokeError> {
        self.run(WindowCmd::Show).await
    }

    pub async fn hide(&self) -> Result<(), InvokeError> {
        self.run(WindowCmd::Hide).await
    }

    pub async fn close(&self) -> Result<(), InvokeError> {
        self.run(WindowCmd::Close).await
    }

    pub async fn set_decorations(&self, decorations: bool) -> Result<(), InvokeError> {
        self.run(WindowCmd::SetDecorations(decorations)).await
    }

    pub async fn set_always_on_top(&self, always_on_top: bool) -> Result<(), InvokeError> {
        self.run(WindowCmd::SetAlwaysOnTop(always_on_top)).await
    }

    pub async fn set_width(&self, width: f64) -> Result<(), InvokeError> {
        self.run(WindowCmd::SetWidth(width)).await
    }

    pub async fn set_height(&self, height: f64) -> Result<(), InvokeError> {
        self.run(WindowCmd::SetHeight(height)).await
    }

    pub async fn resize(&self, size: Size) -> Result<(), InvokeError> {
        self.run(WindowCmd::SetSize(size)).await
    }

    /// `None` removes the constraint.
    pub async fn set_min_size(&self, size: Option<Size>) -> Result<(), InvokeError> {
        self.run(WindowCmd::SetMinSize(size)).await
    }

    /// `None` removes the constraint.
    pub async fn set_max_size(&self, size: Option<Size>) -> Result<(), InvokeError> {
        self.run(WindowCmd::SetMaxSize(size)).await
    }

    pub async fn set_x(&self, x: f64) -> Result<(), InvokeError> {
        self.run(WindowCmd::SetX(x)).await
    }

    pub async fn set_y(&self, y: f64) -> Result<(), InvokeError> {
        self.run(WindowCmd::SetY(y)).await
    }

    pub async fn set_position(&self, position: Position) -> Result<(), InvokeError> {
        self.run(WindowCmd::SetPosition(position)).await
    }

    pub async fn set_fullscreen(&self, fullscreen: bool) -> Result<(), InvokeError> {
        self.run(WindowCmd::SetFullscreen(fullscreen)).await
    }

    pub async fn set_icon(&self, icon: Icon) -> Result<(), InvokeError> {
        self.run(WindowCmd::SetIcon { icon }).await
    }

    pub async fn start_dragging(&self) -> Result<(), InvokeError> {
        self.run(WindowCmd::StartDragging).await
    }

    // -- Window-scoped events -----------------------------------------------

    pub async fn listen<H: EventHandler>(
        &self,
        event: impl Into<String>,
        handler: H,
    ) -> Result<Unlisten, InvokeError> {
        self.bus
            .listen(event, WindowScope::window(self.label.clone()), handler)
            .await
    }

    pub async fn once<H: EventHandler>(
        &self,
        event: impl Into<String>,
        handler: H,
    ) -> Result<Unlisten, InvokeError> {
        self.bus
            .once(event, WindowScope::window(self.label.clone()), handler)
            .await
    }

    /// Emit `event` to listeners scoped to this window.
    pub async fn emit(
        &self,
        event: impl Into<String>,
        payload: Option<String>,
    ) -> Result<(), InvokeError> {
        self.bus.emit(event, Some(&self.label), payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::Envelope;
    use crate::registry::CallbackRegistry;
    use crate::transport::ChannelTransport;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    /// Answer every envelope with `answer` and forward the command body.
    fn answering(
        answer: Value,
        is_current: bool,
    ) -> (WindowHandle, mpsc::UnboundedReceiver<Value>) {
        let (transport, mut rx) = ChannelTransport::new();
        let registry = CallbackRegistry::new();
        let invoker = Invoker::new(registry.clone(), Arc::new(transport));
        let bus = EventBus::new(invoker.clone());
        let (seen_tx, seen_rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(raw) = rx.recv().await {
                let envelope = Envelope::from_json(&raw).unwrap();
                registry.invoke(envelope.success_id, answer.clone());
                let _ = seen_tx.send(envelope.command);
            }
        });
        let handle = WindowHandle::new("main".into(), is_current, invoker, bus);
        (handle, seen_rx)
    }

    #[tokio::test]
    async fn current_window_commands_are_unlabelled() {
        let (window, mut seen) = answering(Value::Null, true);
        window.set_title("Hello").await.unwrap();
        assert_eq!(
            seen.recv().await.unwrap(),
            json!({"cmd": "setTitle", "data": "Hello"})
        );
    }

    #[tokio::test]
    async fn other_window_commands_carry_label() {
        let (window, mut seen) = answering(Value::Null, false);
        window.maximize().await.unwrap();
        assert_eq!(
            seen.recv().await.unwrap(),
            json!({"cmd": "maximize", "label": "main"})
        );
    }

    #[tokio::test]
    async fn single_dimension_setters() {
        let (window, mut seen) = answering(Value::Null, true);
        window.set_width(640.0).await.unwrap();
        window.set_y(12.0).await.unwrap();
        assert_eq!(
            seen.recv().await.unwrap(),
            json!({"cmd": "setWidth", "data": 640.0})
        );
        assert_eq!(seen.recv().await.unwrap(), json!({"cmd": "setY", "data": 12.0}));
    }

    #[tokio::test]
    async fn size_getter_decodes() {
        let (window, _seen) = answering(json!({"width": 800, "height": 600}), true);
        let size = window.inner_size().await.unwrap();
        assert_eq!(
            size,
            PhysicalSize {
                width: 800,
                height: 600
            }
        );
    }

    #[tokio::test]
    async fn getter_with_wrong_shape_is_decode_error() {
        let (window, _seen) = answering(json!("yes"), true);
        let err = window.is_fullscreen().await.unwrap_err();
        assert!(matches!(err, InvokeError::Decode(_)));
    }

    #[tokio::test]
    async fn host_rejection_propagates() {
        let (transport, mut rx) = ChannelTransport::new();
        let registry = CallbackRegistry::new();
        let invoker = Invoker::new(registry.clone(), Arc::new(transport));
        let window = WindowHandle::new("gone".into(), false, invoker.clone(), EventBus::new(invoker));
        tokio::spawn(async move {
            let envelope = Envelope::from_json(&rx.recv().await.unwrap()).unwrap();
            registry.invoke(envelope.failure_id, json!("window not found: gone"));
        });

        let err = window.hide().await.unwrap_err();
        assert_eq!(err.rejection(), Some(&json!("window not found: gone")));
    }

    #[tokio::test]
    async fn window_events_are_scoped_to_label() {
        let (window, mut seen) = answering(Value::Null, true);
        let unlisten = window.listen("resized", |_: crate::events::Event| {}).await.unwrap();
        let listen = seen.recv().await.unwrap();
        assert_eq!(listen["windowLabel"], "main");
        assert_eq!(listen["handler"], json!(unlisten.id()));

        window.emit("resized", Some("{}".into())).await.unwrap();
        let emit = seen.recv().await.unwrap();
        assert_eq!(
            emit,
            json!({"cmd": "emit", "event": "resized", "windowLabel": "main", "payload": "{}"})
        );
    }

    #[tokio::test]
    async fn monitor_getters_decode() {
        let monitor = json!({
            "name": "DP-1",
            "size": {"width": 1920, "height": 1080},
            "position": {"x": 0, "y": 0},
            "scaleFactor": 1.0,
        });
        let (window, mut seen) = answering(monitor.clone(), true);
        let current = window.current_monitor().await.unwrap().unwrap();
        assert_eq!(current.name.as_deref(), Some("DP-1"));
        assert_eq!(current.size.width, 1920);
        assert_eq!(seen.recv().await.unwrap(), json!({"cmd": "currentMonitor"}));

        let (window, _seen) = answering(Value::Null, true);
        assert_eq!(window.primary_monitor().await.unwrap(), None);

        let (window, _seen) = answering(json!([monitor.clone(), monitor]), false);
        assert_eq!(window.available_monitors().await.unwrap().len(), 2);
    }
}

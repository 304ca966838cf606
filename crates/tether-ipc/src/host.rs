//! In-process host that answers bridge envelopes.
//!
//! `LoopbackHost` plays the native side of the bridge without a webview:
//! it keeps a small per-window state table, routes events to listener
//! callback ids and answers every envelope through the success or failure
//! id it names. Answers are posted as [`HostMessage`] JSON text on the
//! outbound channel returned by [`LoopbackHost::new`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::{json, Map, Value};
use tether_common::{CallbackId, ModuleName, WindowDescriptor, WindowScope};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::command::{command_name, EventCmd, NotificationCmd, NotificationOptions, WindowCmd};
use crate::events::EventDelivery;
use crate::ipc::{Envelope, HostMessage};
use crate::window::types::{Monitor, PhysicalPosition, PhysicalSize, Size, WindowOptions};
use crate::window::HostGlobals;

/// Event emitted to every listener when a window is created.
pub const WINDOW_CREATED_EVENT: &str = "tether://window-created";

/// Height in physical pixels the host reserves for a decorated title bar.
const TITLE_BAR_HEIGHT: u32 = 28;

const DEFAULT_SIZE: PhysicalSize = PhysicalSize {
    width: 800,
    height: 600,
};

/// Displays the loopback host pretends to have. The first is primary.
fn monitors() -> Vec<Monitor> {
    vec![
        Monitor {
            name: Some("loopback-1".into()),
            size: PhysicalSize {
                width: 1920,
                height: 1080,
            },
            position: PhysicalPosition::default(),
            scale_factor: 1.0,
        },
        Monitor {
            name: Some("loopback-2".into()),
            size: PhysicalSize {
                width: 2560,
                height: 1440,
            },
            position: PhysicalPosition { x: 1920, y: 0 },
            scale_factor: 2.0,
        },
    ]
}

// =============================================================================
// STATE
// =============================================================================

/// What the loopback host knows about one window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowState {
    pub title: String,
    pub url: Option<String>,
    pub scale_factor: f64,
    pub position: PhysicalPosition,
    pub size: PhysicalSize,
    pub min_size: Option<Size>,
    pub max_size: Option<Size>,
    pub resizable: bool,
    pub decorations: bool,
    pub always_on_top: bool,
    pub visible: bool,
    pub maximized: bool,
    pub minimized: bool,
    pub fullscreen: bool,
    pub has_icon: bool,
}

impl Default for WindowState {
    fn default() -> Self {
        Self {
            title: String::new(),
            url: None,
            scale_factor: 1.0,
            position: PhysicalPosition::default(),
            size: DEFAULT_SIZE,
            min_size: None,
            max_size: None,
            resizable: true,
            decorations: true,
            always_on_top: false,
            visible: true,
            maximized: false,
            minimized: false,
            fullscreen: false,
            has_icon: false,
        }
    }
}

impl WindowState {
    fn from_options(options: &WindowOptions) -> Self {
        let mut state = Self {
            title: options.title.clone().unwrap_or_default(),
            url: options.url.clone(),
            resizable: options.resizable.unwrap_or(true),
            decorations: options.decorations.unwrap_or(true),
            always_on_top: options.always_on_top.unwrap_or(false),
            visible: options.visible.unwrap_or(true),
            maximized: options.maximized.unwrap_or(false),
            fullscreen: options.fullscreen.unwrap_or(false),
            ..Self::default()
        };
        if let (Some(w), Some(h)) = (options.min_width, options.min_height) {
            state.min_size = Some(Size::new(w, h));
        }
        if let (Some(w), Some(h)) = (options.max_width, options.max_height) {
            state.max_size = Some(Size::new(w, h));
        }
        let width = options.width.unwrap_or(f64::from(DEFAULT_SIZE.width));
        let height = options.height.unwrap_or(f64::from(DEFAULT_SIZE.height));
        state.set_size(Size::new(width, height));
        state.set_position(options.x.unwrap_or(0.0), options.y.unwrap_or(0.0));
        state
    }

    fn physical(&self, logical: f64) -> f64 {
        (logical * self.scale_factor).round()
    }

    /// Apply a logical size, clamped to the configured limits.
    fn set_size(&mut self, size: Size) {
        let mut width = size.width;
        let mut height = size.height;
        if let Some(min) = self.min_size {
            width = width.max(min.width);
            height = height.max(min.height);
        }
        if let Some(max) = self.max_size {
            width = width.min(max.width);
            height = height.min(max.height);
        }
        self.size = PhysicalSize {
            width: self.physical(width).max(0.0) as u32,
            height: self.physical(height).max(0.0) as u32,
        };
    }

    fn logical_size(&self) -> Size {
        Size::new(
            f64::from(self.size.width) / self.scale_factor,
            f64::from(self.size.height) / self.scale_factor,
        )
    }

    fn set_position(&mut self, x: f64, y: f64) {
        self.position = PhysicalPosition {
            x: self.physical(x) as i32,
            y: self.physical(y) as i32,
        };
    }

    fn logical_position(&self) -> (f64, f64) {
        (
            f64::from(self.position.x) / self.scale_factor,
            f64::from(self.position.y) / self.scale_factor,
        )
    }

    fn title_bar(&self) -> u32 {
        if self.decorations && !self.fullscreen {
            TITLE_BAR_HEIGHT
        } else {
            0
        }
    }

    fn inner_position(&self) -> PhysicalPosition {
        PhysicalPosition {
            x: self.position.x,
            y: self.position.y + self.title_bar() as i32,
        }
    }

    fn outer_size(&self) -> PhysicalSize {
        PhysicalSize {
            width: self.size.width,
            height: self.size.height + self.title_bar(),
        }
    }
}

/// An event-name to callback-id route installed by a `listen` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub event: String,
    pub handler: CallbackId,
    pub once: bool,
    pub scope: WindowScope,
}

struct HostState {
    current: String,
    windows: BTreeMap<String, WindowState>,
    routes: Vec<Route>,
    notifications: Vec<NotificationOptions>,
    notifications_allowed: bool,
}

type Reply = Result<Value, Value>;

// =============================================================================
// HOST
// =============================================================================

#[derive(Clone)]
pub struct LoopbackHost {
    state: Arc<Mutex<HostState>>,
    outbox: mpsc::UnboundedSender<String>,
}

impl LoopbackHost {
    /// Create a host whose windows are those of `globals`. The receiver
    /// yields every message the host posts back to the bridge.
    pub fn new(globals: &HostGlobals) -> (Self, mpsc::UnboundedReceiver<String>) {
        let windows = globals
            .windows()
            .iter()
            .map(|w| (w.label.clone(), WindowState::default()))
            .collect();
        let state = HostState {
            current: globals.current().label.clone(),
            windows,
            routes: Vec::new(),
            notifications: Vec::new(),
            notifications_allowed: false,
        };
        let (outbox, inbox) = mpsc::unbounded_channel();
        let host = Self {
            state: Arc::new(Mutex::new(state)),
            outbox,
        };
        (host, inbox)
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The globals this host would inject into a new webview.
    pub fn globals(&self) -> HostGlobals {
        let state = self.lock();
        let windows = state.windows.keys().map(WindowDescriptor::new).collect();
        HostGlobals::new(WindowDescriptor::new(state.current.clone()), windows)
    }

    pub fn window(&self, label: &str) -> Option<WindowState> {
        self.lock().windows.get(label).cloned()
    }

    pub fn window_labels(&self) -> Vec<String> {
        self.lock().windows.keys().cloned().collect()
    }

    pub fn routes(&self) -> Vec<Route> {
        self.lock().routes.clone()
    }

    pub fn notifications(&self) -> Vec<NotificationOptions> {
        self.lock().notifications.clone()
    }

    /// Process one raw envelope. Malformed envelopes are logged and dropped
    /// since there is no callback id to answer.
    pub fn handle_message(&self, raw: &str) {
        let Some(envelope) = Envelope::from_json(raw) else {
            warn!(len = raw.len(), "host dropped malformed envelope");
            return;
        };
        for message in self.handle_envelope(&envelope) {
            self.post(message);
        }
    }

    /// Process one envelope and return the messages to post, in order.
    /// Event deliveries come before the acknowledgement of the command
    /// that caused them.
    pub fn handle_envelope(&self, envelope: &Envelope) -> Vec<HostMessage> {
        debug!(
            module = %envelope.module,
            cmd = command_name(&envelope.command),
            success_id = %envelope.success_id,
            "host received command"
        );
        let mut messages = Vec::new();
        let reply = match envelope.module {
            ModuleName::Window => self.window_command(&envelope.command, &mut messages),
            ModuleName::Event => self.event_command(&envelope.command, &mut messages),
            ModuleName::Notification => self.notification_command(&envelope.command),
            module => Err(json!(format!("module {module} is not available"))),
        };
        let answer = match reply {
            Ok(payload) => HostMessage::new(envelope.success_id, payload),
            Err(reason) => {
                debug!(module = %envelope.module, reason = %reason, "host rejected command");
                HostMessage::new(envelope.failure_id, reason)
            }
        };
        messages.push(answer);
        messages
    }

    fn post(&self, message: HostMessage) {
        match message.to_json() {
            Ok(raw) => {
                if self.outbox.send(raw).is_err() {
                    debug!(callback = %message.callback, "bridge gone; host message dropped");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize host message"),
        }
    }

    /// Serve envelopes until the transport closes.
    pub async fn run(self, mut inbound: mpsc::UnboundedReceiver<String>) {
        while let Some(raw) = inbound.recv().await {
            self.handle_message(&raw);
        }
        info!("loopback host stopped: transport closed");
    }

    pub fn spawn(self, inbound: mpsc::UnboundedReceiver<String>) -> JoinHandle<()> {
        tokio::spawn(self.run(inbound))
    }

    // -- Window module --------------------------------------------------------

    fn window_command(&self, command: &Value, out: &mut Vec<HostMessage>) -> Reply {
        let mut body: Map<String, Value> = match command {
            Value::Object(map) => map.clone(),
            _ => return Err(json!("window command must be an object")),
        };
        let label = match body.remove("label") {
            Some(Value::String(label)) => Some(label),
            Some(_) => return Err(json!("window label must be a string")),
            None => None,
        };
        let cmd: WindowCmd = serde_json::from_value(Value::Object(body))
            .map_err(|e| json!(format!("invalid window command: {e}")))?;

        match cmd {
            WindowCmd::CreateWebview { options } => self.create_window(options, out),
            WindowCmd::Close => self.close_window(label),
            cmd => {
                let mut state = self.lock();
                let label = label.unwrap_or_else(|| state.current.clone());
                match state.windows.get_mut(&label) {
                    Some(window) => apply(window, &label, cmd),
                    None => Err(json!(format!("window not found: {label}"))),
                }
            }
        }
    }

    fn close_window(&self, label: Option<String>) -> Reply {
        let mut state = self.lock();
        let label = label.unwrap_or_else(|| state.current.clone());
        if state.windows.remove(&label).is_none() {
            return Err(json!(format!("window not found: {label}")));
        }
        state
            .routes
            .retain(|r| r.scope.label() != Some(label.as_str()));
        info!(label = %label, "window closed");
        Ok(Value::Null)
    }

    fn create_window(&self, options: WindowOptions, out: &mut Vec<HostMessage>) -> Reply {
        let label = options.label.clone();
        {
            let mut state = self.lock();
            if label.is_empty() {
                return Err(json!("window label must not be empty"));
            }
            if state.windows.contains_key(&label) {
                return Err(json!(format!("a window labelled {label} already exists")));
            }
            state
                .windows
                .insert(label.clone(), WindowState::from_options(&options));
        }
        info!(label = %label, "window created");
        let payload = serde_json::to_string(&json!({ "label": label }))
            .map_err(|e| json!(e.to_string()))?;
        self.route_event(WINDOW_CREATED_EVENT, None, Some(payload), out);
        Ok(Value::Null)
    }

    // -- Event module ---------------------------------------------------------

    fn event_command(&self, command: &Value, out: &mut Vec<HostMessage>) -> Reply {
        let cmd: EventCmd = serde_json::from_value(command.clone())
            .map_err(|e| json!(format!("invalid event command: {e}")))?;
        match cmd {
            EventCmd::Listen {
                event,
                handler,
                once,
                window_label,
            } => {
                let mut state = self.lock();
                state.routes.retain(|r| r.handler != handler);
                state.routes.push(Route {
                    event,
                    handler,
                    once,
                    scope: WindowScope::from(window_label),
                });
            }
            EventCmd::Unlisten { event, handler } => {
                let mut state = self.lock();
                let before = state.routes.len();
                state
                    .routes
                    .retain(|r| !(r.handler == handler && r.event == event));
                if state.routes.len() == before {
                    debug!(%handler, event = %event, "unlisten for unknown route");
                }
            }
            EventCmd::Emit {
                event,
                window_label,
                payload,
            } => self.route_event(&event, window_label, payload, out),
        }
        Ok(Value::Null)
    }

    /// Queue a delivery for every route of `event`. Scope filtering is left
    /// to the bridge; a once-route is dropped only when the delivery is in
    /// its scope.
    fn route_event(
        &self,
        event: &str,
        window_label: Option<String>,
        payload: Option<String>,
        out: &mut Vec<HostMessage>,
    ) {
        let delivery = EventDelivery {
            event: event.to_string(),
            window_label: window_label.clone(),
            payload: payload.map(Value::String).unwrap_or(Value::Null),
        };
        let delivery = match serde_json::to_value(&delivery) {
            Ok(value) => value,
            Err(e) => {
                warn!(event, error = %e, "failed to encode event delivery");
                return;
            }
        };

        let mut state = self.lock();
        let target = window_label.as_deref();
        let mut routed = 0usize;
        state.routes.retain(|route| {
            if route.event != event {
                return true;
            }
            routed += 1;
            out.push(HostMessage::new(route.handler, delivery.clone()));
            !(route.once && route.scope.accepts(target))
        });
        debug!(event, window = ?target, routed, "event routed");
    }

    // -- Notification module --------------------------------------------------

    fn notification_command(&self, command: &Value) -> Reply {
        let cmd: NotificationCmd = serde_json::from_value(command.clone())
            .map_err(|e| json!(format!("invalid notification command: {e}")))?;
        let mut state = self.lock();
        match cmd {
            NotificationCmd::Notification { options } => {
                if !state.notifications_allowed {
                    return Err(json!("notification permission not granted"));
                }
                info!(title = %options.title, "notification shown");
                state.notifications.push(options);
                Ok(Value::Null)
            }
            NotificationCmd::RequestNotificationPermission => {
                state.notifications_allowed = true;
                Ok(json!("granted"))
            }
            NotificationCmd::IsNotificationPermissionGranted => {
                Ok(Value::Bool(state.notifications_allowed))
            }
        }
    }
}

impl std::fmt::Debug for LoopbackHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("LoopbackHost")
            .field("current", &state.current)
            .field("windows", &state.windows.len())
            .field("routes", &state.routes.len())
            .finish()
    }
}

fn to_reply<T: Serialize>(value: T) -> Reply {
    serde_json::to_value(value).map_err(|e| json!(e.to_string()))
}

/// Run a getter or state change against one existing window.
fn apply(window: &mut WindowState, label: &str, cmd: WindowCmd) -> Reply {
    match cmd {
        WindowCmd::ScaleFactor => return to_reply(window.scale_factor),
        WindowCmd::InnerPosition => return to_reply(window.inner_position()),
        WindowCmd::OuterPosition => return to_reply(window.position),
        WindowCmd::InnerSize => return to_reply(window.size),
        WindowCmd::OuterSize => return to_reply(window.outer_size()),
        WindowCmd::IsFullscreen => return to_reply(window.fullscreen),
        WindowCmd::IsMaximized => return to_reply(window.maximized),
        WindowCmd::CurrentMonitor => {
            let current = monitors().into_iter().find(|m| m.contains(window.position));
            return to_reply(current);
        }
        WindowCmd::PrimaryMonitor => return to_reply(monitors().into_iter().next()),
        WindowCmd::AvailableMonitors => return to_reply(monitors()),
        WindowCmd::SetResizable(resizable) => window.resizable = resizable,
        WindowCmd::SetTitle(title) => window.title = title,
        WindowCmd::Maximize => window.maximized = true,
        WindowCmd::Unmaximize => window.maximized = false,
        WindowCmd::Minimize => window.minimized = true,
        WindowCmd::Unminimize => window.minimized = false,
        WindowCmd::Show => window.visible = true,
        WindowCmd::Hide => window.visible = false,
        WindowCmd::SetDecorations(decorations) => window.decorations = decorations,
        WindowCmd::SetAlwaysOnTop(on_top) => window.always_on_top = on_top,
        WindowCmd::SetWidth(width) => {
            let height = window.logical_size().height;
            window.set_size(Size::new(width, height));
        }
        WindowCmd::SetHeight(height) => {
            let width = window.logical_size().width;
            window.set_size(Size::new(width, height));
        }
        WindowCmd::SetSize(size) => window.set_size(size),
        WindowCmd::SetMinSize(size) => {
            window.min_size = size;
            let current = window.logical_size();
            window.set_size(current);
        }
        WindowCmd::SetMaxSize(size) => {
            window.max_size = size;
            let current = window.logical_size();
            window.set_size(current);
        }
        WindowCmd::SetX(x) => {
            let (_, y) = window.logical_position();
            window.set_position(x, y);
        }
        WindowCmd::SetY(y) => {
            let (x, _) = window.logical_position();
            window.set_position(x, y);
        }
        WindowCmd::SetPosition(position) => window.set_position(position.x, position.y),
        WindowCmd::SetFullscreen(fullscreen) => window.fullscreen = fullscreen,
        WindowCmd::SetIcon { .. } => window.has_icon = true,
        WindowCmd::StartDragging => {
            if !window.visible {
                return Err(json!(format!("window {label} is hidden")));
            }
        }
        WindowCmd::CreateWebview { .. } | WindowCmd::Close => {
            return Err(json!("not a per-window command"));
        }
    }
    Ok(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::window::types::Position;

    fn host() -> (LoopbackHost, mpsc::UnboundedReceiver<String>) {
        let globals = HostGlobals::new(
            WindowDescriptor::new("main"),
            vec![WindowDescriptor::new("tools")],
        );
        LoopbackHost::new(&globals)
    }

    fn envelope(command: Command) -> Envelope {
        Envelope {
            module: command.module(),
            command: command.to_message().unwrap(),
            success_id: CallbackId::new(1),
            failure_id: CallbackId::new(2),
        }
    }

    fn answer(host: &LoopbackHost, command: Command) -> HostMessage {
        let mut messages = host.handle_envelope(&envelope(command));
        messages.pop().unwrap()
    }

    #[test]
    fn unlabelled_commands_target_current_window() {
        let (host, _rx) = host();
        let reply = answer(&host, Command::window(WindowCmd::SetTitle("Main".into())));
        assert_eq!(reply, HostMessage::new(CallbackId::new(1), Value::Null));
        assert_eq!(host.window("main").unwrap().title, "Main");
        assert_eq!(host.window("tools").unwrap().title, "");
    }

    #[test]
    fn unknown_window_is_rejected() {
        let (host, _rx) = host();
        let reply = answer(&host, Command::window_for("nope", WindowCmd::Show));
        assert_eq!(
            reply,
            HostMessage::new(CallbackId::new(2), json!("window not found: nope"))
        );
    }

    #[test]
    fn single_dimension_setters_keep_the_other() {
        let (host, _rx) = host();
        answer(&host, Command::window(WindowCmd::SetWidth(1024.0)));
        answer(&host, Command::window(WindowCmd::SetPosition(Position::new(5.0, 6.0))));
        answer(&host, Command::window(WindowCmd::SetY(40.0)));

        let main = host.window("main").unwrap();
        assert_eq!(main.size, PhysicalSize { width: 1024, height: 600 });
        assert_eq!(main.position, PhysicalPosition { x: 5, y: 40 });
    }

    #[test]
    fn size_is_clamped_to_limits() {
        let (host, _rx) = host();
        answer(&host, Command::window(WindowCmd::SetMinSize(Some(Size::new(300.0, 200.0)))));
        answer(&host, Command::window(WindowCmd::SetSize(Size::new(100.0, 100.0))));
        assert_eq!(
            host.window("main").unwrap().size,
            PhysicalSize { width: 300, height: 200 }
        );
    }

    #[test]
    fn getters_answer_with_state() {
        let (host, _rx) = host();
        let reply = answer(&host, Command::window(WindowCmd::OuterSize));
        assert_eq!(reply.payload, json!({"width": 800, "height": 628}));
        answer(&host, Command::window(WindowCmd::SetFullscreen(true)));
        let reply = answer(&host, Command::window(WindowCmd::IsFullscreen));
        assert_eq!(reply.payload, json!(true));
    }

    #[test]
    fn close_removes_window_and_its_routes() {
        let (host, _rx) = host();
        answer(
            &host,
            Command::Event(EventCmd::Listen {
                event: "x".into(),
                handler: CallbackId::new(10),
                once: false,
                window_label: Some("tools".into()),
            }),
        );
        answer(&host, Command::window_for("tools", WindowCmd::Close));
        assert!(host.window("tools").is_none());
        assert!(host.routes().is_empty());
        assert_eq!(host.window_labels(), vec!["main".to_string()]);
    }

    #[test]
    fn emit_delivers_before_acknowledging() {
        let (host, _rx) = host();
        answer(
            &host,
            Command::Event(EventCmd::Listen {
                event: "ping".into(),
                handler: CallbackId::new(10),
                once: false,
                window_label: None,
            }),
        );
        let messages = host.handle_envelope(&envelope(Command::Event(EventCmd::Emit {
            event: "ping".into(),
            window_label: Some("main".into()),
            payload: Some("hi".into()),
        })));
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].callback, CallbackId::new(10));
        assert_eq!(
            messages[0].payload,
            json!({"event": "ping", "windowLabel": "main", "payload": "hi"})
        );
        assert_eq!(messages[1].callback, CallbackId::new(1));
    }

    #[test]
    fn once_route_survives_out_of_scope_emission() {
        let (host, _rx) = host();
        answer(
            &host,
            Command::Event(EventCmd::Listen {
                event: "ready".into(),
                handler: CallbackId::new(10),
                once: true,
                window_label: Some("main".into()),
            }),
        );
        let emit = |label: &str| {
            Command::Event(EventCmd::Emit {
                event: "ready".into(),
                window_label: Some(label.into()),
                payload: None,
            })
        };
        answer(&host, emit("tools"));
        assert_eq!(host.routes().len(), 1);
        answer(&host, emit("main"));
        assert!(host.routes().is_empty());
    }

    #[test]
    fn unlisten_removes_route() {
        let (host, _rx) = host();
        answer(
            &host,
            Command::Event(EventCmd::Listen {
                event: "ping".into(),
                handler: CallbackId::new(10),
                once: false,
                window_label: None,
            }),
        );
        let reply = answer(
            &host,
            Command::Event(EventCmd::Unlisten {
                event: "ping".into(),
                handler: CallbackId::new(10),
            }),
        );
        assert_eq!(reply.callback, CallbackId::new(1));
        assert!(host.routes().is_empty());
    }

    #[test]
    fn create_window_announces_itself() {
        let (host, _rx) = host();
        answer(
            &host,
            Command::Event(EventCmd::Listen {
                event: WINDOW_CREATED_EVENT.into(),
                handler: CallbackId::new(10),
                once: false,
                window_label: None,
            }),
        );
        let messages = host.handle_envelope(&envelope(Command::window(WindowCmd::CreateWebview {
            options: WindowOptions::new("settings").with_title("Settings"),
        })));
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].payload["payload"], json!("{\"label\":\"settings\"}"));
        assert_eq!(host.window("settings").unwrap().title, "Settings");

        let again = answer(
            &host,
            Command::window(WindowCmd::CreateWebview {
                options: WindowOptions::new("settings"),
            }),
        );
        assert_eq!(again.callback, CallbackId::new(2));
        assert_eq!(host.globals().windows().len(), 3);
    }

    #[test]
    fn notifications_need_permission() {
        let (host, _rx) = host();
        let show = Command::Notification(NotificationCmd::Notification {
            options: NotificationOptions {
                title: "Done".into(),
                body: None,
                icon: None,
            },
        });
        assert_eq!(answer(&host, show.clone()).callback, CallbackId::new(2));

        let granted = answer(
            &host,
            Command::Notification(NotificationCmd::RequestNotificationPermission),
        );
        assert_eq!(granted.payload, json!("granted"));
        assert_eq!(answer(&host, show).callback, CallbackId::new(1));
        assert_eq!(host.notifications().len(), 1);
    }

    #[test]
    fn unsupported_module_is_rejected() {
        let (host, _rx) = host();
        let command = Command::raw(ModuleName::Dialog, json!({"cmd": "open"})).unwrap();
        let reply = answer(&host, command);
        assert_eq!(reply.callback, CallbackId::new(2));
        assert_eq!(reply.payload, json!("module dialog is not available"));
    }

    #[tokio::test]
    async fn handle_message_posts_answers() {
        let (host, mut rx) = host();
        let raw = envelope(Command::window(WindowCmd::IsMaximized)).to_json().unwrap();
        host.handle_message(&raw);
        host.handle_message("garbage");

        let posted = HostMessage::from_json(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(posted, HostMessage::new(CallbackId::new(1), json!(false)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn monitors_follow_window_position() {
        let (host, _rx) = host();
        let reply = answer(&host, Command::window(WindowCmd::AvailableMonitors));
        let all: Vec<Monitor> = serde_json::from_value(reply.payload).unwrap();
        assert_eq!(all, monitors());

        let reply = answer(&host, Command::window(WindowCmd::PrimaryMonitor));
        assert_eq!(reply.payload["name"], "loopback-1");

        answer(
            &host,
            Command::window(WindowCmd::SetPosition(Position::new(2000.0, 10.0))),
        );
        let reply = answer(&host, Command::window(WindowCmd::CurrentMonitor));
        assert_eq!(reply.payload["name"], "loopback-2");

        answer(
            &host,
            Command::window(WindowCmd::SetPosition(Position::new(-500.0, -500.0))),
        );
        let reply = answer(&host, Command::window(WindowCmd::CurrentMonitor));
        assert_eq!(reply, HostMessage::new(CallbackId::new(1), Value::Null));
    }
}

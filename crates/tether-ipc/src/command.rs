//! Typed commands addressed to host modules.
//!
//! Window, event and notification commands have fixed shapes and are
//! modelled as enums. Every other module takes a raw JSON object that is
//! checked for a `cmd` field when the command is built.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tether_common::{CallbackId, InvokeError, ModuleName, TransportError};

use crate::window::types::{Icon, Position, Size, WindowOptions};

// =============================================================================
// WINDOW
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "data", rename_all = "camelCase")]
pub enum WindowCmd {
    CreateWebview {
        options: WindowOptions,
    },
    // Getters
    ScaleFactor,
    InnerPosition,
    OuterPosition,
    InnerSize,
    OuterSize,
    IsFullscreen,
    IsMaximized,
    CurrentMonitor,
    PrimaryMonitor,
    AvailableMonitors,
    // Setters
    SetResizable(bool),
    SetTitle(String),
    Maximize,
    Unmaximize,
    Minimize,
    Unminimize,
    Show,
    Hide,
    Close,
    SetDecorations(bool),
    SetAlwaysOnTop(bool),
    SetWidth(f64),
    SetHeight(f64),
    SetSize(Size),
    SetMinSize(Option<Size>),
    SetMaxSize(Option<Size>),
    SetX(f64),
    SetY(f64),
    SetPosition(Position),
    SetFullscreen(bool),
    SetIcon {
        icon: Icon,
    },
    StartDragging,
}

// =============================================================================
// EVENT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "camelCase")]
pub enum EventCmd {
    /// Route future occurrences of `event` to callback `handler`.
    Listen {
        event: String,
        handler: CallbackId,
        once: bool,
        #[serde(
            rename = "windowLabel",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        window_label: Option<String>,
    },
    Unlisten {
        event: String,
        handler: CallbackId,
    },
    Emit {
        event: String,
        #[serde(
            rename = "windowLabel",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        window_label: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<String>,
    },
}

// =============================================================================
// NOTIFICATION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationOptions {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "camelCase")]
pub enum NotificationCmd {
    Notification { options: NotificationOptions },
    RequestNotificationPermission,
    IsNotificationPermissionGranted,
}

// =============================================================================
// COMMAND
// =============================================================================

/// A command for one host module.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `label: None` targets the window whose webview sent the command.
    Window {
        label: Option<String>,
        cmd: WindowCmd,
    },
    Event(EventCmd),
    Notification(NotificationCmd),
    Raw {
        module: ModuleName,
        message: Map<String, Value>,
    },
}

impl Command {
    pub fn window(cmd: WindowCmd) -> Self {
        Command::Window { label: None, cmd }
    }

    pub fn window_for(label: impl Into<String>, cmd: WindowCmd) -> Self {
        Command::Window {
            label: Some(label.into()),
            cmd,
        }
    }

    /// Build a command for a module without a typed form. `message` must
    /// be a JSON object with a non-empty string `cmd`.
    pub fn raw(module: ModuleName, message: Value) -> Result<Self, InvokeError> {
        let Value::Object(message) = message else {
            return Err(InvokeError::InvalidCommand(format!(
                "{module} command must be a JSON object"
            )));
        };
        match message.get("cmd").and_then(Value::as_str) {
            Some(cmd) if !cmd.is_empty() => Ok(Command::Raw { module, message }),
            _ => Err(InvokeError::InvalidCommand(format!(
                "{module} command is missing a `cmd` name"
            ))),
        }
    }

    pub fn module(&self) -> ModuleName {
        match self {
            Command::Window { .. } => ModuleName::Window,
            Command::Event(_) => ModuleName::Event,
            Command::Notification(_) => ModuleName::Notification,
            Command::Raw { module, .. } => *module,
        }
    }

    /// The JSON body carried in the envelope's `command` field.
    pub fn to_message(&self) -> Result<Value, TransportError> {
        let value = match self {
            Command::Window { label, cmd } => {
                let mut value = serde_json::to_value(cmd)?;
                if let (Some(label), Value::Object(map)) = (label, &mut value) {
                    map.insert("label".into(), Value::String(label.clone()));
                }
                value
            }
            Command::Event(cmd) => serde_json::to_value(cmd)?,
            Command::Notification(cmd) => serde_json::to_value(cmd)?,
            Command::Raw { message, .. } => Value::Object(message.clone()),
        };
        Ok(value)
    }
}

/// Name of the command inside a serialized message, for logging.
pub(crate) fn command_name(message: &Value) -> &str {
    message.get("cmd").and_then(Value::as_str).unwrap_or("?")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unit_window_command_has_no_data() {
        let message = Command::window(WindowCmd::Maximize).to_message().unwrap();
        assert_eq!(message, json!({"cmd": "maximize"}));
    }

    #[test]
    fn window_command_carries_data() {
        let message = Command::window(WindowCmd::SetTitle("Hello".into()))
            .to_message()
            .unwrap();
        assert_eq!(message, json!({"cmd": "setTitle", "data": "Hello"}));
    }

    #[test]
    fn labelled_window_command() {
        let message = Command::window_for("settings", WindowCmd::SetAlwaysOnTop(true))
            .to_message()
            .unwrap();
        assert_eq!(
            message,
            json!({"cmd": "setAlwaysOnTop", "data": true, "label": "settings"})
        );
    }

    #[test]
    fn struct_window_payloads() {
        let message = Command::window(WindowCmd::SetSize(Size::new(800.0, 600.0)))
            .to_message()
            .unwrap();
        assert_eq!(
            message,
            json!({"cmd": "setSize", "data": {"width": 800.0, "height": 600.0}})
        );

        let message = Command::window(WindowCmd::SetMinSize(None))
            .to_message()
            .unwrap();
        assert_eq!(message, json!({"cmd": "setMinSize", "data": null}));
    }

    #[test]
    fn window_command_parses_back() {
        let cmd: WindowCmd =
            serde_json::from_value(json!({"cmd": "setFullscreen", "data": false})).unwrap();
        assert_eq!(cmd, WindowCmd::SetFullscreen(false));
        let cmd: WindowCmd = serde_json::from_value(json!({"cmd": "show"})).unwrap();
        assert_eq!(cmd, WindowCmd::Show);
    }

    #[test]
    fn listen_command_shape() {
        let cmd = Command::Event(EventCmd::Listen {
            event: "ping".into(),
            handler: CallbackId::new(5),
            once: true,
            window_label: Some("main".into()),
        });
        assert_eq!(cmd.module(), ModuleName::Event);
        assert_eq!(
            cmd.to_message().unwrap(),
            json!({"cmd": "listen", "event": "ping", "handler": 5, "once": true, "windowLabel": "main"})
        );
    }

    #[test]
    fn emit_omits_missing_fields() {
        let cmd = Command::Event(EventCmd::Emit {
            event: "ping".into(),
            window_label: None,
            payload: None,
        });
        assert_eq!(
            cmd.to_message().unwrap(),
            json!({"cmd": "emit", "event": "ping"})
        );

        let parsed: EventCmd = serde_json::from_value(json!({"cmd": "emit", "event": "ping"})).unwrap();
        assert_eq!(
            parsed,
            EventCmd::Emit {
                event: "ping".into(),
                window_label: None,
                payload: None
            }
        );
    }

    #[test]
    fn notification_commands() {
        let cmd = Command::Notification(NotificationCmd::Notification {
            options: NotificationOptions {
                title: "Done".into(),
                body: Some("Build finished".into()),
                icon: None,
            },
        });
        assert_eq!(cmd.module(), ModuleName::Notification);
        assert_eq!(
            cmd.to_message().unwrap(),
            json!({"cmd": "notification", "options": {"title": "Done", "body": "Build finished"}})
        );

        let cmd = Command::Notification(NotificationCmd::IsNotificationPermissionGranted);
        assert_eq!(
            cmd.to_message().unwrap(),
            json!({"cmd": "isNotificationPermissionGranted"})
        );
    }

    #[test]
    fn raw_command_is_passed_through() {
        let cmd = Command::raw(
            ModuleName::Filesystem,
            json!({"cmd": "readTextFile", "path": "notes.txt"}),
        )
        .unwrap();
        assert_eq!(cmd.module(), ModuleName::Filesystem);
        assert_eq!(
            cmd.to_message().unwrap(),
            json!({"cmd": "readTextFile", "path": "notes.txt"})
        );
    }

    #[test]
    fn raw_command_requires_object_with_cmd() {
        let err = Command::raw(ModuleName::Dialog, json!("open")).unwrap_err();
        assert!(matches!(err, InvokeError::InvalidCommand(_)));

        let err = Command::raw(ModuleName::Dialog, json!({"path": "x"})).unwrap_err();
        assert!(err.to_string().contains("missing a `cmd`"));

        let err = Command::raw(ModuleName::Dialog, json!({"cmd": ""})).unwrap_err();
        assert!(matches!(err, InvokeError::InvalidCommand(_)));
    }

    #[test]
    fn command_name_for_logging() {
        assert_eq!(command_name(&json!({"cmd": "setTitle"})), "setTitle");
        assert_eq!(command_name(&json!({})), "?");
    }

    #[test]
    fn monitor_getters_are_unit_commands() {
        for (cmd, name) in [
            (WindowCmd::CurrentMonitor, "currentMonitor"),
            (WindowCmd::PrimaryMonitor, "primaryMonitor"),
            (WindowCmd::AvailableMonitors, "availableMonitors"),
        ] {
            let message = Command::window(cmd).to_message().unwrap();
            assert_eq!(message, json!({ "cmd": name }));
        }
    }
}

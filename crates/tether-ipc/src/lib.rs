//! Callback-correlation and event bridge between a webview frontend and
//! its native host.
//!
//! Provides:
//! - A callback registry correlating host notifications with local handlers
//! - Request/response invocation over a fire-and-forget transport
//! - Named events scoped to one window or all windows
//! - Window handles addressing host windows by label
//! - An in-process loopback host for tests and demos

pub mod bridge;
pub mod command;
pub mod events;
pub mod host;
pub mod invoke;
pub mod ipc;
pub mod registry;
pub mod transport;
pub mod window;

pub use bridge::Bridge;
pub use command::{Command, EventCmd, NotificationCmd, NotificationOptions, WindowCmd};
pub use events::{Event, EventBus, EventDelivery, EventHandler, EventSubscription, Unlisten};
pub use host::{LoopbackHost, Route, WindowState, WINDOW_CREATED_EVENT};
pub use invoke::{Invoker, PendingInvocation};
pub use ipc::{Envelope, HostMessage};
pub use registry::{CallbackHandler, CallbackRegistry, DEFAULT_WARN_THRESHOLD};
pub use transport::{ChannelTransport, Transport};
pub use window::types::{
    Icon, Monitor, PhysicalPosition, PhysicalSize, Position, Size, WindowOptions,
};
pub use window::{HostGlobals, WindowHandle, WindowManager};

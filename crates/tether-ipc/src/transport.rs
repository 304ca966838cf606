//! Outbound transport to the native host.
//!
//! The transport is fire-and-forget: `post` returns once the message is
//! handed off, never after the host has answered. Answers come back
//! through `Bridge::deliver`.

use tether_common::TransportError;
use tokio::sync::mpsc;
use tracing::trace;

use crate::ipc::Envelope;

pub trait Transport: Send + Sync {
    /// Hand one serialized message to the host.
    fn post(&self, message: String) -> Result<(), TransportError>;

    fn send(&self, envelope: &Envelope) -> Result<(), TransportError> {
        let message = envelope.to_json()?;
        trace!(len = message.len(), "posting envelope");
        self.post(message)
    }
}

impl<F> Transport for F
where
    F: Fn(String) -> Result<(), TransportError> + Send + Sync,
{
    fn post(&self, message: String) -> Result<(), TransportError> {
        self(message)
    }
}

/// In-process transport backed by an unbounded channel. The receiving
/// half goes to whatever plays the host.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    sender: mpsc::UnboundedSender<String>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl Transport for ChannelTransport {
    fn post(&self, message: String) -> Result<(), TransportError> {
        self.sender.send(message).map_err(|_| TransportError::Closed)
    }
}

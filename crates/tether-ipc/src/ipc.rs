//! Wire format between the bridge and the native host.
//!
//! Messages flow in both directions:
//! - **Bridge -> host**: an [`Envelope`] naming the module, the command
//!   body and the success/failure callback ids.
//! - **Host -> bridge**: a [`HostMessage`] naming one callback id and its
//!   payload. This is the only inbound message kind; events are callback
//!   invocations whose payload is an [`crate::events::EventDelivery`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tether_common::{CallbackId, ModuleName, TransportError};

/// Outbound request, as serialized onto the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub module: ModuleName,
    pub command: Value,
    pub success_id: CallbackId,
    pub failure_id: CallbackId,
}

impl Envelope {
    pub fn to_json(&self) -> Result<String, TransportError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse an envelope from raw JSON (host side).
    pub fn from_json(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

/// Inbound notification: run callback `callback` with `payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostMessage {
    pub callback: CallbackId,
    #[serde(default)]
    pub payload: Value,
}

impl HostMessage {
    pub fn new(callback: CallbackId, payload: Value) -> Self {
        Self { callback, payload }
    }

    pub fn from_json(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    pub fn to_json(&self) -> Result<String, TransportError> {
        Ok(serde_json::to_string(self)?)
    }
}

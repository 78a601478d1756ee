//! Protocol handlers.
//!
//! Each side of the bus is one handler: a standalone state machine with a
//! role-specific delegate. Both dispatch inbound envelopes one at a time in
//! channel order; delegates answer through the handler reference they are
//! given.

pub mod inner;
pub mod outer;

use envbus_core::error::BusError;
use envbus_core::protocol::{Decoded, Message, RawEnvelope};

use crate::obs::BusMetrics;

pub use inner::{InnerDelegate, InnerHandler};
pub use outer::{ContentNames, HandshakeState, OuterDelegate, OuterHandler, OuterOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Host side.
    Outer,
    /// Editor side.
    Inner,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Outer => "outer",
            Role::Inner => "inner",
        }
    }
}

/// Decode an inbound envelope, recording what arrived. Malformed payloads are
/// logged and dropped.
pub(crate) fn decode_inbound(role: Role, metrics: &BusMetrics, raw: &RawEnvelope) -> Option<Message> {
    metrics.envelopes_received.inc(&[("role", role.as_str()), ("type", raw.msg_type.as_str())]);

    match raw.decode() {
        Ok(Decoded::Unknown(ty)) => {
            metrics.unknown_types.inc(&[("role", role.as_str())]);
            tracing::info!(role = role.as_str(), msg_type = %ty, "unknown message type received; ignored");
            None
        }
        Ok(Decoded::Known(msg)) => Some(msg),
        Err(e) => {
            metrics.decode_errors.inc(&[("role", role.as_str())]);
            tracing::warn!(role = role.as_str(), msg_type = %raw.msg_type, error = %e, "malformed envelope; ignored");
            None
        }
    }
}

/// Log a delegate failure. Delegate errors never stop dispatch.
pub(crate) fn delegate_failed(role: Role, metrics: &BusMetrics, msg_type: &str, err: &BusError) {
    metrics.delegate_errors.inc(&[("role", role.as_str()), ("type", msg_type)]);
    tracing::warn!(role = role.as_str(), msg_type, code = err.code().as_str(), error = %err, "delegate failed");
}

//! In-process loopback channel.
//!
//! Behaves like `postMessage` between two windows: every envelope is
//! serialized to JSON and parsed back on the other end, sends addressed to an
//! origin other than the peer's are dropped, and only subscribers attached at
//! send time see the envelope.

use tokio::sync::broadcast;

use envbus_core::error::Result;
use envbus_core::protocol::RawEnvelope;

use super::{origin_matches, ChannelAdapter, Inbox};

const INBOX_CAPACITY: usize = 256;

/// One end of a loopback pair.
pub struct MemoryChannel {
    origin: String,
    peer_origin: String,
    inbox: broadcast::Sender<RawEnvelope>,
    peer_inbox: broadcast::Sender<RawEnvelope>,
}

impl MemoryChannel {
    /// Build a connected (host end, editor end) pair.
    pub fn pair(host_origin: &str, editor_origin: &str) -> (MemoryChannel, MemoryChannel) {
        let (host_tx, _) = broadcast::channel(INBOX_CAPACITY);
        let (editor_tx, _) = broadcast::channel(INBOX_CAPACITY);

        let host = MemoryChannel {
            origin: host_origin.to_string(),
            peer_origin: editor_origin.to_string(),
            inbox: host_tx.clone(),
            peer_inbox: editor_tx.clone(),
        };
        let editor = MemoryChannel {
            origin: editor_origin.to_string(),
            peer_origin: host_origin.to_string(),
            inbox: editor_tx,
            peer_inbox: host_tx,
        };
        (host, editor)
    }

    /// Deliver an envelope into this end's inbox as if it came off the wire.
    pub fn inject(&self, env: RawEnvelope) {
        if self.inbox.send(env).is_err() {
            tracing::debug!(origin = %self.origin, "inject with no subscriber; dropped");
        }
    }

    /// Watch what this end sends (a subscription on the peer's inbox).
    pub fn outbound(&self) -> Inbox {
        self.peer_inbox.subscribe()
    }
}

impl ChannelAdapter for MemoryChannel {
    fn send(&self, env: RawEnvelope, target_origin: Option<&str>) -> Result<()> {
        if !origin_matches(target_origin, Some(&self.peer_origin)) {
            tracing::debug!(
                target_origin = ?target_origin,
                peer = %self.peer_origin,
                msg_type = %env.msg_type,
                "target origin does not match peer; dropped"
            );
            return Ok(());
        }

        // Round-trip through JSON so both ends only ever share wire data.
        let wire = env.to_json()?;
        let env = RawEnvelope::from_json(&wire)?;

        if self.peer_inbox.send(env).is_err() {
            tracing::debug!(peer = %self.peer_origin, "peer not listening; dropped");
        }
        Ok(())
    }

    fn subscribe(&self) -> Inbox {
        self.inbox.subscribe()
    }
}

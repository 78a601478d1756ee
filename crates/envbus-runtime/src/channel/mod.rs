//! Channel adapters.
//!
//! A `ChannelAdapter` is the only thing a handler knows about the other side:
//! a fire-and-forget `send` and an inbound event source. Origin filtering on
//! receipt, and restricting delivery to the target origin on send, are the
//! adapter's job; handlers only supply the origin they trust.

pub mod memory;

use tokio::sync::broadcast;

use envbus_core::error::Result;
use envbus_core::protocol::RawEnvelope;

pub use memory::MemoryChannel;

/// Inbound event source. Only envelopes that arrive after `subscribe` are seen.
pub type Inbox = broadcast::Receiver<RawEnvelope>;

/// `"*"` addresses any counterpart.
pub const ANY_ORIGIN: &str = "*";

pub trait ChannelAdapter: Send + Sync + 'static {
    /// Hand an envelope to the channel. No delivery acknowledgment: an
    /// envelope the other side is not ready for, or a closing session, simply
    /// loses it. Errors are reserved for envelopes that cannot be encoded.
    fn send(&self, env: RawEnvelope, target_origin: Option<&str>) -> Result<()>;

    /// Attach a new subscriber to the inbound event source.
    fn subscribe(&self) -> Inbox;
}

/// Whether an envelope addressed to `target` may be delivered to `peer`.
pub fn origin_matches(target: Option<&str>, peer: Option<&str>) -> bool {
    match (target, peer) {
        (None, _) | (Some(ANY_ORIGIN), _) => true,
        (Some(_), None) => false,
        (Some(t), Some(p)) => t == p,
    }
}

//! Transport layer (WebSocket).
//!
//! Serves the editor over `/v1/bus` and exposes the connected session to the
//! host handler as a `ChannelAdapter`.

pub mod codec;
pub mod host_channel;
pub mod ws;

pub use host_channel::WsHostChannel;

//! envbus runtime library entry.
//!
//! Drives the envelope bus from both ends: the host-side `OuterHandler`
//! (handshake polling, answering editor requests) and the editor-side
//! `InnerHandler` (origin capture, answering host requests). Handlers talk
//! through a `ChannelAdapter`; this crate ships an in-process loopback and an
//! axum WebSocket adapter for hosts that serve the editor over HTTP.

pub mod app_state;
pub mod channel;
pub mod config;
pub mod handler;
pub mod host;
pub mod obs;
pub mod router;
pub mod timer;
pub mod transport;

mod listener;

pub use channel::{ChannelAdapter, Inbox, MemoryChannel};
pub use host::{CatalogResolver, DocumentHost, DocumentStore, FsDocumentStore, LanguageResolver};
pub use transport::WsHostChannel;
pub use handler::{
    ContentNames, HandshakeState, InnerDelegate, InnerHandler, OuterDelegate, OuterHandler,
    OuterOptions, Role,
};

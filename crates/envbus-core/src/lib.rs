//! envbus core: transport-agnostic protocol primitives and the error surface.
//!
//! This crate defines the wire contract shared by the host-side (outer) and
//! editor-side (inner) handlers: the closed message taxonomy, the `{type, data}`
//! envelope codec, and the language descriptor the host hands to the editor.
//! It carries no runtime or transport dependencies so it can be reused by any
//! channel adapter.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Envelopes come from
//! another execution context and may be malformed; every fallible path surfaces
//! as `BusError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{BusError, ErrorCode, Result};

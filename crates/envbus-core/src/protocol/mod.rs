//! Protocol modules.
//!
//! - `message_type`: the closed taxonomy of envelope types.
//! - `envelope`: the `{type, data}` wire unit, raw (lazy) and typed.
//! - `language`: the descriptor the host resolves for the editor.
//!
//! Envelopes carry no correlation id. Each request type has at most one
//! outstanding request per sender; pipelining two requests of the same type
//! would make their responses indistinguishable. Adding an id field is the
//! way forward if that is ever needed.

pub mod envelope;
pub mod language;
pub mod message_type;

pub use envelope::{Decoded, Message, RawEnvelope};
pub use language::{LanguageData, Resource, ResourceKind};
pub use message_type::MessageType;

//! Frame codec for the editor socket.
//!
//! - Text frames => `RawEnvelope` (lazy `RawValue` for data)
//! - Frames over the size limit are surfaced before any JSON parsing
//! - Ping/Pong/Close are surfaced for lifecycle management

use axum::extract::ws::Message;

use envbus_core::error::{BusError, Result};
use envbus_core::protocol::RawEnvelope;

#[derive(Debug)]
pub enum Inbound {
    Envelope { env: RawEnvelope, bytes_len: usize },
    Oversized { bytes_len: usize },
    Ping(Vec<u8>),
    Pong,
    Close,
}

pub fn frame_len(msg: &Message) -> usize {
    match msg {
        Message::Text(s) => s.len(),
        Message::Binary(b) => b.len(),
        Message::Ping(v) => v.len(),
        Message::Pong(v) => v.len(),
        Message::Close(_) => 0,
    }
}

pub fn decode(msg: Message, max_frame_bytes: usize) -> Result<Inbound> {
    let bytes_len = frame_len(&msg);
    match msg {
        Message::Text(_) | Message::Binary(_) if bytes_len > max_frame_bytes => {
            Ok(Inbound::Oversized { bytes_len })
        }
        Message::Text(s) => {
            let env = RawEnvelope::from_json(&s)?;
            Ok(Inbound::Envelope { env, bytes_len })
        }
        Message::Binary(_) => Err(BusError::BadRequest(
            "binary frames are not part of the envelope protocol".into(),
        )),
        Message::Ping(v) => Ok(Inbound::Ping(v)),
        Message::Pong(_) => Ok(Inbound::Pong),
        Message::Close(_) => Ok(Inbound::Close),
    }
}

pub fn encode(env: &RawEnvelope) -> Result<Message> {
    Ok(Message::Text(env.to_json()?))
}

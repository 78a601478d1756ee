//! `{type, data}` envelope.
//!
//! `RawEnvelope` is what crosses the channel: the type is kept as a string and
//! `data` as raw JSON, so an envelope from a newer counterpart still decodes and
//! can be reported as unknown instead of failing. `Message` is the typed view,
//! one variant per message type with its payload fixed.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::{to_raw_value, RawValue};

use crate::error::{BusError, Result};
use crate::protocol::language::LanguageData;
use crate::protocol::message_type::MessageType;

/// Wire envelope with lazily parsed payload.
///
/// Unknown fields are tolerated on purpose: newer counterparts may add some.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEnvelope {
    /// Message type (field name is `type` in JSON).
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Optional payload, stored as raw JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Box<RawValue>>,
}

impl RawEnvelope {
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s)
            .map_err(|e| BusError::BadRequest(format!("invalid envelope json: {e}")))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| BusError::Internal(format!("envelope encode failed: {e}")))
    }

    /// Typed view of this envelope.
    pub fn decode(&self) -> Result<Decoded> {
        Message::decode(self)
    }
}

/// Result of decoding a raw envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Known(Message),
    /// Type not in this build's taxonomy. Carries the wire name.
    Unknown(String),
}

/// Typed envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Host announces itself; payload is the host origin.
    RequestInit { origin: String },
    ReturnInit,
    RequestLanguage,
    /// `None` when the host has no editor for the document's extension.
    ReturnLanguage(Option<LanguageData>),
    RequestSetContent,
    ReturnSetContent(String),
    RequestGetContent,
    ReturnGetContent(String),
    /// Legacy name for `RequestSetContent` / `RequestGetContent`.
    RequestContent,
    /// Legacy name for `ReturnSetContent` / `ReturnGetContent`.
    ReturnContent(String),
}

impl Message {
    pub fn msg_type(&self) -> MessageType {
        match self {
            Message::RequestInit { .. } => MessageType::RequestInit,
            Message::ReturnInit => MessageType::ReturnInit,
            Message::RequestLanguage => MessageType::RequestLanguage,
            Message::ReturnLanguage(_) => MessageType::ReturnLanguage,
            Message::RequestSetContent => MessageType::RequestSetContent,
            Message::ReturnSetContent(_) => MessageType::ReturnSetContent,
            Message::RequestGetContent => MessageType::RequestGetContent,
            Message::ReturnGetContent(_) => MessageType::ReturnGetContent,
            Message::RequestContent => MessageType::RequestContent,
            Message::ReturnContent(_) => MessageType::ReturnContent,
        }
    }

    pub fn decode(raw: &RawEnvelope) -> Result<Decoded> {
        let Ok(ty) = raw.msg_type.parse::<MessageType>() else {
            return Ok(Decoded::Unknown(raw.msg_type.clone()));
        };

        let msg = match ty {
            MessageType::RequestInit => Message::RequestInit {
                origin: required(raw, ty)?,
            },
            MessageType::ReturnInit => Message::ReturnInit,
            MessageType::RequestLanguage => Message::RequestLanguage,
            MessageType::ReturnLanguage => Message::ReturnLanguage(optional(raw, ty)?),
            MessageType::RequestSetContent => Message::RequestSetContent,
            MessageType::ReturnSetContent => Message::ReturnSetContent(required(raw, ty)?),
            MessageType::RequestGetContent => Message::RequestGetContent,
            MessageType::ReturnGetContent => Message::ReturnGetContent(required(raw, ty)?),
            MessageType::RequestContent => Message::RequestContent,
            MessageType::ReturnContent => Message::ReturnContent(required(raw, ty)?),
        };
        Ok(Decoded::Known(msg))
    }

    pub fn to_raw(&self) -> Result<RawEnvelope> {
        let data = match self {
            Message::RequestInit { origin } => Some(raw_value(origin)?),
            Message::ReturnLanguage(Some(lang)) => Some(raw_value(lang)?),
            Message::ReturnSetContent(c) | Message::ReturnGetContent(c) | Message::ReturnContent(c) => {
                Some(raw_value(c)?)
            }
            _ => None,
        };
        Ok(RawEnvelope {
            msg_type: self.msg_type().as_str().to_string(),
            data,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        self.to_raw()?.to_json()
    }
}

fn required<T: DeserializeOwned>(raw: &RawEnvelope, ty: MessageType) -> Result<T> {
    optional(raw, ty)?.ok_or_else(|| BusError::BadRequest(format!("{ty} requires data")))
}

fn optional<T: DeserializeOwned>(raw: &RawEnvelope, ty: MessageType) -> Result<Option<T>> {
    let Some(data) = raw.data.as_ref() else {
        return Ok(None);
    };
    serde_json::from_str::<Option<T>>(data.get())
        .map_err(|e| BusError::BadRequest(format!("{ty} invalid data: {e}")))
}

fn raw_value<T: Serialize>(v: &T) -> Result<Box<RawValue>> {
    to_raw_value(v).map_err(|e| BusError::Internal(format!("payload encode failed: {e}")))
}

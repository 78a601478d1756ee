//! Closed message taxonomy.
//!
//! Every request type has exactly one return type. `RequestContent` and
//! `ReturnContent` are legacy names for the set/get content pair; they are
//! only understood by the host side.

use std::fmt;
use std::str::FromStr;

use crate::error::BusError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    RequestInit,
    ReturnInit,
    RequestLanguage,
    ReturnLanguage,
    RequestSetContent,
    ReturnSetContent,
    RequestGetContent,
    ReturnGetContent,
    RequestContent,
    ReturnContent,
}

impl MessageType {
    pub const ALL: [MessageType; 10] = [
        MessageType::RequestInit,
        MessageType::ReturnInit,
        MessageType::RequestLanguage,
        MessageType::ReturnLanguage,
        MessageType::RequestSetContent,
        MessageType::ReturnSetContent,
        MessageType::RequestGetContent,
        MessageType::ReturnGetContent,
        MessageType::RequestContent,
        MessageType::ReturnContent,
    ];

    /// Wire name (value of the `type` field).
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::RequestInit => "REQUEST_INIT",
            MessageType::ReturnInit => "RETURN_INIT",
            MessageType::RequestLanguage => "REQUEST_LANGUAGE",
            MessageType::ReturnLanguage => "RETURN_LANGUAGE",
            MessageType::RequestSetContent => "REQUEST_SET_CONTENT",
            MessageType::ReturnSetContent => "RETURN_SET_CONTENT",
            MessageType::RequestGetContent => "REQUEST_GET_CONTENT",
            MessageType::ReturnGetContent => "RETURN_GET_CONTENT",
            MessageType::RequestContent => "REQUEST_CONTENT",
            MessageType::ReturnContent => "RETURN_CONTENT",
        }
    }

    pub fn is_request(self) -> bool {
        matches!(
            self,
            MessageType::RequestInit
                | MessageType::RequestLanguage
                | MessageType::RequestSetContent
                | MessageType::RequestGetContent
                | MessageType::RequestContent
        )
    }

    /// The matching half of the request/return pair.
    pub fn counterpart(self) -> MessageType {
        match self {
            MessageType::RequestInit => MessageType::ReturnInit,
            MessageType::ReturnInit => MessageType::RequestInit,
            MessageType::RequestLanguage => MessageType::ReturnLanguage,
            MessageType::ReturnLanguage => MessageType::RequestLanguage,
            MessageType::RequestSetContent => MessageType::ReturnSetContent,
            MessageType::ReturnSetContent => MessageType::RequestSetContent,
            MessageType::RequestGetContent => MessageType::ReturnGetContent,
            MessageType::ReturnGetContent => MessageType::RequestGetContent,
            MessageType::RequestContent => MessageType::ReturnContent,
            MessageType::ReturnContent => MessageType::RequestContent,
        }
    }

    pub fn is_legacy(self) -> bool {
        matches!(self, MessageType::RequestContent | MessageType::ReturnContent)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = BusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| BusError::BadRequest(format!("unknown message type: {s}")))
    }
}

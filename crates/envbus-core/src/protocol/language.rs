//! Language descriptor resolved by the host and loaded by the editor.
//!
//! The protocol transports this value verbatim; only the editor-side resource
//! loader interprets it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageData {
    pub editor_id: String,
    pub gwt_module_name: String,
    pub errai_domain: String,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

/// A group of loadable files of one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Css,
    Js,
}

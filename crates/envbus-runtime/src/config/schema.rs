use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;

use envbus_core::error::{BusError, Result};
use envbus_core::protocol::{LanguageData, Resource, ResourceKind};

use crate::handler::ContentNames;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BusConfig {
    pub version: u32,

    #[serde(default)]
    pub polling: PollingSection,

    #[serde(default)]
    pub host: HostSection,

    #[serde(default)]
    pub languages: Vec<LanguageEntry>,
}

impl BusConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(BusError::UnsupportedVersion);
        }

        self.polling.validate()?;
        self.host.validate()?;

        let mut seen = HashSet::new();
        for lang in &self.languages {
            lang.validate()?;
            if !seen.insert(lang.normalized_extension()) {
                return Err(BusError::BadRequest(format!(
                    "languages: duplicate extension {}",
                    lang.extension
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollingSection {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for PollingSection {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl PollingSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=1000).contains(&self.interval_ms) {
            return Err(BusError::BadRequest(
                "polling.interval_ms must be between 1 and 1000".into(),
            ));
        }
        if !(100..=600000).contains(&self.timeout_ms) {
            return Err(BusError::BadRequest(
                "polling.timeout_ms must be between 100 and 600000".into(),
            ));
        }
        if self.timeout_ms <= self.interval_ms {
            return Err(BusError::BadRequest(
                "polling.timeout_ms must be greater than interval_ms".into(),
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_interval_ms() -> u64 {
    10
}
fn default_timeout_ms() -> u64 {
    10000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Origin announced to the editor in `REQUEST_INIT`.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// When set, host sends are addressed to this origin and editor
    /// connections from any other origin are refused.
    #[serde(default)]
    pub editor_origin: Option<String>,

    #[serde(default)]
    pub content_names: ContentNames,

    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl Default for HostSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            origin: default_origin(),
            editor_origin: None,
            content_names: ContentNames::default(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

impl HostSection {
    pub fn validate(&self) -> Result<()> {
        if self.listen.trim().is_empty() {
            return Err(BusError::BadRequest("host.listen must not be empty".into()));
        }
        if self.origin.trim().is_empty() {
            return Err(BusError::BadRequest("host.origin must not be empty".into()));
        }
        if matches!(self.editor_origin.as_deref(), Some(o) if o.trim().is_empty()) {
            return Err(BusError::BadRequest(
                "host.editor_origin must not be empty when set".into(),
            ));
        }
        if self.max_frame_bytes < 1024 {
            return Err(BusError::BadRequest(
                "host.max_frame_bytes must be at least 1024".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "127.0.0.1:9870".into()
}
fn default_origin() -> String {
    "envbus-host".into()
}
fn default_max_frame_bytes() -> usize {
    8 * 1024 * 1024
}

/// One entry of the bundled language catalog.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LanguageEntry {
    pub extension: String,
    pub editor_id: String,
    #[serde(default)]
    pub gwt_module_name: String,
    #[serde(default)]
    pub errai_domain: String,
    #[serde(default)]
    pub resources: Vec<ResourceEntry>,
}

impl LanguageEntry {
    pub fn validate(&self) -> Result<()> {
        if self.normalized_extension().is_empty() {
            return Err(BusError::BadRequest("languages: extension must not be empty".into()));
        }
        if self.editor_id.trim().is_empty() {
            return Err(BusError::BadRequest(format!(
                "languages[{}]: editor_id must not be empty",
                self.extension
            )));
        }
        Ok(())
    }

    /// Extension without a leading dot, lowercased.
    pub fn normalized_extension(&self) -> String {
        self.extension.trim().trim_start_matches('.').to_ascii_lowercase()
    }

    pub fn to_language_data(&self) -> LanguageData {
        LanguageData {
            editor_id: self.editor_id.clone(),
            gwt_module_name: self.gwt_module_name.clone(),
            errai_domain: self.errai_domain.clone(),
            resources: self
                .resources
                .iter()
                .map(|r| Resource {
                    kind: r.kind,
                    paths: r.paths.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceEntry {
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub paths: Vec<String>,
}

use std::collections::HashMap;

use envbus_core::protocol::LanguageData;

use crate::config::LanguageEntry;

use super::LanguageResolver;

/// Extension lookup over the `languages` config section. Matching ignores
/// case and a leading dot.
#[derive(Debug, Default, Clone)]
pub struct CatalogResolver {
    by_extension: HashMap<String, LanguageData>,
}

impl CatalogResolver {
    pub fn from_config(entries: &[LanguageEntry]) -> Self {
        let by_extension = entries
            .iter()
            .map(|e| (e.normalized_extension(), e.to_language_data()))
            .collect();
        Self { by_extension }
    }

    pub fn len(&self) -> usize {
        self.by_extension.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_extension.is_empty()
    }
}

impl LanguageResolver for CatalogResolver {
    fn resolve(&self, extension: &str) -> Option<LanguageData> {
        self.by_extension.get(&normalize(extension)).cloned()
    }
}

fn normalize(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_ascii_lowercase()
}

use std::path::Path;

use async_trait::async_trait;

use envbus_core::error::{BusError, Result};

use super::DocumentStore;

/// Documents on the local filesystem (UTF-8).
#[derive(Debug, Default, Clone, Copy)]
pub struct FsDocumentStore;

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn read(&self, path: &Path) -> Result<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| BusError::Delegate(format!("read {} failed: {e}", path.display())))
    }

    async fn write(&self, path: &Path, content: &str) -> Result<()> {
        tokio::fs::write(path, content)
            .await
            .map_err(|e| BusError::Delegate(format!("write {} failed: {e}", path.display())))
    }
}

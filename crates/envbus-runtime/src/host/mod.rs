//! Host-side document delegate.
//!
//! `DocumentHost` binds one document on disk to one editor session: it announces
//! the host origin while polling, resolves language data from the file
//! extension, serves the file as the editor's initial content and writes back
//! whatever the editor returns on save.

pub mod catalog;
pub mod store;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use envbus_core::error::Result;
use envbus_core::protocol::LanguageData;

use crate::handler::{OuterDelegate, OuterHandler};

pub use catalog::CatalogResolver;
pub use store::FsDocumentStore;

/// Maps a file extension (no leading dot) to the editor that handles it.
pub trait LanguageResolver: Send + Sync + 'static {
    fn resolve(&self, extension: &str) -> Option<LanguageData>;
}

/// Where documents are read from and saved to.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    async fn read(&self, path: &Path) -> Result<String>;
    async fn write(&self, path: &Path, content: &str) -> Result<()>;
}

pub struct DocumentHost {
    path: PathBuf,
    origin: String,
    resolver: Arc<dyn LanguageResolver>,
    store: Arc<dyn DocumentStore>,
}

impl DocumentHost {
    pub fn new(
        path: impl Into<PathBuf>,
        origin: impl Into<String>,
        resolver: Arc<dyn LanguageResolver>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            path: path.into(),
            origin: origin.into(),
            resolver,
            store,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Extension the resolver is asked about: text after the last dot of the
    /// file name, or empty.
    pub fn extension(&self) -> &str {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
    }

    /// Ask the editor for its current content; the reply is written back by
    /// `receive_content_response`. Returns false (and sends nothing) when
    /// there is no path to save to.
    pub fn request_save(&self, bus: &OuterHandler) -> Result<bool> {
        if self.path.as_os_str().is_empty() {
            tracing::info!("save skipped; document path is empty");
            return Ok(false);
        }
        bus.request_content_response()?;
        Ok(true)
    }
}

#[async_trait]
impl OuterDelegate for DocumentHost {
    async fn poll_init(&self, bus: &OuterHandler) -> Result<()> {
        bus.request_init_response(&self.origin)
    }

    async fn receive_language_request(&self, bus: &OuterHandler) -> Result<()> {
        let ext = self.extension();
        let language = self.resolver.resolve(ext);
        if language.is_none() {
            tracing::warn!(extension = ext, path = %self.path.display(), "no editor registered for extension");
        }
        bus.respond_language_request(language)
    }

    async fn receive_content_request(&self, bus: &OuterHandler) -> Result<()> {
        let content = self.store.read(&self.path).await?;
        bus.respond_content_request(content)
    }

    async fn receive_content_response(&self, _bus: &OuterHandler, content: String) -> Result<()> {
        self.store.write(&self.path, &content).await?;
        tracing::info!(path = %self.path.display(), bytes = content.len(), "saved");
        Ok(())
    }
}

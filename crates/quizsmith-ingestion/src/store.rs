//! Document store: resolves a document identifier to its extracted pages.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use quizsmith_common::Page;
use tracing::{debug, instrument};

use crate::error::IngestionError;
use crate::pdf_parser::extract_pages;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn exists(&self, document_id: &str) -> bool;

    /// Ordered pages of the document, numbered from 1.
    async fn open(&self, document_id: &str) -> Result<Vec<Page>, IngestionError>;
}

/// PDFs stored as files directly under a root directory.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path for `document_id`, or `None` when the id could escape the root.
    fn path_for(&self, document_id: &str) -> Option<PathBuf> {
        let id = document_id.trim();
        let escapes = id.is_empty()
            || id.starts_with('.')
            || id.contains('/')
            || id.contains('\\')
            || id.contains("..");
        if escapes {
            return None;
        }
        Some(self.root.join(id))
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn exists(&self, document_id: &str) -> bool {
        match self.path_for(document_id) {
            Some(path) => tokio::fs::metadata(&path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false),
            None => false,
        }
    }

    #[instrument(skip(self), fields(root = %self.root.display()))]
    async fn open(&self, document_id: &str) -> Result<Vec<Page>, IngestionError> {
        if !self.exists(document_id).await {
            return Err(IngestionError::DocumentNotFound(document_id.to_string()));
        }
        let path = self
            .path_for(document_id)
            .ok_or_else(|| IngestionError::DocumentNotFound(document_id.to_string()))?;

        // lopdf parsing is CPU-bound; keep it off the async workers.
        let pages = tokio::task::spawn_blocking(move || extract_pages(&path))
            .await
            .map_err(|e| IngestionError::Task(e.to_string()))??;

        debug!(pages = pages.len(), "Document opened");
        Ok(pages)
    }
}

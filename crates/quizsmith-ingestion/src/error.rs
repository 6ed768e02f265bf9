use std::path::PathBuf;

use quizsmith_common::QuizError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("failed to read PDF {path}: {source}")]
    Pdf {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    #[error("failed to parse PDF bytes: {0}")]
    PdfBytes(#[from] lopdf::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("extraction task failed: {0}")]
    Task(String),
}

impl From<IngestionError> for QuizError {
    fn from(e: IngestionError) -> Self {
        match e {
            IngestionError::DocumentNotFound(document_id) => QuizError::NotFound { document_id },
            other => QuizError::Internal(other.to_string()),
        }
    }
}

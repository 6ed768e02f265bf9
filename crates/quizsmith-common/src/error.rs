use std::fmt;
use thiserror::Error;

/// Which half of response parsing rejected the model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MalformedKind {
    /// The payload was not valid JSON.
    Syntax,
    /// Valid JSON, but the quiz shape was wrong.
    Structure,
}

impl fmt::Display for MalformedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedKind::Syntax    => write!(f, "syntax"),
            MalformedKind::Structure => write!(f, "structure"),
        }
    }
}

/// Plain tag for a [`QuizError`] variant, used by callers that only need to branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidChapter,
    InvalidRequest,
    ServiceUnavailable,
    Upstream,
    MalformedResponse,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound           => "not_found",
            ErrorKind::InvalidChapter     => "invalid_chapter",
            ErrorKind::InvalidRequest     => "invalid_request",
            ErrorKind::ServiceUnavailable => "service_unavailable",
            ErrorKind::Upstream           => "upstream_error",
            ErrorKind::MalformedResponse  => "malformed_response",
            ErrorKind::Internal           => "internal_error",
        }
    }
}

#[derive(Debug, Error)]
pub enum QuizError {
    #[error("document not found: {document_id}")]
    NotFound { document_id: String },

    #[error("invalid chapter '{requested}', available: [{}]", .available.join(", "))]
    InvalidChapter { requested: String, available: Vec<String> },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("embedding backend unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("generation backend error: {0}")]
    Upstream(String),

    /// `raw` is the complete model output, kept for diagnostics.
    #[error("generation output could not be parsed ({kind}): {detail}")]
    MalformedResponse {
        kind: MalformedKind,
        detail: String,
        raw: String,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl QuizError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QuizError::NotFound { .. }          => ErrorKind::NotFound,
            QuizError::InvalidChapter { .. }    => ErrorKind::InvalidChapter,
            QuizError::InvalidRequest(_)        => ErrorKind::InvalidRequest,
            QuizError::ServiceUnavailable(_)    => ErrorKind::ServiceUnavailable,
            QuizError::Upstream(_)              => ErrorKind::Upstream,
            QuizError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            QuizError::Internal(_)              => ErrorKind::Internal,
        }
    }

    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ServiceUnavailable | ErrorKind::Upstream | ErrorKind::MalformedResponse
        )
    }
}

pub type Result<T> = std::result::Result<T, QuizError>;

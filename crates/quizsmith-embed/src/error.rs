use quizsmith_common::QuizError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmbedError>;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("API error [{status}]: {message}")]
    Api { status: u16, message: String },

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding backend misconfigured: {0}")]
    Config(String),

    #[error("embedding model unavailable: {0}")]
    Model(String),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),
}

impl From<candle_core::Error> for EmbedError {
    fn from(e: candle_core::Error) -> Self {
        EmbedError::Model(e.to_string())
    }
}

impl From<tokenizers::Error> for EmbedError {
    fn from(e: tokenizers::Error) -> Self {
        EmbedError::Tokenizer(e.to_string())
    }
}

/// Transport errors lose their request URL, which may carry a key.
impl From<reqwest::Error> for EmbedError {
    fn from(e: reqwest::Error) -> Self {
        EmbedError::Http(e.without_url())
    }
}

/// Every embedding failure is a dependency outage from the caller's point of view.
impl From<EmbedError> for QuizError {
    fn from(e: EmbedError) -> Self {
        QuizError::ServiceUnavailable(e.to_string())
    }
}

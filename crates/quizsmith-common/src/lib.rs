//! quizsmith-common: Shared types and the error taxonomy used across all quizsmith crates.

pub mod error;
pub mod models;

// Re-export commonly used types
pub use error::{ErrorKind, MalformedKind, QuizError, Result};
pub use models::{
    ChapterMap, ChapterRange, Chunk, Difficulty, Page, PageRange, QuizQuestion, QuizRequest,
    QuizResponse,
};

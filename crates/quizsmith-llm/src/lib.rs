//! quizsmith-llm: Quiz generation through a pluggable text backend.
//! - Backends: Gemini, OpenAI-compatible, Ollama
//! - Prompt construction for chapter-scoped quizzes
//! - Parsing and validation of the model's JSON reply

pub mod backend;
pub mod generator;
pub mod parser;

pub use backend::{backend_from_config, LlmBackend, LlmError, LlmRequest, LlmResponse, Message};
pub use generator::{build_prompt, GenerationSettings, QuizGenerator};
pub use parser::ResponseParser;

//! quizsmith-service: Orchestrates one quiz request end to end.
//!
//! RECEIVED → DOCUMENT_RESOLVED → CHAPTER_VALIDATED → INDEX_BUILT →
//! CONTEXT_RETRIEVED → GENERATED → PARSED → DONE, or FAILED from any stage.

pub mod service;
pub mod stage;

pub use service::{QuizService, ServiceSettings, SetupError};
pub use stage::PipelineStage;

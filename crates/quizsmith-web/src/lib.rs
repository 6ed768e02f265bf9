//! quizsmith-web: HTTP API over the quiz pipeline.
//! - POST /quizzes
//! - GET  /documents/{id}/chapters
//! - GET  /health

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

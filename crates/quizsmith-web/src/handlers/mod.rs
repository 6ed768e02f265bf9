//! HTTP handlers for all routes.

pub mod documents;
pub mod health;
pub mod quizzes;

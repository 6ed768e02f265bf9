//! Shared application state for the web server.

use std::sync::Arc;

use quizsmith_service::QuizService;

/// Shared state injected into every Axum handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<QuizService>,
}

impl AppState {
    pub fn new(service: QuizService) -> Self {
        Self { service: Arc::new(service) }
    }
}

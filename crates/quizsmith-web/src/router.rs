//! Axum router: maps all URL paths to handlers.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::CorsLayer,
    trace::TraceLayer,
};

use crate::handlers::{
    documents::list_chapters,
    health::health,
    quizzes::create_quiz,
};
use crate::state::AppState;

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health",                  get(health))
        .route("/quizzes",                 post(create_quiz))
        .route("/documents/{id}/chapters", get(list_chapters))

        // Middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! Quiz generation endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use quizsmith_common::{QuizRequest, QuizResponse};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

/// POST /quizzes - Generate a chapter-scoped quiz
pub async fn create_quiz(
    State(state): State<AppState>,
    payload: Result<Json<QuizRequest>, JsonRejection>,
) -> Result<Json<QuizResponse>, ApiError> {
    let Json(request) = payload?;
    info!(document = %request.document_id, chapter = %request.chapter, "Quiz requested");
    let quiz = state.service.generate_quiz(request).await?;
    Ok(Json(quiz))
}

//! Document inspection endpoints.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ChapterListing {
    pub document_id: String,
    pub chapters: Vec<String>,
}

/// GET /documents/{id}/chapters - Detected chapter labels in document order
pub async fn list_chapters(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Json<ChapterListing>, ApiError> {
    let chapters = state.service.chapters(&document_id).await?;
    Ok(Json(ChapterListing { document_id, chapters }))
}

//! Mapping of pipeline errors onto HTTP responses.
//!
//! | kind                | status |
//! |---------------------|--------|
//! | not_found           | 404    |
//! | invalid_chapter     | 400    |
//! | invalid_request     | 422    |
//! | service_unavailable | 503    |
//! | upstream_error      | 502    |
//! | malformed_response  | 424    |
//! | internal_error      | 500    |

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use quizsmith_common::{ErrorKind, QuizError};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub QuizError);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(QuizError::InvalidRequest(rejection.body_text()))
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound           => StatusCode::NOT_FOUND,
        ErrorKind::InvalidChapter     => StatusCode::BAD_REQUEST,
        ErrorKind::InvalidRequest     => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Upstream           => StatusCode::BAD_GATEWAY,
        ErrorKind::MalformedResponse  => StatusCode::FAILED_DEPENDENCY,
        ErrorKind::Internal           => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        let body = match &self.0 {
            QuizError::InvalidChapter { available, .. } => json!({
                "error": self.0.to_string(),
                "code": kind.as_str(),
                "available": available,
            }),
            QuizError::Internal(_) => {
                tracing::error!(error = %self.0, "Internal error");
                json!({ "error": "internal server error", "code": kind.as_str() })
            }
            _ => json!({ "error": self.0.to_string(), "code": kind.as_str() }),
        };
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_a_distinct_status() {
        let kinds = [
            ErrorKind::NotFound,
            ErrorKind::InvalidChapter,
            ErrorKind::InvalidRequest,
            ErrorKind::ServiceUnavailable,
            ErrorKind::Upstream,
            ErrorKind::MalformedResponse,
            ErrorKind::Internal,
        ];
        let mut statuses: Vec<u16> = kinds.iter().map(|k| status_for(*k).as_u16()).collect();
        statuses.sort_unstable();
        statuses.dedup();
        assert_eq!(statuses.len(), kinds.len());
    }

    #[test]
    fn test_internal_error_hides_detail() {
        let resp = ApiError(QuizError::Internal("lopdf: xref table corrupt".to_string())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

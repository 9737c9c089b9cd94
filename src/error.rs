use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Collection already running")]
    AlreadyRunning,

    #[error("Project '{0}' already exists")]
    DuplicateProjectName(String),

    #[error("Cannot delete the default project")]
    DefaultProjectProtected,

    #[error("Project {0} is the target of an active collection")]
    ProjectBusy(i64),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::AlreadyRunning
            | AppError::DuplicateProjectName(_)
            | AppError::ProjectBusy(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::DefaultProjectProtected => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Fetch(msg) => {
                tracing::error!("Fetch error: {msg}");
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = axum::Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

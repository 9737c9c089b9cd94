use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::collectors::runner::{self, CollectParams};
use crate::error::AppError;
use crate::state::AppState;
use crate::status::StatusSnapshot;

#[derive(Debug, Deserialize)]
pub struct CollectRequest {
    pub query: String,
    pub area: Option<u32>,
    pub experience: Option<String>,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default)]
    pub create_new_project: bool,
    pub project_name: Option<String>,
}

fn default_max_pages() -> u32 {
    10
}

fn default_per_page() -> u32 {
    20
}

/// POST /api/collect
///
/// Accept a collection run and return immediately; progress is polled via
/// GET /api/status. Rejects with 409 while a run is active.
pub async fn start(
    State(state): State<AppState>,
    Json(input): Json<CollectRequest>,
) -> Result<Json<Value>, AppError> {
    let params = CollectParams {
        query: input.query,
        area: input.area,
        experience: input.experience,
        max_pages: input.max_pages,
        per_page: input.per_page,
        create_new_project: input.create_new_project,
        project_name: input.project_name,
    };
    let project_id = runner::start(&state, params).await?;
    Ok(Json(json!({ "accepted": true, "project_id": project_id })))
}

/// GET /api/status
pub async fn status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    Json(state.tracker.snapshot())
}

use axum::Json;
use axum::extract::{Path, State};
use serde_json::{Value, json};

use crate::error::AppError;
use crate::models::project::{CreateProject, Project, UpdateProject};
use crate::state::AppState;

pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let projects = Project::list(&state.pool).await?;
    Ok(Json(json!({
        "projects": projects,
        "current_project_id": state.current_project(),
    })))
}

pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateProject>,
) -> Result<Json<Project>, AppError> {
    let project = Project::create(&state.pool, &input.name, &input.query).await?;
    Ok(Json(project))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateProject>,
) -> Result<Json<Project>, AppError> {
    let project = Project::update(&state.pool, id, input).await?;
    Ok(Json(project))
}

/// POST /api/projects/{id}/switch — pointer change, not a data copy.
pub async fn switch(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    // Validate the target exists before moving the pointer
    Project::get(&state.pool, id).await?;
    state.switch_project(id);
    Ok(Json(json!({ "current_project_id": id })))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    // Never pull a project out from under an active collection. The guard
    // also fences new runs off the project until the cascade is done.
    let _guard = state.tracker.begin_project_delete(id)?;

    Project::delete(&state.pool, id).await?;
    state.reset_current_if(id);
    Ok(Json(json!({ "deleted": true })))
}

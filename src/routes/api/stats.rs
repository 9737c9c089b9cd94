use axum::Json;
use axum::extract::{Query, State};
use serde::Serialize;

use crate::analysis::filter::FilterParams;
use crate::analysis::report::{Report, aggregate};
use crate::error::AppError;
use crate::models::vacancy::Vacancy;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_vacancies: usize,
    pub original_count: usize,
    pub filtered: bool,
    pub report: Option<Report>,
}

/// GET /api/stats
///
/// Aggregated report over the current project's vacancies, narrowed by the
/// request's filter criteria. `report` is null when nothing passes.
pub async fn get(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> Result<Json<StatsResponse>, AppError> {
    let filter = params.into_criteria()?.compile()?;
    let filtered = !filter.is_identity();

    let records = Vacancy::list_by_project(&state.pool, state.current_project()).await?;
    let outcome = filter.apply(records);

    let report = if outcome.records.is_empty() {
        None
    } else {
        Some(aggregate(&outcome.records, &state.settings))
    };

    Ok(Json(StatsResponse {
        total_vacancies: outcome.records.len(),
        original_count: outcome.original_count,
        filtered,
        report,
    }))
}

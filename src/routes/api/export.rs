use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::analysis::filter::FilterParams;
use crate::error::AppError;
use crate::export;
use crate::models::vacancy::Vacancy;
use crate::state::AppState;

/// GET /api/export/{format}
///
/// Download the current project's filtered-or-full vacancy set as a JSON or
/// CSV attachment.
pub async fn download(
    State(state): State<AppState>,
    Path(format): Path<String>,
    Query(params): Query<FilterParams>,
) -> Result<Response, AppError> {
    let filter = params.into_criteria()?.compile()?;
    let records = Vacancy::list_by_project(&state.pool, state.current_project()).await?;
    let outcome = filter.apply(records);

    let (content_type, filename, body) = match format.as_str() {
        "json" => (
            "application/json; charset=utf-8",
            "vacancies.json",
            export::to_json(&outcome.records)
                .map_err(|e| AppError::Internal(format!("JSON export failed: {e}")))?,
        ),
        "csv" => (
            "text/csv; charset=utf-8",
            "vacancies.csv",
            export::to_csv(&outcome.records),
        ),
        other => {
            return Err(AppError::BadRequest(format!(
                "unsupported export format '{other}', expected 'json' or 'csv'"
            )));
        }
    };

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response())
}

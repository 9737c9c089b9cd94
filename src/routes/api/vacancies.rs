use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use crate::analysis::filter::FilterParams;
use crate::error::AppError;
use crate::models::vacancy::Vacancy;
use crate::state::AppState;

// FilterParams fields are repeated here rather than #[serde(flatten)]ed:
// the query-string deserializer cannot flatten typed fields.
#[derive(Debug, Deserialize)]
pub struct VacancyQuery {
    pub min_salary: Option<i64>,
    pub max_salary: Option<i64>,
    #[serde(default)]
    pub hide_empty: bool,
    pub include_keywords: Option<String>,
    pub exclude_keywords: Option<String>,
    pub search_in: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

impl VacancyQuery {
    fn filter_params(&self) -> FilterParams {
        FilterParams {
            min_salary: self.min_salary,
            max_salary: self.max_salary,
            hide_empty: self.hide_empty,
            include_keywords: self.include_keywords.clone(),
            exclude_keywords: self.exclude_keywords.clone(),
            search_in: self.search_in.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VacancyListResponse {
    pub vacancies: Vec<Vacancy>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub pages: usize,
    pub filtered: bool,
    pub original_count: usize,
}

/// GET /api/vacancies
///
/// Filtered, paginated listing of the current project's vacancies.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<VacancyQuery>,
) -> Result<Json<VacancyListResponse>, AppError> {
    let filter = query.filter_params().into_criteria()?.compile()?;
    let filtered = !filter.is_identity();

    let records = Vacancy::list_by_project(&state.pool, state.current_project()).await?;
    let outcome = filter.apply(records);

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let total = outcome.records.len();
    let pages = total.div_ceil(per_page);

    let vacancies = outcome
        .records
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();

    Ok(Json(VacancyListResponse {
        vacancies,
        total,
        page,
        per_page,
        pages,
        filtered,
        original_count: outcome.original_count,
    }))
}

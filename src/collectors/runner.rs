use tokio_util::sync::CancellationToken;

use crate::collectors::{SearchRequest, normalize::normalize};
use crate::error::AppError;
use crate::models::project::Project;
use crate::models::vacancy::Vacancy;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct CollectParams {
    pub query: String,
    pub area: Option<u32>,
    pub experience: Option<String>,
    pub max_pages: u32,
    pub per_page: u32,
    pub create_new_project: bool,
    pub project_name: Option<String>,
}

/// Accept a collection request and run it in the background. Returns the
/// target project id, or rejects without side effects when a run is already
/// active or the requested project name is taken.
pub async fn start(state: &AppState, params: CollectParams) -> Result<i64, AppError> {
    let (target, token) = reserve(state, &params).await?;
    let task_state = state.clone();
    tokio::spawn(async move {
        run_collection(task_state, params, target, token).await;
    });
    Ok(target)
}

/// One-shot variant for the CLI: same contract, but waits for the run to end.
pub async fn collect_once(state: &AppState, params: CollectParams) -> Result<(), AppError> {
    let (target, token) = reserve(state, &params).await?;
    run_collection(state.clone(), params, target, token).await;
    Ok(())
}

/// Take the run slot, then resolve the target project. The slot is reserved
/// first so a rejected start never creates a stray project, and released if
/// project creation fails so a bad name never leaves a phantom run.
async fn reserve(
    state: &AppState,
    params: &CollectParams,
) -> Result<(i64, CancellationToken), AppError> {
    let token = state.tracker.try_begin(&params.query)?;

    let target = if params.create_new_project {
        let name = params
            .project_name
            .clone()
            .unwrap_or_else(|| params.query.clone());
        match Project::create(&state.pool, &name, &params.query).await {
            Ok(project) => {
                tracing::info!("Created project {} '{}'", project.id, project.name);
                state.switch_project(project.id);
                project.id
            }
            Err(e) => {
                state.tracker.release();
                return Err(e);
            }
        }
    } else {
        state.current_project()
    };

    if let Err(e) = state.tracker.claim_target(target) {
        state.tracker.release();
        return Err(e);
    }
    Ok((target, token))
}

async fn run_collection(
    state: AppState,
    params: CollectParams,
    target: i64,
    token: CancellationToken,
) {
    let request = SearchRequest {
        query: params.query.clone(),
        area: params.area,
        experience: params.experience.clone(),
        per_page: params.per_page,
    };

    let mut pages = 0u32;
    let mut fetched = 0u32;
    let mut new = 0u32;
    let mut updated = 0u32;

    for page in 0..params.max_pages {
        if token.is_cancelled() {
            tracing::info!("Collection cancelled after {pages} pages");
            state.tracker.finish(format!(
                "Cancelled after {pages} pages, {fetched} vacancies retained"
            ));
            return;
        }

        let page_data = match state.source.search(&request, page).await {
            Ok(data) => data,
            Err(e) => {
                tracing::error!("Collection failed on page {}: {e}", page + 1);
                state
                    .tracker
                    .fail(format!("Collection failed on page {}: {e}", page + 1));
                return;
            }
        };

        if page_data.items.is_empty() {
            break;
        }

        for raw in &page_data.items {
            let record = normalize(raw);
            match Vacancy::upsert(&state.pool, target, &record).await {
                Ok(true) => new += 1,
                Ok(false) => updated += 1,
                Err(e) => {
                    tracing::warn!("Failed to save vacancy {}: {e}", record.external_id);
                    continue;
                }
            }
            fetched += 1;
        }

        pages += 1;
        let message = match page_data.total_pages {
            Some(total) => format!("Fetched page {pages} of {total}, {fetched} vacancies"),
            None => format!("Fetched page {pages}, {fetched} vacancies"),
        };
        state.tracker.progress(pages, fetched, message);

        if !page_data.has_more {
            break;
        }
    }

    tracing::info!(
        "Collection completed: {fetched} vacancies ({new} new, {updated} updated) across {pages} pages"
    );
    state.tracker.finish(format!(
        "Completed: {fetched} vacancies ({new} new, {updated} updated) across {pages} pages"
    ));
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::analysis::report::AnalysisSettings;
    use crate::collectors::{RawVacancy, SearchPage, VacancySource};
    use crate::db::{self, DEFAULT_PROJECT_ID};
    use crate::status::RunState;

    /// Source that replays a scripted sequence of pages.
    struct ScriptedSource {
        pages: std::sync::Mutex<VecDeque<Result<SearchPage, AppError>>>,
    }

    impl ScriptedSource {
        fn new(pages: Vec<Result<SearchPage, AppError>>) -> Self {
            Self {
                pages: std::sync::Mutex::new(pages.into()),
            }
        }
    }

    #[async_trait]
    impl VacancySource for ScriptedSource {
        async fn search(&self, _request: &SearchRequest, _page: u32) -> Result<SearchPage, AppError> {
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(SearchPage {
                    items: vec![],
                    has_more: false,
                    total_pages: None,
                }))
        }
    }

    fn raw(id: &str) -> RawVacancy {
        serde_json::from_value(serde_json::json!({ "id": id, "name": format!("Vacancy {id}") }))
            .unwrap()
    }

    fn page(ids: &[&str], has_more: bool) -> Result<SearchPage, AppError> {
        Ok(SearchPage {
            items: ids.iter().map(|id| raw(id)).collect(),
            has_more,
            total_pages: Some(2),
        })
    }

    async fn state_with(pages: Vec<Result<SearchPage, AppError>>) -> AppState {
        AppState::new(
            db::memory_pool().await,
            Arc::new(ScriptedSource::new(pages)),
            AnalysisSettings::default(),
        )
    }

    fn params(query: &str) -> CollectParams {
        CollectParams {
            query: query.to_string(),
            area: None,
            experience: None,
            max_pages: 10,
            per_page: 20,
            create_new_project: false,
            project_name: None,
        }
    }

    #[tokio::test]
    async fn overlapping_pages_dedupe_by_external_id() {
        let state = state_with(vec![page(&["A", "B"], true), page(&["B", "C"], false)]).await;

        collect_once(&state, params("rust")).await.unwrap();

        let count = Vacancy::count_by_project(&state.pool, DEFAULT_PROJECT_ID)
            .await
            .unwrap();
        assert_eq!(count, 3);

        let snap = state.tracker.snapshot();
        assert_eq!(snap.state, RunState::Idle);
        assert_eq!(snap.pages_fetched, 2);
        assert_eq!(snap.items_fetched, 4);
        assert!(snap.message.contains("3 new"));
        assert!(snap.message.contains("1 updated"));
    }

    #[tokio::test]
    async fn rerun_never_grows_past_distinct_ids() {
        let state = state_with(vec![page(&["A", "B"], false), page(&["A", "B"], false)]).await;

        collect_once(&state, params("rust")).await.unwrap();
        collect_once(&state, params("rust")).await.unwrap();

        let count = Vacancy::count_by_project(&state.pool, DEFAULT_PROJECT_ID)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn fetch_failure_keeps_partial_data_and_reports_error() {
        let state = state_with(vec![
            page(&["A", "B"], true),
            Err(AppError::Fetch("connection reset".to_string())),
        ])
        .await;

        collect_once(&state, params("rust")).await.unwrap();

        let snap = state.tracker.snapshot();
        assert_eq!(snap.state, RunState::Error);
        assert!(snap.message.contains("page 2"));
        assert!(snap.message.contains("connection reset"));

        // Page one was committed incrementally and stays
        let count = Vacancy::count_by_project(&state.pool, DEFAULT_PROJECT_ID)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn max_pages_bounds_the_run() {
        let state = state_with(vec![
            page(&["A"], true),
            page(&["B"], true),
            page(&["C"], true),
        ])
        .await;
        let mut p = params("rust");
        p.max_pages = 2;

        collect_once(&state, p).await.unwrap();

        let count = Vacancy::count_by_project(&state.pool, DEFAULT_PROJECT_ID)
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(state.tracker.snapshot().pages_fetched, 2);
    }

    #[tokio::test]
    async fn start_rejects_while_a_run_is_active() {
        let state = state_with(vec![]).await;
        // Occupy the run slot as an in-flight collection would
        state.tracker.try_begin("first").unwrap();

        let mut p = params("second");
        p.create_new_project = true;
        p.project_name = Some("should not exist".to_string());
        let err = start(&state, p).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyRunning));

        // The rejected start created nothing
        let projects = Project::list(&state.pool).await.unwrap();
        assert!(projects.iter().all(|p| p.name != "should not exist"));
    }

    #[tokio::test]
    async fn duplicate_project_name_rejects_and_frees_the_slot() {
        let state = state_with(vec![page(&["A"], false)]).await;
        Project::create(&state.pool, "taken", "").await.unwrap();

        let mut p = params("rust");
        p.create_new_project = true;
        p.project_name = Some("taken".to_string());
        let err = start(&state, p).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateProjectName(_)));

        // Slot was released; a plain run goes through
        assert_eq!(state.tracker.snapshot().state, RunState::Idle);
        collect_once(&state, params("rust")).await.unwrap();
    }

    #[tokio::test]
    async fn new_project_becomes_target_and_current() {
        let state = state_with(vec![page(&["A", "B"], false)]).await;
        let mut p = params("маркетинг");
        p.create_new_project = true;
        p.project_name = Some("Marketing Q3".to_string());

        collect_once(&state, p).await.unwrap();

        let projects = Project::list(&state.pool).await.unwrap();
        let created = projects.iter().find(|p| p.name == "Marketing Q3").unwrap();
        assert_eq!(state.current_project(), created.id);
        assert_eq!(created.vacancy_count, 2);
        assert_eq!(
            Vacancy::count_by_project(&state.pool, DEFAULT_PROJECT_ID)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn cancellation_stops_between_pages() {
        let state = state_with(vec![page(&["A"], true), page(&["B"], true)]).await;
        let token = state.tracker.try_begin("rust").unwrap();
        state.tracker.claim_target(DEFAULT_PROJECT_ID).unwrap();
        token.cancel();

        run_collection(state.clone(), params("rust"), DEFAULT_PROJECT_ID, token).await;

        let snap = state.tracker.snapshot();
        assert_eq!(snap.state, RunState::Idle);
        assert!(snap.message.contains("Cancelled"));
        assert_eq!(
            Vacancy::count_by_project(&state.pool, DEFAULT_PROJECT_ID)
                .await
                .unwrap(),
            0
        );
    }
}

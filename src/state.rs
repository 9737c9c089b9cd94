use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use sqlx::SqlitePool;

use crate::analysis::report::AnalysisSettings;
use crate::collectors::VacancySource;
use crate::db::DEFAULT_PROJECT_ID;
use crate::status::StatusTracker;

/// Shared handles for the whole engine. Cheap to clone; handed to every
/// route and to the collection runner.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub tracker: StatusTracker,
    pub source: Arc<dyn VacancySource>,
    pub settings: Arc<AnalysisSettings>,
    current_project: Arc<AtomicI64>,
}

impl AppState {
    pub fn new(
        pool: SqlitePool,
        source: Arc<dyn VacancySource>,
        settings: AnalysisSettings,
    ) -> Self {
        Self {
            pool,
            tracker: StatusTracker::new(),
            source,
            settings: Arc::new(settings),
            current_project: Arc::new(AtomicI64::new(DEFAULT_PROJECT_ID)),
        }
    }

    /// The project reads and collections apply to unless told otherwise.
    pub fn current_project(&self) -> i64 {
        self.current_project.load(Ordering::SeqCst)
    }

    pub fn switch_project(&self, id: i64) {
        self.current_project.store(id, Ordering::SeqCst);
    }

    /// Called after a delete: if the current project went away, fall back to
    /// the default.
    pub fn reset_current_if(&self, deleted_id: i64) {
        let _ = self.current_project.compare_exchange(
            deleted_id,
            DEFAULT_PROJECT_ID,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}

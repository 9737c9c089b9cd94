pub mod collect;
pub mod export;
pub mod projects;
pub mod stats;
pub mod vacancies;

use axum::Router;
use axum::routing::{get, post};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        // Collection
        .route("/collect", post(collect::start))
        .route("/status", get(collect::status))
        // Analytics
        .route("/stats", get(stats::get))
        .route("/vacancies", get(vacancies::list))
        .route("/export/{format}", get(export::download))
        // Projects
        .route("/projects", get(projects::list).post(projects::create))
        .route(
            "/projects/{id}",
            axum::routing::put(projects::update).delete(projects::delete),
        )
        .route("/projects/{id}/switch", post(projects::switch))
        .with_state(state);

    Router::new().nest("/api", api)
}

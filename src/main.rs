mod analysis;
mod collectors;
mod config;
mod db;
mod error;
mod export;
mod models;
mod routes;
mod state;
mod status;

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use clap::Parser;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::analysis::report::AnalysisSettings;
use crate::collectors::hh::HhClient;
use crate::collectors::runner::{self, CollectParams};
use crate::config::{Command, Config};
use crate::state::AppState;
use crate::status::{RunState, StatusTracker};

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn readyz(pool: SqlitePool) -> impl IntoResponse {
    let result: Result<(i32,), _> = sqlx::query_as("SELECT 1").fetch_one(&pool).await;
    match result {
        Ok(_) => (StatusCode::OK, "ready"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "not ready"),
    }
}

/// Wind down on SIGINT: an in-flight collection stops at the next page
/// boundary, keeping whatever it already persisted.
async fn shutdown_signal(tracker: StatusTracker) {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received, stopping active collection");
    tracker.cancel_active();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("vacscope=info,tower_http=info")),
        )
        .init();

    let config = Config::parse();

    tracing::info!("Opening database at {}", config.database_path);
    let pool = db::create_pool(&config.database_path).await?;
    db::run_migrations(&pool).await?;

    let source = Arc::new(HhClient::new(&config)?);
    let settings = AnalysisSettings::from_config(&config);
    let state = AppState::new(pool.clone(), source, settings);

    match config.resolved_command() {
        Command::Serve { listen_addr } => {
            let app = Router::new()
                .route("/healthz", get(healthz))
                .route("/readyz", get(move || readyz(pool.clone())))
                .merge(routes::api::router(state.clone()))
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive());

            let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
            tracing::info!("Listening on {listen_addr}");
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal(state.tracker.clone()))
                .await?;
        }
        Command::Collect {
            query,
            area,
            experience,
            max_pages,
            per_page,
            project_name,
        } => {
            let params = CollectParams {
                query,
                area,
                experience,
                max_pages,
                per_page,
                create_new_project: project_name.is_some(),
                project_name,
            };
            runner::collect_once(&state, params).await?;

            let snapshot = state.tracker.snapshot();
            if snapshot.state == RunState::Error {
                anyhow::bail!("{}", snapshot.message);
            }
            tracing::info!("{}", snapshot.message);
        }
    }

    Ok(())
}

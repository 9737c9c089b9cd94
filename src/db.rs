use std::path::Path;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

/// Stable id of the protected default project.
pub const DEFAULT_PROJECT_ID: i64 = 1;

pub async fn create_pool(database_path: &str) -> anyhow::Result<SqlitePool> {
    if let Some(parent) = Path::new(database_path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(database_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS projects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            query TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS vacancies (
            external_id TEXT NOT NULL,
            project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            company_name TEXT NOT NULL DEFAULT '',
            url TEXT NOT NULL DEFAULT '',
            area TEXT NOT NULL DEFAULT '',
            experience TEXT NOT NULL DEFAULT '',
            employment TEXT NOT NULL DEFAULT '',
            schedule TEXT NOT NULL DEFAULT '',
            salary_from INTEGER,
            salary_to INTEGER,
            salary_currency TEXT NOT NULL DEFAULT 'RUR',
            description TEXT NOT NULL DEFAULT '',
            skills TEXT NOT NULL DEFAULT '[]',
            published_at TEXT,
            fetched_at TEXT NOT NULL,
            PRIMARY KEY (project_id, external_id)
        )",
    )
    .execute(pool)
    .await?;

    // Seed the protected default project
    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT OR IGNORE INTO projects (id, name, query, created_at, updated_at)
         VALUES (?, 'Default Project', '', ?, ?)",
    )
    .bind(DEFAULT_PROJECT_ID)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Fresh in-memory database with the schema applied, for tests.
#[cfg(test)]
pub async fn memory_pool() -> SqlitePool {
    let options = SqliteConnectOptions::new()
        .in_memory(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("in-memory pool");
    run_migrations(&pool).await.expect("schema");
    pool
}

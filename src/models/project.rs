use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::db::DEFAULT_PROJECT_ID;
use crate::error::AppError;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub query: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub vacancy_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateProject {
    pub name: String,
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub query: Option<String>,
}

const SELECT_WITH_COUNT: &str = "SELECT p.*, \
     (SELECT COUNT(*) FROM vacancies v WHERE v.project_id = p.id) AS vacancy_count \
     FROM projects p";

impl Project {
    pub async fn list(pool: &SqlitePool) -> Result<Vec<Project>, AppError> {
        let projects = sqlx::query_as::<_, Project>(&format!(
            "{SELECT_WITH_COUNT} ORDER BY p.updated_at DESC"
        ))
        .fetch_all(pool)
        .await?;
        Ok(projects)
    }

    pub async fn get(pool: &SqlitePool, id: i64) -> Result<Project, AppError> {
        sqlx::query_as::<_, Project>(&format!("{SELECT_WITH_COUNT} WHERE p.id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Project {id} not found")))
    }

    pub async fn create(pool: &SqlitePool, name: &str, query: &str) -> Result<Project, AppError> {
        let now = Utc::now();
        let result = sqlx::query("INSERT INTO projects (name, query, created_at, updated_at) VALUES (?, ?, ?, ?)")
            .bind(name)
            .bind(query)
            .bind(now)
            .bind(now)
            .execute(pool)
            .await;

        match result {
            Ok(done) => Self::get(pool, done.last_insert_rowid()).await,
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(AppError::DuplicateProjectName(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        input: UpdateProject,
    ) -> Result<Project, AppError> {
        let existing = Self::get(pool, id).await?;
        sqlx::query("UPDATE projects SET name = ?, query = ?, updated_at = ? WHERE id = ?")
            .bind(input.name.unwrap_or(existing.name))
            .bind(input.query.unwrap_or(existing.query))
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Self::get(pool, id).await
    }

    /// Delete a project and all of its vacancies. The default project is
    /// protected and can never be removed.
    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<(), AppError> {
        if id == DEFAULT_PROJECT_ID {
            return Err(AppError::DefaultProjectProtected);
        }

        sqlx::query("DELETE FROM vacancies WHERE project_id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Project {id} not found")));
        }
        Ok(())
    }
}

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use sqlx::types::Json;

use crate::error::AppError;

/// One collected listing, scoped to a project. `external_id` is the source
/// API's id and is unique within a project.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Vacancy {
    pub external_id: String,
    pub project_id: i64,
    pub title: String,
    pub company_name: String,
    pub url: String,
    pub area: String,
    pub experience: String,
    pub employment: String,
    pub schedule: String,
    pub salary_from: Option<i64>,
    pub salary_to: Option<i64>,
    pub salary_currency: String,
    pub description: String,
    pub skills: Json<Vec<String>>,
    pub published_at: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

/// A normalized listing ready for insertion, before project assignment.
#[derive(Debug, Clone)]
pub struct NewVacancy {
    pub external_id: String,
    pub title: String,
    pub company_name: String,
    pub url: String,
    pub area: String,
    pub experience: String,
    pub employment: String,
    pub schedule: String,
    pub salary_from: Option<i64>,
    pub salary_to: Option<i64>,
    pub salary_currency: String,
    pub description: String,
    pub skills: Vec<String>,
    pub published_at: Option<String>,
}

impl Vacancy {
    /// Insert a listing, or overwrite the mutable fields of an existing one
    /// with the same `(project_id, external_id)`. Returns whether a new row
    /// was inserted, so callers can keep new/updated counts.
    pub async fn upsert(
        pool: &SqlitePool,
        project_id: i64,
        input: &NewVacancy,
    ) -> Result<bool, AppError> {
        let existing: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM vacancies WHERE project_id = ? AND external_id = ?")
                .bind(project_id)
                .bind(&input.external_id)
                .fetch_optional(pool)
                .await?;

        sqlx::query(
            "INSERT INTO vacancies (
                external_id, project_id, title, company_name, url, area,
                experience, employment, schedule, salary_from, salary_to,
                salary_currency, description, skills, published_at, fetched_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (project_id, external_id) DO UPDATE SET
                title = excluded.title,
                company_name = excluded.company_name,
                url = excluded.url,
                area = excluded.area,
                experience = excluded.experience,
                employment = excluded.employment,
                schedule = excluded.schedule,
                salary_from = excluded.salary_from,
                salary_to = excluded.salary_to,
                salary_currency = excluded.salary_currency,
                description = excluded.description,
                skills = excluded.skills,
                published_at = excluded.published_at,
                fetched_at = excluded.fetched_at",
        )
        .bind(&input.external_id)
        .bind(project_id)
        .bind(&input.title)
        .bind(&input.company_name)
        .bind(&input.url)
        .bind(&input.area)
        .bind(&input.experience)
        .bind(&input.employment)
        .bind(&input.schedule)
        .bind(input.salary_from)
        .bind(input.salary_to)
        .bind(&input.salary_currency)
        .bind(&input.description)
        .bind(Json(&input.skills))
        .bind(&input.published_at)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Ok(existing.is_none())
    }

    pub async fn list_by_project(
        pool: &SqlitePool,
        project_id: i64,
    ) -> Result<Vec<Vacancy>, AppError> {
        let vacancies = sqlx::query_as::<_, Vacancy>(
            "SELECT * FROM vacancies WHERE project_id = ? ORDER BY fetched_at DESC, external_id",
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;
        Ok(vacancies)
    }

    #[allow(dead_code)]
    pub async fn count_by_project(pool: &SqlitePool, project_id: i64) -> Result<i64, AppError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vacancies WHERE project_id = ?")
            .bind(project_id)
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }
}

#[cfg(test)]
impl NewVacancy {
    /// Minimal record for tests; fields are overridden per test as needed.
    pub fn stub(external_id: &str) -> Self {
        Self {
            external_id: external_id.to_string(),
            title: format!("Vacancy {external_id}"),
            company_name: "Acme".to_string(),
            url: String::new(),
            area: String::new(),
            experience: String::new(),
            employment: String::new(),
            schedule: String::new(),
            salary_from: None,
            salary_to: None,
            salary_currency: "RUR".to_string(),
            description: String::new(),
            skills: Vec::new(),
            published_at: None,
        }
    }
}

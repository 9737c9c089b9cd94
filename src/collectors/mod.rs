pub mod hh;
pub mod normalize;
pub mod runner;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::AppError;

/// One page query against the external vacancy-search API.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub area: Option<u32>,
    pub experience: Option<String>,
    pub per_page: u32,
}

/// One page of results. `total_pages` is the source's estimate, when it
/// reports one; `has_more` decides whether the runner keeps going.
#[derive(Debug)]
pub struct SearchPage {
    pub items: Vec<RawVacancy>,
    pub has_more: bool,
    pub total_pages: Option<u32>,
}

/// Paginated search source for raw vacancy payloads. The production
/// implementation is [`hh::HhClient`]; tests script their own.
#[async_trait]
pub trait VacancySource: Send + Sync {
    async fn search(&self, request: &SearchRequest, page: u32) -> Result<SearchPage, AppError>;
}

/// A vacancy as the HH.ru API returns it, reduced to the fields the engine
/// consumes. Listing payloads carry a subset; detail payloads add
/// `description` and `key_skills`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawVacancy {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub alternate_url: String,
    #[serde(default)]
    pub salary: Option<RawSalary>,
    #[serde(default)]
    pub employer: Option<Named>,
    #[serde(default)]
    pub area: Option<Named>,
    #[serde(default)]
    pub experience: Option<Named>,
    #[serde(default)]
    pub employment: Option<Named>,
    #[serde(default)]
    pub schedule: Option<Named>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub key_skills: Vec<Named>,
    #[serde(default)]
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSalary {
    #[serde(default)]
    pub from: Option<i64>,
    #[serde(default)]
    pub to: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// HH.ru wraps most nested values as `{ "id": …, "name": … }`.
#[derive(Debug, Clone, Deserialize)]
pub struct Named {
    #[serde(default)]
    pub name: String,
}

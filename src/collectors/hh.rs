use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::collectors::{RawVacancy, SearchPage, SearchRequest, VacancySource};
use crate::config::Config;
use crate::error::AppError;

const RETRIES: u32 = 3;

/// HH.ru API client. Throttled to a configured request rate and retried
/// with exponential backoff; the API itself needs no auth for search.
pub struct HhClient {
    http: reqwest::Client,
    base_url: String,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

#[derive(Debug, Deserialize)]
struct HhSearchResponse {
    items: Vec<RawVacancy>,
    pages: u32,
}

impl HhClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent(&config.hh_user_agent)
            .timeout(Duration::from_secs(config.hh_timeout_secs))
            .build()
            .map_err(|e| AppError::Fetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.hh_base_url.trim_end_matches('/').to_string(),
            min_interval: Duration::from_secs_f64(1.0 / config.hh_requests_per_second.max(0.1)),
            last_request: Mutex::new(None),
        })
    }

    /// Wait out the minimum interval since the previous request.
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(at) = *last {
            let elapsed = at.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, AppError> {
        let mut attempt = 0;
        loop {
            self.throttle().await;
            let result = async {
                let resp = self
                    .http
                    .get(url)
                    .query(params)
                    .send()
                    .await
                    .map_err(|e| AppError::Fetch(format!("request to {url} failed: {e}")))?;
                let resp = resp
                    .error_for_status()
                    .map_err(|e| AppError::Fetch(format!("{url} returned {e}")))?;
                resp.json::<T>()
                    .await
                    .map_err(|e| AppError::Fetch(format!("failed to parse {url}: {e}")))
            }
            .await;

            match result {
                Ok(value) => return Ok(value),
                Err(e) if attempt + 1 < RETRIES => {
                    tracing::warn!("Request failed (attempt {}/{RETRIES}): {e}", attempt + 1);
                    tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn vacancy_details(&self, id: &str) -> Result<RawVacancy, AppError> {
        let url = format!("{}/vacancies/{id}", self.base_url);
        self.get_json(&url, &[]).await
    }
}

#[async_trait]
impl VacancySource for HhClient {
    async fn search(&self, request: &SearchRequest, page: u32) -> Result<SearchPage, AppError> {
        let url = format!("{}/vacancies", self.base_url);
        let mut params = vec![
            ("text", request.query.clone()),
            ("per_page", request.per_page.to_string()),
            ("page", page.to_string()),
        ];
        if let Some(area) = request.area {
            params.push(("area", area.to_string()));
        }
        if let Some(experience) = &request.experience {
            params.push(("experience", experience.clone()));
        }

        let response: HhSearchResponse = self.get_json(&url, &params).await?;

        // Search listings omit description and key skills; fetch details per
        // item, falling back to the listing payload when that fails.
        let mut items = Vec::with_capacity(response.items.len());
        for listing in response.items {
            match self.vacancy_details(&listing.id).await {
                Ok(detailed) => items.push(detailed),
                Err(e) => {
                    tracing::warn!("Details fetch failed for vacancy {}: {e}", listing.id);
                    items.push(listing);
                }
            }
        }

        Ok(SearchPage {
            items,
            has_more: page + 1 < response.pages,
            total_pages: Some(response.pages),
        })
    }
}

use serde::Deserialize;

use crate::error::AppError;
use crate::models::vacancy::Vacancy;

/// Which fields keyword matching examines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchScope {
    Title,
    #[default]
    FullText,
}

/// User-supplied filter criteria, one set per request.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    pub min_salary: Option<i64>,
    pub max_salary: Option<i64>,
    pub hide_empty: bool,
    pub include_keywords: Vec<String>,
    pub exclude_keywords: Vec<String>,
    pub scope: SearchScope,
}

/// Raw query parameters as the dashboard sends them. Keywords arrive
/// comma-separated; `search_in` is `title` or `full_text`.
#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    pub min_salary: Option<i64>,
    pub max_salary: Option<i64>,
    #[serde(default)]
    pub hide_empty: bool,
    pub include_keywords: Option<String>,
    pub exclude_keywords: Option<String>,
    pub search_in: Option<String>,
}

impl FilterParams {
    pub fn into_criteria(self) -> Result<FilterCriteria, AppError> {
        let split = |s: Option<String>| -> Vec<String> {
            s.map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
        };

        let scope = match self.search_in.as_deref() {
            None | Some("") | Some("full_text") => SearchScope::FullText,
            Some("title") => SearchScope::Title,
            Some(other) => {
                return Err(AppError::BadRequest(format!(
                    "unknown search_in value '{other}', expected 'title' or 'full_text'"
                )));
            }
        };

        Ok(FilterCriteria {
            min_salary: self.min_salary,
            max_salary: self.max_salary,
            hide_empty: self.hide_empty,
            include_keywords: split(self.include_keywords),
            exclude_keywords: split(self.exclude_keywords),
            scope,
        })
    }
}

impl FilterCriteria {
    /// Validate and lower the criteria into a predicate. Contradictory
    /// salary bounds are an error, not an empty result set.
    pub fn compile(self) -> Result<CompiledFilter, AppError> {
        if let (Some(min), Some(max)) = (self.min_salary, self.max_salary)
            && min > max
        {
            return Err(AppError::BadRequest(format!(
                "min_salary ({min}) is greater than max_salary ({max})"
            )));
        }

        Ok(CompiledFilter {
            min_salary: self.min_salary,
            max_salary: self.max_salary,
            hide_empty: self.hide_empty,
            include: self
                .include_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
            exclude: self
                .exclude_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
            scope: self.scope,
        })
    }
}

/// Compiled predicate over vacancy records. All active sub-predicates are
/// ANDed; an empty criteria set passes everything.
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    min_salary: Option<i64>,
    max_salary: Option<i64>,
    hide_empty: bool,
    include: Vec<String>,
    exclude: Vec<String>,
    scope: SearchScope,
}

/// Result of filtering one record set, with the counts the dashboard shows
/// as "N of M".
#[derive(Debug)]
pub struct Filtered {
    pub records: Vec<Vacancy>,
    pub original_count: usize,
}

impl CompiledFilter {
    pub fn is_identity(&self) -> bool {
        self.min_salary.is_none()
            && self.max_salary.is_none()
            && !self.hide_empty
            && self.include.is_empty()
            && self.exclude.is_empty()
    }

    pub fn matches(&self, record: &Vacancy) -> bool {
        self.salary_ok(record) && self.keywords_ok(record)
    }

    pub fn apply(&self, records: Vec<Vacancy>) -> Filtered {
        let original_count = records.len();
        let records = records.into_iter().filter(|r| self.matches(r)).collect();
        Filtered {
            records,
            original_count,
        }
    }

    fn salary_ok(&self, record: &Vacancy) -> bool {
        let bounds: Vec<i64> = [record.salary_from, record.salary_to]
            .into_iter()
            .flatten()
            .collect();

        if bounds.is_empty() {
            // No salary data: the bound check is skipped and visibility is
            // governed solely by hide_empty.
            return !self.hide_empty;
        }

        if self.min_salary.is_none() && self.max_salary.is_none() {
            return true;
        }

        let min = self.min_salary.unwrap_or(i64::MIN);
        let max = self.max_salary.unwrap_or(i64::MAX);
        bounds.iter().any(|&value| min <= value && value <= max)
    }

    fn keywords_ok(&self, record: &Vacancy) -> bool {
        if self.include.is_empty() && self.exclude.is_empty() {
            return true;
        }

        let haystack = match self.scope {
            SearchScope::Title => record.title.to_lowercase(),
            SearchScope::FullText => {
                format!("{} {}", record.title, record.description).to_lowercase()
            }
        };

        self.include.iter().all(|term| haystack.contains(term))
            && !self.exclude.iter().any(|term| haystack.contains(term))
    }
}

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::config::Config;
use crate::models::vacancy::Vacancy;

/// Tuning for keyword extraction. Stopwords and thresholds are deliberately
/// configurable; the defaults match the dashboard's Russian/English corpus.
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub min_token_len: usize,
    pub min_keyword_frequency: u64,
    pub top_keywords: usize,
    pub top_skills: usize,
    pub stop_words: HashSet<String>,
}

const DEFAULT_STOP_WORDS: &[&str] = &[
    // Russian
    "это", "как", "так", "для", "или", "все", "что", "быть", "мочь", "год", "его", "весь", "наш",
    "свой", "один", "который", "если", "может", "также", "более", "чтобы", "можно", "либо",
    "рамках", "должен", "работа", "работы", "опыт", "компания", "компании", "условия",
    "требования", "обязанности", "наличие", "знание", "умение",
    // English
    "the", "and", "for", "with", "you", "our", "your", "will", "are", "not", "have", "from",
    "this", "that", "work", "team", "job", "all",
];

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            min_token_len: 3,
            min_keyword_frequency: 2,
            top_keywords: 20,
            top_skills: 15,
            stop_words: DEFAULT_STOP_WORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl AnalysisSettings {
    pub fn from_config(config: &Config) -> Self {
        let mut settings = Self {
            min_token_len: config.min_token_len,
            min_keyword_frequency: config.min_keyword_frequency,
            top_keywords: config.top_keywords,
            top_skills: config.top_skills,
            ..Self::default()
        };
        settings
            .stop_words
            .extend(config.extra_stop_words.iter().map(|s| s.to_lowercase()));
        settings
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermCount {
    pub term: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalaryStats {
    pub count_total: u64,
    pub count_with_salary: u64,
    pub min_from: Option<i64>,
    pub max_from: Option<i64>,
    pub avg_from: Option<f64>,
    pub min_to: Option<i64>,
    pub max_to: Option<i64>,
    pub avg_to: Option<f64>,
}

/// Aggregated statistics over one filtered vacancy set. Recomputed on
/// demand, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub total_vacancies: u64,
    pub top_keywords: Vec<TermCount>,
    pub top_skills: Vec<TermCount>,
    pub salary_stats: SalaryStats,
    pub experience_stats: HashMap<String, u64>,
    pub resume_tips: Vec<String>,
}

/// Tokenize free text for keyword counting: split on non-alphanumeric
/// boundaries, case-fold, drop short, numeric and stopword tokens.
fn tokenize(text: &str, settings: &AnalysisSettings) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| t.chars().count() >= settings.min_token_len)
        .filter(|t| !t.chars().all(|c| c.is_ascii_digit()))
        .filter(|t| !settings.stop_words.contains(t))
        .collect()
}

/// Compute the full report in a single pass over the input. Deterministic:
/// rankings order by count descending, then term ascending.
pub fn aggregate(records: &[Vacancy], settings: &AnalysisSettings) -> Report {
    let mut keyword_counts: HashMap<String, u64> = HashMap::new();
    let mut skill_counts: HashMap<String, u64> = HashMap::new();
    let mut experience_stats: HashMap<String, u64> = HashMap::new();

    let mut count_with_salary = 0u64;
    let mut from_values: Vec<i64> = Vec::new();
    let mut to_values: Vec<i64> = Vec::new();

    for record in records {
        // Keywords: counted once per vacancy that contains them, so one
        // long description cannot dominate the ranking.
        let text = format!("{} {}", record.title, record.description);
        for token in tokenize(&text, settings) {
            *keyword_counts.entry(token).or_insert(0) += 1;
        }

        let distinct_skills: HashSet<&String> = record.skills.0.iter().collect();
        for skill in distinct_skills {
            *skill_counts.entry(skill.clone()).or_insert(0) += 1;
        }

        if record.salary_from.is_some() || record.salary_to.is_some() {
            count_with_salary += 1;
        }
        if let Some(from) = record.salary_from {
            from_values.push(from);
        }
        if let Some(to) = record.salary_to {
            to_values.push(to);
        }

        if !record.experience.is_empty() {
            *experience_stats.entry(record.experience.clone()).or_insert(0) += 1;
        }
    }

    let avg = |values: &[i64]| -> Option<f64> {
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<i64>() as f64 / values.len() as f64)
        }
    };

    let top_keywords = rank(
        keyword_counts,
        settings.top_keywords,
        settings.min_keyword_frequency,
    );
    let top_skills = rank(skill_counts, settings.top_skills, 1);
    let resume_tips = resume_tips(&top_keywords, &top_skills);

    Report {
        total_vacancies: records.len() as u64,
        top_keywords,
        top_skills,
        salary_stats: SalaryStats {
            count_total: records.len() as u64,
            count_with_salary,
            min_from: from_values.iter().min().copied(),
            max_from: from_values.iter().max().copied(),
            avg_from: avg(&from_values),
            min_to: to_values.iter().min().copied(),
            max_to: to_values.iter().max().copied(),
            avg_to: avg(&to_values),
        },
        experience_stats,
        resume_tips,
    }
}

/// Resume optimization hints derived from the rankings: the leading skills
/// to list, and the keywords frequent enough (seen in more than 30% of the
/// ranked set) to weave into an experience section.
fn resume_tips(top_keywords: &[TermCount], top_skills: &[TermCount]) -> Vec<String> {
    let mut tips = Vec::new();

    if !top_skills.is_empty() {
        let skills = top_skills
            .iter()
            .take(5)
            .map(|t| format!("\"{}\"", t.term))
            .collect::<Vec<_>>()
            .join(", ");
        tips.push(format!("Включите следующие ключевые навыки: {skills}"));
    }

    let threshold = top_keywords.len() as f64 * 0.3;
    let important: Vec<String> = top_keywords
        .iter()
        .filter(|t| t.count as f64 > threshold)
        .take(10)
        .map(|t| format!("\"{}\"", t.term))
        .collect();
    if !important.is_empty() {
        tips.push(format!(
            "Используйте эти ключевые слова в описании опыта: {}",
            important.join(", ")
        ));
    }

    tips
}

fn rank(counts: HashMap<String, u64>, limit: usize, min_frequency: u64) -> Vec<TermCount> {
    let mut ranked: Vec<TermCount> = counts
        .into_iter()
        .filter(|(_, count)| *count >= min_frequency)
        .map(|(term, count)| TermCount { term, count })
        .collect();
    ranked.sort_unstable_by(|a, b| b.count.cmp(&a.count).then_with(|| a.term.cmp(&b.term)));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::types::Json;

    use crate::analysis::filter::FilterCriteria;

    fn settings() -> AnalysisSettings {
        AnalysisSettings {
            min_keyword_frequency: 1,
            ..Default::default()
        }
    }

    fn record(id: &str, description: &str) -> Vacancy {
        Vacancy {
            external_id: id.to_string(),
            project_id: 1,
            title: String::new(),
            company_name: String::new(),
            url: String::new(),
            area: String::new(),
            experience: String::new(),
            employment: String::new(),
            schedule: String::new(),
            salary_from: None,
            salary_to: None,
            salary_currency: "RUR".to_string(),
            description: description.to_string(),
            skills: Json(vec![]),
            published_at: None,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn keywords_count_presence_per_record() {
        let records = vec![
            record("1", "kubernetes kubernetes kubernetes docker"),
            record("2", "docker"),
        ];
        let report = aggregate(&records, &settings());

        let docker = report
            .top_keywords
            .iter()
            .find(|t| t.term == "docker")
            .unwrap();
        let kubernetes = report
            .top_keywords
            .iter()
            .find(|t| t.term == "kubernetes")
            .unwrap();
        // Repetition inside one description does not inflate the count
        assert_eq!(kubernetes.count, 1);
        assert_eq!(docker.count, 2);
    }

    #[test]
    fn ranking_breaks_ties_lexicographically() {
        let records = vec![record("1", "zig ada zig ada")];
        let report = aggregate(&records, &settings());
        let terms: Vec<&str> = report.top_keywords.iter().map(|t| t.term.as_str()).collect();
        assert_eq!(terms, vec!["ada", "zig"]);
    }

    #[test]
    fn tokenizer_drops_short_numeric_and_stop_tokens() {
        let tokens = tokenize("Опыт работы с Kubernetes 2019, db и the ci", &settings());
        assert!(tokens.contains("kubernetes"));
        // "2019" numeric, "db"/"ci"/"и" too short, "the"/"опыт"/"работы"/"с" stopped or short
        assert!(!tokens.contains("2019"));
        assert!(!tokens.contains("db"));
        assert!(!tokens.contains("the"));
        assert!(!tokens.contains("опыт"));
    }

    #[test]
    fn min_frequency_prunes_rare_keywords() {
        let records = vec![record("1", "erlang elixir"), record("2", "elixir")];
        let mut tuned = settings();
        tuned.min_keyword_frequency = 2;
        let report = aggregate(&records, &tuned);
        let terms: Vec<&str> = report.top_keywords.iter().map(|t| t.term.as_str()).collect();
        assert_eq!(terms, vec!["elixir"]);
    }

    #[test]
    fn skills_counted_once_per_record() {
        let mut a = record("1", "");
        a.skills = Json(vec!["SQL".to_string(), "SQL".to_string(), "Excel".to_string()]);
        let mut b = record("2", "");
        b.skills = Json(vec!["SQL".to_string()]);

        let report = aggregate(&[a, b], &settings());
        assert_eq!(
            report.top_skills,
            vec![
                TermCount {
                    term: "SQL".to_string(),
                    count: 2
                },
                TermCount {
                    term: "Excel".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn salary_scenario_with_hide_empty_filter() {
        let mut a = record("1", "");
        a.salary_from = Some(50_000);
        let mut b = record("2", "");
        b.salary_from = Some(80_000);
        let c = record("3", "");

        let filter = FilterCriteria {
            min_salary: Some(60_000),
            hide_empty: true,
            ..Default::default()
        }
        .compile()
        .unwrap();
        let outcome = filter.apply(vec![a, b, c]);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].salary_from, Some(80_000));

        let report = aggregate(&outcome.records, &settings());
        assert_eq!(report.salary_stats.count_with_salary, 1);
        assert_eq!(report.salary_stats.avg_from, Some(80_000.0));
        assert_eq!(report.salary_stats.avg_to, None);
    }

    #[test]
    fn identity_filter_round_trip_yields_identical_report() {
        let mut a = record("1", "postgres redis");
        a.salary_from = Some(100_000);
        a.salary_to = Some(150_000);
        a.experience = "От 1 года до 3 лет".to_string();
        let mut b = record("2", "postgres kafka");
        b.experience = "От 1 года до 3 лет".to_string();
        let records = vec![a, b];

        let filter = FilterCriteria::default().compile().unwrap();
        let outcome = filter.apply(records.clone());
        assert_eq!(outcome.original_count, 2);

        let direct = aggregate(&records, &settings());
        let filtered = aggregate(&outcome.records, &settings());
        assert_eq!(direct, filtered);
    }

    #[test]
    fn experience_histogram_skips_blank_levels() {
        let mut a = record("1", "");
        a.experience = "Нет опыта".to_string();
        let b = record("2", "");

        let report = aggregate(&[a, b], &settings());
        assert_eq!(report.experience_stats.len(), 1);
        assert_eq!(report.experience_stats["Нет опыта"], 1);
    }

    #[test]
    fn resume_tips_name_top_skills_and_frequent_keywords() {
        let mut a = record("1", "python django flask fastapi");
        a.skills = Json(vec!["SQL".to_string(), "Excel".to_string()]);
        let mut b = record("2", "python celery");
        b.skills = Json(vec!["SQL".to_string()]);

        let report = aggregate(&[a, b], &settings());
        assert_eq!(report.resume_tips.len(), 2);
        // Skills tip lists the ranked skills, quoted
        assert!(report.resume_tips[0].contains("\"SQL\""));
        assert!(report.resume_tips[0].contains("\"Excel\""));
        // 5 ranked keywords, threshold 1.5: only "python" (count 2) clears it
        assert!(report.resume_tips[1].contains("\"python\""));
        assert!(!report.resume_tips[1].contains("django"));
    }

    #[test]
    fn empty_input_produces_an_empty_report() {
        let report = aggregate(&[], &settings());
        assert_eq!(report.total_vacancies, 0);
        assert!(report.top_keywords.is_empty());
        assert!(report.top_skills.is_empty());
        assert!(report.resume_tips.is_empty());
        assert_eq!(report.salary_stats.count_with_salary, 0);
        assert_eq!(report.salary_stats.avg_from, None);
    }
}

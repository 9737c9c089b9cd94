use crate::models::vacancy::Vacancy;

const CSV_COLUMNS: &[&str] = &[
    "external_id",
    "title",
    "company_name",
    "area",
    "experience",
    "salary_from",
    "salary_to",
    "salary_currency",
    "url",
    "published_at",
];

/// Render a vacancy set as CSV with a header row. Fields containing commas,
/// quotes or newlines are quoted per RFC 4180.
pub fn to_csv(records: &[Vacancy]) -> String {
    let mut out = String::new();
    out.push_str(&CSV_COLUMNS.join(","));
    out.push('\n');

    for record in records {
        let opt = |v: &Option<i64>| v.map(|n| n.to_string()).unwrap_or_default();
        let fields = [
            record.external_id.clone(),
            record.title.clone(),
            record.company_name.clone(),
            record.area.clone(),
            record.experience.clone(),
            opt(&record.salary_from),
            opt(&record.salary_to),
            record.salary_currency.clone(),
            record.url.clone(),
            record.published_at.clone().unwrap_or_default(),
        ];
        let row: Vec<String> = fields.iter().map(|f| escape(f)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

pub fn to_json(records: &[Vacancy]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(records)
}

fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::types::Json;

    fn record(id: &str, title: &str) -> Vacancy {
        Vacancy {
            external_id: id.to_string(),
            project_id: 1,
            title: title.to_string(),
            company_name: "Acme".to_string(),
            url: "https://hh.ru/vacancy/1".to_string(),
            area: "Москва".to_string(),
            experience: String::new(),
            employment: String::new(),
            schedule: String::new(),
            salary_from: Some(90_000),
            salary_to: None,
            salary_currency: "RUR".to_string(),
            description: String::new(),
            skills: Json(vec![]),
            published_at: None,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn csv_has_header_and_one_row_per_record() {
        let csv = to_csv(&[record("1", "Lead"), record("2", "Head")]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("external_id,title,"));
        assert!(lines[1].starts_with("1,Lead,Acme,"));
        assert!(lines[1].contains(",90000,,RUR,"));
    }

    #[test]
    fn csv_quotes_fields_with_commas_and_quotes() {
        let csv = to_csv(&[record("1", "Head of \"Growth\", Marketing")]);
        assert!(csv.contains("\"Head of \"\"Growth\"\", Marketing\""));
    }

    #[test]
    fn json_round_trips_the_record_set() {
        let json = to_json(&[record("1", "Lead")]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["external_id"], "1");
        assert_eq!(parsed[0]["salary_from"], 90_000);
    }
}

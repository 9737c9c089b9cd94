use crate::collectors::{Named, RawVacancy};
use crate::models::vacancy::NewVacancy;

/// Map a raw API payload into the internal record shape. Pure; HTML in the
/// description is stripped here so downstream tokenization sees plain text.
pub fn normalize(raw: &RawVacancy) -> NewVacancy {
    let named =
        |value: &Option<Named>| value.as_ref().map(|n| n.name.clone()).unwrap_or_default();

    let (salary_from, salary_to, salary_currency) = match &raw.salary {
        Some(s) => (
            s.from,
            s.to,
            s.currency.clone().unwrap_or_else(|| "RUR".to_string()),
        ),
        None => (None, None, "RUR".to_string()),
    };

    NewVacancy {
        external_id: raw.id.clone(),
        title: raw.name.clone(),
        company_name: named(&raw.employer),
        url: raw.alternate_url.clone(),
        area: named(&raw.area),
        experience: named(&raw.experience),
        employment: named(&raw.employment),
        schedule: named(&raw.schedule),
        salary_from,
        salary_to,
        salary_currency,
        description: clean_html(&raw.description),
        skills: raw
            .key_skills
            .iter()
            .map(|s| s.name.clone())
            .filter(|s| !s.is_empty())
            .collect(),
        published_at: raw.published_at.clone(),
    }
}

/// Strip HTML tags, decode the handful of entities HH uses, collapse
/// whitespace.
pub fn clean_html(input: &str) -> String {
    let mut text = String::with_capacity(input.len());
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                // Tag boundaries separate words in the rendered text
                text.push(' ');
            }
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }

    let text = text
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">");

    // Collapse runs of whitespace into single spaces
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = true;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out.truncate(out.trim_end().len());
    out
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{CandidateId, CandidateSummary};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedEntry {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub responsibilities: Option<String>,
}

/// The searchable projection of a candidate, as stored in the search index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateDocument {
    pub id: CandidateId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub hard_skills: Vec<NamedEntry>,
    #[serde(default)]
    pub experiences: Vec<ExperienceEntry>,
}

impl CandidateDocument {
    /// Builds the document from a candidate record and its structured resume.
    /// The current title falls back to the resume's `job_title` when the record has none.
    pub fn from_candidate(candidate: &CandidateSummary) -> Self {
        let resume = candidate.resume();

        let job_title = candidate
            .current_job_title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| resume.and_then(|r| string_field(r, &["job_title"])));

        let hard_skills = resume
            .and_then(|r| r.get("hard_skills"))
            .and_then(Value::as_array)
            .map(|skills| {
                skills
                    .iter()
                    .filter_map(|s| match s {
                        Value::String(name) => Some(name.clone()),
                        other => string_field(other, &["name"]),
                    })
                    .filter(|name| !name.trim().is_empty())
                    .map(|name| NamedEntry { name })
                    .collect()
            })
            .unwrap_or_default();

        let experiences = resume
            .and_then(|r| r.get("experiences").or_else(|| r.get("experience")))
            .and_then(Value::as_array)
            .map(|entries| entries.iter().map(experience_from_value).collect())
            .unwrap_or_default();

        CandidateDocument {
            id: candidate.id,
            name: candidate.name.clone(),
            email: candidate.email.clone(),
            job_title,
            hard_skills,
            experiences,
        }
    }

    pub fn skill_names(&self) -> impl Iterator<Item = &str> {
        self.hard_skills.iter().map(|s| s.name.as_str())
    }
}

fn experience_from_value(value: &Value) -> ExperienceEntry {
    let responsibilities = match value.get("responsibilities") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" "),
        ),
        _ => None,
    };

    ExperienceEntry {
        job_title: string_field(value, &["job_title", "title"]).unwrap_or_default(),
        company: string_field(value, &["company"]),
        duration: string_field(value, &["duration"]),
        responsibilities,
    }
}

/// First non-empty string among `keys`.
fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| value.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::JobId;

/// Job category. Drives the threshold table of the three-factor combination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    #[default]
    Technical,
    Functional,
    Hybrid,
}

impl JobType {
    /// Maps a stored job-type label. Labels are stored in French by the
    /// job-management side ("technique", "fonctionnel", "technico-fonctionnel").
    /// A missing label means technical; any unknown label means hybrid.
    pub fn from_label(label: Option<&str>) -> Self {
        let Some(label) = label else {
            return JobType::Technical;
        };
        match label.trim().to_lowercase().as_str() {
            "" | "technique" | "technical" => JobType::Technical,
            "fonctionnel" | "functional" => JobType::Functional,
            _ => JobType::Hybrid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Technical => "technical",
            JobType::Functional => "functional",
            JobType::Hybrid => "hybrid",
        }
    }
}

/// Read-only job input to matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub id: JobId,
    pub title: String,
    pub description: String,
    pub primary_skill: Option<String>,
    pub job_type: JobType,
}

#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub competence_phare: Option<String>,
    pub job_type_etiquette: Option<String>,
}

impl From<JobRow> for JobDescriptor {
    fn from(row: JobRow) -> Self {
        JobDescriptor {
            id: row.id,
            title: row.title,
            description: row.description,
            primary_skill: row.competence_phare.filter(|s| !s.trim().is_empty()),
            job_type: JobType::from_label(row.job_type_etiquette.as_deref()),
        }
    }
}

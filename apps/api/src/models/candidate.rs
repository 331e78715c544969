use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use super::CandidateId;

/// Read-only candidate input. `structured_resume` is the opaque document
/// produced by the resume extraction step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub id: CandidateId,
    pub name: String,
    pub email: String,
    pub current_job_title: Option<String>,
    pub structured_resume: Option<Value>,
}

impl CandidateSummary {
    /// Returns the resume document when it carries any content.
    pub fn resume(&self) -> Option<&Value> {
        match &self.structured_resume {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) if map.is_empty() => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(value) => Some(value),
        }
    }
}

/// Candidate joined with its most recent resume. `resume_json` is stored as text.
#[derive(Debug, Clone, FromRow)]
pub struct CandidateRow {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub job_title: Option<String>,
    pub resume_json: Option<String>,
}

impl CandidateRow {
    /// Converts into a summary. Unparseable resume text is dropped (logged) so the
    /// candidate surfaces as "no resume data" downstream.
    pub fn into_summary(self) -> CandidateSummary {
        let structured_resume = self.resume_json.as_deref().and_then(|text| {
            serde_json::from_str::<Value>(text)
                .map_err(|e| {
                    tracing::warn!("Invalid resume JSON for candidate {}: {e}", self.id);
                })
                .ok()
        });
        CandidateSummary {
            id: self.id,
            name: self.name,
            email: self.email,
            current_job_title: self.job_title,
            structured_resume,
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row of `analysis_cache`. `analysis_json` is an opaque serialized
/// `QualitativeResult`; job title and candidate name are denormalized for inspection.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnalysisCacheRow {
    pub id: i32,
    pub job_id: i32,
    pub candidate_id: i32,
    pub job_title: String,
    pub candidate_name: String,
    pub analysis_json: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

//! Read access to the job and candidate collaborators.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::candidate::CandidateRow;
use crate::models::job::JobRow;
use crate::models::{CandidateId, CandidateSummary, JobDescriptor, JobId};

/// Source of job and candidate records. Both lookups fail with
/// `AppError::NotFound` when the id does not exist.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn get_job(&self, job_id: JobId) -> Result<JobDescriptor, AppError>;
    async fn get_candidate(&self, candidate_id: CandidateId) -> Result<CandidateSummary, AppError>;

    /// Candidate ids, most recently created first. `limit` of `None` lists all.
    async fn list_candidate_ids(&self, limit: Option<usize>) -> Result<Vec<CandidateId>, AppError>;

    async fn count_candidates(&self) -> Result<u64, AppError>;
}

/// Postgres-backed record source over the `jobs`, `candidates` and `resumes` tables.
pub struct PgRecordSource {
    pool: PgPool,
}

impl PgRecordSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordSource for PgRecordSource {
    async fn get_job(&self, job_id: JobId) -> Result<JobDescriptor, AppError> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, title, description, competence_phare, job_type_etiquette
            FROM jobs
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job with ID {job_id} not found")))?;

        Ok(row.into())
    }

    async fn get_candidate(&self, candidate_id: CandidateId) -> Result<CandidateSummary, AppError> {
        let row = sqlx::query_as::<_, CandidateRow>(
            r#"
            SELECT c.id, c.name, c.email, c.job_title, r.resume_json
            FROM candidates c
            LEFT JOIN LATERAL (
                SELECT resume_json
                FROM resumes
                WHERE candidate_id = c.id
                ORDER BY created_at DESC NULLS LAST, id DESC
                LIMIT 1
            ) r ON TRUE
            WHERE c.id = $1
            "#,
        )
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Candidate with ID {candidate_id} not found")))?;

        Ok(row.into_summary())
    }

    async fn list_candidate_ids(&self, limit: Option<usize>) -> Result<Vec<CandidateId>, AppError> {
        let limit = limit.map(|l| l.min(i64::MAX as usize) as i64);
        let ids = sqlx::query_scalar::<_, CandidateId>(
            r#"
            SELECT id
            FROM candidates
            ORDER BY created_at DESC NULLS LAST, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn count_candidates(&self) -> Result<u64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM candidates")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }
}

//! Analysis cache: one stored qualitative assessment per (job, candidate) pair.
//!
//! The cache is best-effort. Read errors and undecodable entries are misses,
//! write errors are reported as `false` and logged, never raised.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info, warn};

use crate::matching::evaluator::QualitativeResult;
use crate::models::analysis::AnalysisCacheRow;
use crate::models::{CandidateId, JobId};

/// Storage behind the cache. `upsert` must replace the whole entry for an
/// existing (job_id, candidate_id) key in a single atomic statement.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn fetch(&self, job_id: JobId, candidate_id: CandidateId) -> Result<Option<AnalysisCacheRow>>;

    async fn upsert(
        &self,
        job_id: JobId,
        candidate_id: CandidateId,
        job_title: &str,
        candidate_name: &str,
        analysis_json: &str,
    ) -> Result<()>;

    /// Deletes entries matching every supplied filter. Returns the number removed.
    async fn delete(&self, job_id: Option<JobId>, candidate_id: Option<CandidateId>) -> Result<u64>;
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres store
// ────────────────────────────────────────────────────────────────────────────

pub struct PgAnalysisStore {
    pool: PgPool,
}

impl PgAnalysisStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnalysisStore for PgAnalysisStore {
    async fn fetch(&self, job_id: JobId, candidate_id: CandidateId) -> Result<Option<AnalysisCacheRow>> {
        sqlx::query_as::<_, AnalysisCacheRow>(
            r#"
            SELECT id, job_id, candidate_id, job_title, candidate_name, analysis_json,
                   created_at, updated_at
            FROM analysis_cache
            WHERE job_id = $1 AND candidate_id = $2
            "#,
        )
        .bind(job_id)
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to read analysis_cache")
    }

    async fn upsert(
        &self,
        job_id: JobId,
        candidate_id: CandidateId,
        job_title: &str,
        candidate_name: &str,
        analysis_json: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO analysis_cache (job_id, candidate_id, job_title, candidate_name, analysis_json)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (job_id, candidate_id) DO UPDATE
            SET job_title = EXCLUDED.job_title,
                candidate_name = EXCLUDED.candidate_name,
                analysis_json = EXCLUDED.analysis_json,
                updated_at = now()
            "#,
        )
        .bind(job_id)
        .bind(candidate_id)
        .bind(job_title)
        .bind(candidate_name)
        .bind(analysis_json)
        .execute(&self.pool)
        .await
        .context("Failed to upsert analysis_cache entry")?;
        Ok(())
    }

    async fn delete(&self, job_id: Option<JobId>, candidate_id: Option<CandidateId>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM analysis_cache
            WHERE ($1::INTEGER IS NULL OR job_id = $1)
              AND ($2::INTEGER IS NULL OR candidate_id = $2)
            "#,
        )
        .bind(job_id)
        .bind(candidate_id)
        .execute(&self.pool)
        .await
        .context("Failed to delete analysis_cache entries")?;
        Ok(result.rows_affected())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Cache facade
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AnalysisCache {
    store: Arc<dyn AnalysisStore>,
}

impl AnalysisCache {
    pub fn new(store: Arc<dyn AnalysisStore>) -> Self {
        Self { store }
    }

    /// Cached assessment for the pair, or `None` on a miss, a read error or
    /// an entry that no longer decodes.
    pub async fn get(&self, job_id: JobId, candidate_id: CandidateId) -> Option<QualitativeResult> {
        let row = match self.store.fetch(job_id, candidate_id).await {
            Ok(Some(row)) => row,
            Ok(None) => {
                debug!("Cache miss for job {job_id}, candidate {candidate_id}");
                return None;
            }
            Err(e) => {
                warn!("Cache read failed for job {job_id}, candidate {candidate_id}: {e:#}");
                return None;
            }
        };

        match serde_json::from_str::<QualitativeResult>(&row.analysis_json) {
            Ok(result) => {
                info!("Cache hit for job {job_id}, candidate {candidate_id}");
                Some(result)
            }
            Err(e) => {
                warn!("Malformed cached analysis for job {job_id}, candidate {candidate_id}, recomputing: {e}");
                None
            }
        }
    }

    /// Stores (or fully replaces) the assessment for the pair.
    pub async fn put(
        &self,
        job_id: JobId,
        candidate_id: CandidateId,
        job_title: &str,
        candidate_name: &str,
        result: &QualitativeResult,
    ) -> bool {
        let analysis_json = match serde_json::to_string(result) {
            Ok(json) => json,
            Err(e) => {
                warn!("Could not serialize analysis for candidate {candidate_id}: {e}");
                return false;
            }
        };

        match self
            .store
            .upsert(job_id, candidate_id, job_title, candidate_name, &analysis_json)
            .await
        {
            Ok(()) => {
                debug!("Cached analysis for job {job_id}, candidate {candidate_id}");
                true
            }
            Err(e) => {
                warn!("Cache write failed for job {job_id}, candidate {candidate_id}: {e:#}");
                false
            }
        }
    }

    /// Deletes the entries matching the supplied filters. A call with neither
    /// filter is rejected and deletes nothing.
    pub async fn invalidate(&self, job_id: Option<JobId>, candidate_id: Option<CandidateId>) -> bool {
        if job_id.is_none() && candidate_id.is_none() {
            warn!("Refusing unscoped analysis cache invalidation");
            return false;
        }

        match self.store.delete(job_id, candidate_id).await {
            Ok(removed) => {
                info!("Invalidated {removed} cached analyses (job {job_id:?}, candidate {candidate_id:?})");
                true
            }
            Err(e) => {
                warn!("Cache invalidation failed: {e:#}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::evaluator::parse_evaluation;
    use crate::matching::testing::{evaluation_json, MemoryAnalysisStore};

    fn sample_result(skills: f64) -> QualitativeResult {
        parse_evaluation(&evaluation_json(skills, 70.0, 60.0, 1, 1), "a@example.com").unwrap()
    }

    fn cache() -> (AnalysisCache, Arc<MemoryAnalysisStore>) {
        let store = Arc::new(MemoryAnalysisStore::new());
        (AnalysisCache::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_miss_returns_none() {
        let (cache, _) = cache();
        assert!(cache.get(1, 2).await.is_none());
    }

    #[tokio::test]
    async fn test_put_then_get_recomputes_same_scores() {
        let (cache, _) = cache();
        let result = sample_result(90.0);
        assert!(cache.put(1, 2, "DevOps", "Ada", &result).await);

        let cached = cache.get(1, 2).await.unwrap();
        assert_eq!(cached, result);
        assert_eq!(cached.clone().readjusted().adjusted_scores(), result.adjusted_scores());
    }

    #[tokio::test]
    async fn test_put_overwrites_existing_entry() {
        let (cache, store) = cache();
        assert!(cache.put(1, 2, "Old title", "Ada", &sample_result(90.0)).await);
        assert!(cache.put(1, 2, "New title", "Ada L.", &sample_result(50.0)).await);

        assert_eq!(store.len(), 1);
        let row = store.row(1, 2).unwrap();
        assert_eq!(row.job_title, "New title");
        assert_eq!(row.candidate_name, "Ada L.");
        assert_eq!(cache.get(1, 2).await.unwrap().raw_scores.skills, 50.0);
    }

    #[tokio::test]
    async fn test_write_failure_returns_false_and_keeps_prior_state() {
        let (cache, store) = cache();
        assert!(cache.put(1, 2, "DevOps", "Ada", &sample_result(90.0)).await);
        store.fail_writes(true);
        assert!(!cache.put(1, 2, "DevOps", "Ada", &sample_result(10.0)).await);
        assert_eq!(cache.get(1, 2).await.unwrap().raw_scores.skills, 90.0);
    }

    #[tokio::test]
    async fn test_malformed_entry_is_a_miss() {
        let (cache, store) = cache();
        store.insert_raw(1, 2, "{not json");
        assert!(cache.get(1, 2).await.is_none());
    }

    #[tokio::test]
    async fn test_unscoped_invalidate_is_rejected() {
        let (cache, _) = cache();
        assert!(cache.put(1, 2, "DevOps", "Ada", &sample_result(90.0)).await);
        assert!(!cache.invalidate(None, None).await);
        assert!(cache.get(1, 2).await.is_some());
    }

    #[tokio::test]
    async fn test_scoped_invalidate() {
        let (cache, store) = cache();
        for (job, candidate) in [(1, 2), (1, 3), (2, 2)] {
            assert!(cache.put(job, candidate, "t", "n", &sample_result(80.0)).await);
        }

        assert!(cache.invalidate(Some(1), Some(2)).await);
        assert!(cache.get(1, 2).await.is_none());
        assert_eq!(store.len(), 2);

        assert!(cache.invalidate(None, Some(2)).await);
        assert!(cache.get(2, 2).await.is_none());
        assert!(cache.get(1, 3).await.is_some());

        assert!(cache.invalidate(Some(1), None).await);
        assert_eq!(store.len(), 0);
    }
}

//! Candidate indexer: keeps the search index in step with the candidate records.
//!
//! Bulk reindexing makes one pass over the requested ids, then retries the
//! candidates that failed on a search-backend error with the configured
//! backoff. Records that no longer exist are reported as failed without retry.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::records::RecordSource;
use crate::models::CandidateId;
use crate::retry::RetryPolicy;
use crate::search::document::CandidateDocument;
use crate::search::SearchEngine;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReindexSummary {
    pub requested: usize,
    pub indexed: usize,
    pub failed: Vec<CandidateId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Synced,
    OutOfSync,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStatus {
    pub search_available: bool,
    pub indexed_candidates: u64,
    pub database_candidates: u64,
    pub missing_count: u64,
    pub sync_status: SyncStatus,
}

#[derive(Clone)]
pub struct CandidateIndexer {
    records: Arc<dyn RecordSource>,
    engine: Arc<dyn SearchEngine>,
    retry: RetryPolicy,
}

impl CandidateIndexer {
    pub fn new(records: Arc<dyn RecordSource>, engine: Arc<dyn SearchEngine>, retry: RetryPolicy) -> Self {
        Self {
            records,
            engine,
            retry,
        }
    }

    /// Rebuilds one candidate's document from its record and latest resume.
    pub async fn index_one(&self, candidate_id: CandidateId) -> Result<CandidateDocument, AppError> {
        let candidate = self.records.get_candidate(candidate_id).await?;
        let document = CandidateDocument::from_candidate(&candidate);

        self.engine
            .index_candidate(&document)
            .await
            .map_err(|e| AppError::Search(e.to_string()))?;

        info!(
            "Indexed candidate {candidate_id} ({} skills, {} experiences)",
            document.hard_skills.len(),
            document.experiences.len()
        );
        Ok(document)
    }

    /// Indexes the `limit` most recent candidates, or all of them when `None`.
    pub async fn reindex(&self, limit: Option<usize>) -> Result<ReindexSummary, AppError> {
        let ids = self.records.list_candidate_ids(limit).await?;
        info!("Reindexing {} candidates", ids.len());

        let mut indexed = 0;
        let mut failed = Vec::new();
        let mut pending = Vec::new();

        for id in &ids {
            match self.index_one(*id).await {
                Ok(_) => indexed += 1,
                Err(AppError::NotFound(_)) => failed.push(*id),
                Err(e) => {
                    warn!("Indexing candidate {id} failed: {e}");
                    pending.push(*id);
                }
            }
        }

        for attempt in 1..self.retry.max_attempts {
            if pending.is_empty() {
                break;
            }
            self.retry.wait(attempt).await;
            info!("Retrying {} failed candidates (retry {attempt})", pending.len());

            let mut still_failing = Vec::new();
            for id in pending {
                match self.index_one(id).await {
                    Ok(_) => indexed += 1,
                    Err(e) => {
                        warn!("Retry for candidate {id} failed: {e}");
                        still_failing.push(id);
                    }
                }
            }
            pending = still_failing;
        }
        failed.extend(pending);

        if failed.is_empty() {
            info!("Reindexed {indexed} candidates");
        } else {
            warn!("Reindexed {indexed} candidates, {} failed: {failed:?}", failed.len());
        }

        Ok(ReindexSummary {
            requested: ids.len(),
            indexed,
            failed,
        })
    }

    /// Indexed document count against the candidate records.
    pub async fn status(&self) -> Result<IndexStatus, AppError> {
        let database_candidates = self.records.count_candidates().await?;

        let status = match self.engine.document_count().await {
            Ok(indexed_candidates) => IndexStatus {
                search_available: true,
                indexed_candidates,
                database_candidates,
                missing_count: database_candidates.saturating_sub(indexed_candidates),
                sync_status: if indexed_candidates == database_candidates {
                    SyncStatus::Synced
                } else {
                    SyncStatus::OutOfSync
                },
            },
            Err(e) => {
                warn!("Search backend unavailable for status check: {e}");
                IndexStatus {
                    search_available: false,
                    indexed_candidates: 0,
                    database_candidates,
                    missing_count: database_candidates,
                    sync_status: SyncStatus::Unavailable,
                }
            }
        };
        Ok(status)
    }
}

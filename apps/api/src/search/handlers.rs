//! Axum route handlers for candidate search and indexing.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{CandidateId, JobId};
use crate::search::indexer::{IndexStatus, ReindexSummary};
use crate::search::scorer::RelevanceResult;
use crate::state::AppState;

const MAX_SUGGESTIONS: usize = 50;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SuggestParams {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_min_score")]
    pub min_score: f64,
}

fn default_limit() -> usize {
    10
}

fn default_min_score() -> f64 {
    0.5
}

#[derive(Debug, Serialize)]
pub struct SuggestResponse {
    pub job_id: JobId,
    pub suggested_candidates: Vec<RelevanceResult>,
}

#[derive(Debug, Deserialize)]
pub struct ReindexParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub candidate_id: CandidateId,
    pub indexed: bool,
    pub skills: usize,
    pub experiences: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/jobs/:job_id/suggest-candidates
///
/// Relevance-only suggestions, no qualitative evaluation. An unavailable
/// search backend yields an empty list.
pub async fn handle_suggest_candidates(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
    Query(params): Query<SuggestParams>,
) -> Result<Json<SuggestResponse>, AppError> {
    if !(1..=MAX_SUGGESTIONS).contains(&params.limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {MAX_SUGGESTIONS}"
        )));
    }
    if !(0.1..=1.0).contains(&params.min_score) {
        return Err(AppError::Validation(
            "min_score must be between 0.1 and 1.0".to_string(),
        ));
    }

    let job = state.records.get_job(job_id).await?;
    let suggested_candidates = state
        .scorer
        .find_candidates(&job, params.limit, params.min_score)
        .await;

    Ok(Json(SuggestResponse {
        job_id,
        suggested_candidates,
    }))
}

/// POST /api/v1/candidates/:id/index
///
/// Rebuilds the candidate's search document from its record and latest resume.
pub async fn handle_index_candidate(
    State(state): State<AppState>,
    Path(candidate_id): Path<CandidateId>,
) -> Result<Json<IndexResponse>, AppError> {
    let document = state.indexer.index_one(candidate_id).await?;

    Ok(Json(IndexResponse {
        candidate_id,
        indexed: true,
        skills: document.hard_skills.len(),
        experiences: document.experiences.len(),
    }))
}

/// POST /api/v1/search/reindex?limit=
///
/// Reindexes the `limit` most recent candidates, or every candidate when no
/// limit is given.
pub async fn handle_reindex(
    State(state): State<AppState>,
    Query(params): Query<ReindexParams>,
) -> Result<Json<ReindexSummary>, AppError> {
    if params.limit == Some(0) {
        return Err(AppError::Validation("limit must be at least 1".to_string()));
    }
    let summary = state.indexer.reindex(params.limit).await?;
    Ok(Json(summary))
}

/// GET /api/v1/search/status
pub async fn handle_index_status(State(state): State<AppState>) -> Result<Json<IndexStatus>, AppError> {
    Ok(Json(state.indexer.status().await?))
}

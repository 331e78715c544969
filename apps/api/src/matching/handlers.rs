//! Axum route handlers for the Matching API.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::matching::combiner::CombinationStrategy;
use crate::matching::orchestrator::{CandidateSelection, MatchOptions, MatchReport};
use crate::models::{CandidateId, JobId};
use crate::state::AppState;

const MAX_LIMIT: usize = 50;
const AUTO_KEYWORD: &str = "auto";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// `[1, 2, 3]`, `"auto"` or `["auto"]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CandidateIds {
    Ids(Vec<CandidateId>),
    Keyword(String),
    Keywords(Vec<String>),
}

impl CandidateIds {
    fn into_selection(self) -> Result<CandidateSelection, AppError> {
        match self {
            CandidateIds::Ids(ids) => Ok(CandidateSelection::from_ids(ids)),
            CandidateIds::Keyword(k) if k.eq_ignore_ascii_case(AUTO_KEYWORD) => {
                Ok(CandidateSelection::Auto)
            }
            CandidateIds::Keywords(k)
                if k.len() == 1 && k[0].eq_ignore_ascii_case(AUTO_KEYWORD) =>
            {
                Ok(CandidateSelection::Auto)
            }
            _ => Err(AppError::Validation(
                "candidate_ids must be a list of ids or \"auto\"".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub candidate_ids: CandidateIds,
    pub limit: Option<usize>,
    pub min_score: Option<f64>,
    pub strategy: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AutoParams {
    pub limit: Option<usize>,
    pub min_score: Option<f64>,
    pub strategy: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InvalidateParams {
    pub job_id: Option<JobId>,
    pub candidate_id: Option<CandidateId>,
}

#[derive(Debug, Serialize)]
pub struct InvalidateResponse {
    pub invalidated: bool,
    pub job_id: Option<JobId>,
    pub candidate_id: Option<CandidateId>,
}

fn build_options(
    limit: Option<usize>,
    min_score: Option<f64>,
    strategy: Option<&str>,
) -> Result<MatchOptions, AppError> {
    let defaults = MatchOptions::default();
    let limit = limit.unwrap_or(defaults.limit);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        )));
    }
    let min_score = min_score.unwrap_or(defaults.min_score);
    if !(0.0..=1.0).contains(&min_score) {
        return Err(AppError::Validation(
            "min_score must be between 0.0 and 1.0".to_string(),
        ));
    }
    let strategy = strategy
        .map(|label| {
            CombinationStrategy::from_label(label).ok_or_else(|| {
                AppError::Validation(format!(
                    "strategy must be 'two_factor' or 'three_factor', got '{label}'"
                ))
            })
        })
        .transpose()?;

    Ok(MatchOptions {
        limit,
        min_score,
        strategy,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/jobs/:job_id/match
///
/// Evaluates explicit candidates, or the search engine's suggestions when
/// `candidate_ids` is "auto" or empty. Always returns a report for a known job.
pub async fn handle_match(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<MatchReport>, AppError> {
    let selection = request.candidate_ids.into_selection()?;
    let options = build_options(request.limit, request.min_score, request.strategy.as_deref())?;

    let report = state
        .orchestrator
        .run_match(job_id, selection, options)
        .await?;

    Ok(Json(report))
}

/// POST /api/v1/jobs/:job_id/analyze-auto
///
/// Shorthand for a match run in auto mode.
pub async fn handle_analyze_auto(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
    Query(params): Query<AutoParams>,
) -> Result<Json<MatchReport>, AppError> {
    let options = build_options(params.limit, params.min_score, params.strategy.as_deref())?;

    let report = state
        .orchestrator
        .run_match(job_id, CandidateSelection::Auto, options)
        .await?;

    Ok(Json(report))
}

/// DELETE /api/v1/jobs/:job_id/cache/:candidate_id
pub async fn handle_invalidate_pair(
    State(state): State<AppState>,
    Path((job_id, candidate_id)): Path<(JobId, CandidateId)>,
) -> Result<Json<InvalidateResponse>, AppError> {
    invalidate(&state, Some(job_id), Some(candidate_id)).await
}

/// DELETE /api/v1/analysis-cache?job_id=&candidate_id=
///
/// At least one filter is required; wiping the whole cache is not allowed.
pub async fn handle_invalidate(
    State(state): State<AppState>,
    Query(params): Query<InvalidateParams>,
) -> Result<Json<InvalidateResponse>, AppError> {
    if params.job_id.is_none() && params.candidate_id.is_none() {
        return Err(AppError::Validation(
            "job_id or candidate_id is required to invalidate cached analyses".to_string(),
        ));
    }
    invalidate(&state, params.job_id, params.candidate_id).await
}

async fn invalidate(
    state: &AppState,
    job_id: Option<JobId>,
    candidate_id: Option<CandidateId>,
) -> Result<Json<InvalidateResponse>, AppError> {
    if !state.cache.invalidate(job_id, candidate_id).await {
        return Err(AppError::Internal(anyhow::anyhow!(
            "analysis cache invalidation failed"
        )));
    }
    Ok(Json(InvalidateResponse {
        invalidated: true,
        job_id,
        candidate_id,
    }))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(value: serde_json::Value) -> Result<CandidateSelection, AppError> {
        serde_json::from_value::<CandidateIds>(value)
            .unwrap()
            .into_selection()
    }

    #[test]
    fn test_candidate_ids_forms() {
        assert_eq!(parse(json!([1, 2])).unwrap(), CandidateSelection::Explicit(vec![1, 2]));
        assert_eq!(parse(json!([])).unwrap(), CandidateSelection::Auto);
        assert_eq!(parse(json!("auto")).unwrap(), CandidateSelection::Auto);
        assert_eq!(parse(json!(["auto"])).unwrap(), CandidateSelection::Auto);
        assert!(parse(json!("everyone")).is_err());
    }

    #[test]
    fn test_build_options_validates() {
        let options = build_options(None, None, Some("three_factor")).unwrap();
        assert_eq!(options.limit, 5);
        assert_eq!(options.strategy, Some(CombinationStrategy::ThreeFactor));

        assert!(build_options(Some(0), None, None).is_err());
        assert!(build_options(Some(51), None, None).is_err());
        assert!(build_options(None, Some(1.5), None).is_err());
        assert!(build_options(None, None, Some("weighted")).is_err());
    }
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::CandidateId;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// Only request-level failures use this type; per-candidate failures are `MatchError`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Search(msg) => {
                tracing::error!("Search error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "SEARCH_ERROR",
                    "The search backend could not complete the request".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

/// Per-candidate failure taxonomy. These never abort a batch: the orchestrator
/// records them as failed entries and moves on to the next candidate.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MatchError {
    #[error("Candidate with ID {0} not found")]
    CandidateNotFound(CandidateId),

    #[error("No resume data for candidate ID {0}")]
    NoResumeData(CandidateId),

    #[error("Evaluation failed for candidate {candidate_id}: {reason}")]
    EvaluationFailed {
        candidate_id: CandidateId,
        reason: String,
    },

    #[error("Could not load candidate {candidate_id}: {reason}")]
    Lookup {
        candidate_id: CandidateId,
        reason: String,
    },
}

impl MatchError {
    pub fn evaluation(candidate_id: CandidateId, reason: impl Into<String>) -> Self {
        MatchError::EvaluationFailed {
            candidate_id,
            reason: reason.into(),
        }
    }
}

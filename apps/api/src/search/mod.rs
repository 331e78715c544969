// Candidate search: term extraction, the relevance query descriptor, the
// engines that execute it, and the relevance scorer built on top.

pub mod document;
pub mod elastic;
pub mod handlers;
pub mod indexer;
pub mod memory;
pub mod query;
pub mod scorer;
pub mod terms;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::CandidateId;
use crate::search::document::CandidateDocument;
use crate::search::query::RelevanceQuery;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Search backend error (status {status}): {message}")]
    Backend { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Search backend unavailable: {0}")]
    Unavailable(String),
}

/// One scored hit. `score` is the engine's raw relevance score.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: CandidateId,
    pub score: f64,
    pub document: CandidateDocument,
}

/// A full-text search backend over candidate documents with nested scoring
/// for repeated sub-entities (skills, experiences).
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Creates the candidate index when it does not exist yet.
    async fn ensure_index(&self) -> Result<(), SearchError>;

    /// Runs a relevance query. Hits come back ordered by score, highest first.
    async fn query(&self, query: &RelevanceQuery) -> Result<Vec<SearchHit>, SearchError>;

    /// Inserts or replaces one candidate document.
    async fn index_candidate(&self, document: &CandidateDocument) -> Result<(), SearchError>;

    /// Number of indexed candidate documents. A missing index counts as empty.
    async fn document_count(&self) -> Result<u64, SearchError>;
}

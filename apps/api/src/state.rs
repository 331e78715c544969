use std::sync::Arc;

use crate::config::Config;
use crate::matching::cache::AnalysisCache;
use crate::matching::orchestrator::MatchingOrchestrator;
use crate::models::records::RecordSource;
use crate::search::indexer::CandidateIndexer;
use crate::search::scorer::SearchRelevanceScorer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Job and candidate lookups. Postgres in production, in-memory in tests.
    pub records: Arc<dyn RecordSource>,
    pub scorer: SearchRelevanceScorer,
    pub indexer: CandidateIndexer,
    pub cache: AnalysisCache,
    pub orchestrator: Arc<MatchingOrchestrator>,
}

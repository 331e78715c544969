pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::matching::handlers as matching;
use crate::search::handlers as search;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Search API
        .route(
            "/api/v1/jobs/:job_id/suggest-candidates",
            post(search::handle_suggest_candidates),
        )
        .route(
            "/api/v1/candidates/:candidate_id/index",
            post(search::handle_index_candidate),
        )
        .route("/api/v1/search/reindex", post(search::handle_reindex))
        .route("/api/v1/search/status", get(search::handle_index_status))
        // Matching API
        .route("/api/v1/jobs/:job_id/match", post(matching::handle_match))
        .route(
            "/api/v1/jobs/:job_id/analyze-auto",
            post(matching::handle_analyze_auto),
        )
        .route(
            "/api/v1/jobs/:job_id/cache/:candidate_id",
            delete(matching::handle_invalidate_pair),
        )
        .route("/api/v1/analysis-cache", delete(matching::handle_invalidate))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::matching::cache::AnalysisCache;
    use crate::matching::combiner::CombinationStrategy;
    use crate::matching::evaluator::QualitativeEvaluator;
    use crate::matching::orchestrator::MatchingOrchestrator;
    use crate::matching::testing::{
        evaluation_json, sample_candidate, sample_job, MemoryAnalysisStore, MemoryRecords,
        ScriptedReasoning,
    };
    use crate::models::records::RecordSource;
    use crate::retry::RetryPolicy;
    use crate::search::indexer::CandidateIndexer;
    use crate::search::memory::InMemorySearchEngine;
    use crate::search::scorer::SearchRelevanceScorer;

    fn test_config() -> Config {
        Config {
            database_url: "postgres://localhost/matcher_test".to_string(),
            anthropic_api_key: "test-key".to_string(),
            search_url: None,
            search_index: "candidates".to_string(),
            search_username: None,
            search_password: None,
            search_timeout: Duration::from_secs(30),
            evaluation_timeout: Duration::from_secs(60),
            relevance_floor: 0.1,
            combination_strategy: CombinationStrategy::TwoFactor,
            retry: RetryPolicy::new(1, Duration::from_millis(1)),
            port: 0,
            rust_log: "info".to_string(),
        }
    }

    fn test_router() -> (Router, Arc<MemoryAnalysisStore>) {
        let config = test_config();
        let records: Arc<dyn RecordSource> = Arc::new(
            MemoryRecords::new()
                .with_job(sample_job())
                .with_candidate(sample_candidate(2))
                .with_candidate(sample_candidate(3)),
        );
        let engine = Arc::new(InMemorySearchEngine::new());
        let scorer = SearchRelevanceScorer::new(engine.clone(), config.search_timeout, config.relevance_floor);
        let indexer = CandidateIndexer::new(records.clone(), engine, config.retry);
        let store = Arc::new(MemoryAnalysisStore::new());
        let cache = AnalysisCache::new(store.clone());
        let evaluator = QualitativeEvaluator::new(
            Arc::new(ScriptedReasoning::always(evaluation_json(80.0, 70.0, 60.0, 0, 0))),
            config.evaluation_timeout,
        );
        let orchestrator = Arc::new(MatchingOrchestrator::new(
            records.clone(),
            scorer.clone(),
            evaluator,
            cache.clone(),
            config.combination_strategy,
        ));

        let state = AppState {
            config,
            records,
            scorer,
            indexer,
            cache,
            orchestrator,
        };
        (build_router(state), store)
    }

    async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (router, _) = test_router();
        let (status, body) = send(&router, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "matcher-api");
        assert_eq!(body["combination_strategy"], "two_factor");
        assert_eq!(body["search_backend"], "in_memory");
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let (router, _) = test_router();
        let (status, body) = send(
            &router,
            Method::POST,
            "/api/v1/jobs/99/match",
            Some(json!({"candidate_ids": [2]})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_match_reports_success_and_failure() {
        let (router, store) = test_router();
        let (status, body) = send(
            &router,
            Method::POST,
            "/api/v1/jobs/1/match",
            Some(json!({"candidate_ids": [2, 404], "strategy": "three_factor"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_analyzed"], 2);
        assert_eq!(body["search_method"], "manual");
        assert_eq!(body["strategy"], "three_factor");
        assert_eq!(body["analyses"][0]["status"], "success");
        assert_eq!(body["analyses"][0]["candidate_id"], 2);
        assert_eq!(body["analyses"][1]["status"], "failed");
        assert_eq!(body["analyses"][1]["candidate_id"], 404);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_match_rejects_bad_strategy() {
        let (router, _) = test_router();
        let (status, body) = send(
            &router,
            Method::POST,
            "/api/v1/jobs/1/match",
            Some(json!({"candidate_ids": "auto", "strategy": "weighted"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_index_then_analyze_auto() {
        let (router, _) = test_router();
        let (status, body) = send(&router, Method::POST, "/api/v1/candidates/3/index", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["indexed"], true);

        let (status, body) = send(
            &router,
            Method::POST,
            "/api/v1/jobs/1/suggest-candidates?limit=5&min_score=0.5",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["suggested_candidates"][0]["candidate_id"], 3);

        let (status, body) = send(&router, Method::POST, "/api/v1/jobs/1/analyze-auto?limit=5", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["search_method"], "auto");
        assert_eq!(body["analyses"][0]["candidate_id"], 3);
        assert_eq!(body["analyses"][0]["source"], "search_suggestion");
    }

    #[tokio::test]
    async fn test_cache_invalidation_routes() {
        let (router, store) = test_router();
        send(
            &router,
            Method::POST,
            "/api/v1/jobs/1/match",
            Some(json!({"candidate_ids": [2, 3]})),
        )
        .await;
        assert_eq!(store.len(), 2);

        let (status, _) = send(&router, Method::DELETE, "/api/v1/analysis-cache", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(store.len(), 2);

        let (status, body) = send(&router, Method::DELETE, "/api/v1/jobs/1/cache/2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["invalidated"], true);
        assert_eq!(store.len(), 1);

        let (status, _) = send(&router, Method::DELETE, "/api/v1/analysis-cache?job_id=1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_reindex_fills_empty_index() {
        let (router, _) = test_router();
        let (status, body) = send(&router, Method::GET, "/api/v1/search/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["indexed_candidates"], 0);
        assert_eq!(body["database_candidates"], 2);
        assert_eq!(body["sync_status"], "out_of_sync");

        let (status, body) = send(&router, Method::POST, "/api/v1/search/reindex?limit=1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["requested"], 1);
        assert_eq!(body["indexed"], 1);
        assert_eq!(body["failed"], json!([]));

        let (_, body) = send(&router, Method::GET, "/api/v1/search/status", None).await;
        assert_eq!(body["indexed_candidates"], 1);
        assert_eq!(body["missing_count"], 1);

        let (status, body) = send(&router, Method::POST, "/api/v1/search/reindex", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["indexed"], 2);

        let (_, body) = send(&router, Method::GET, "/api/v1/search/status", None).await;
        assert_eq!(body["sync_status"], "synced");
        assert_eq!(body["search_available"], true);
    }

    #[tokio::test]
    async fn test_reindex_rejects_zero_limit() {
        let (router, _) = test_router();
        let (status, _) = send(&router, Method::POST, "/api/v1/search/reindex?limit=0", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

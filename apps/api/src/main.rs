mod config;
mod db;
mod errors;
mod llm_client;
mod matching;
mod models;
mod retry;
mod routes;
mod search;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, ensure_schema};
use crate::llm_client::LlmClient;
use crate::matching::cache::{AnalysisCache, PgAnalysisStore};
use crate::matching::evaluator::QualitativeEvaluator;
use crate::matching::orchestrator::MatchingOrchestrator;
use crate::models::records::{PgRecordSource, RecordSource};
use crate::routes::build_router;
use crate::search::elastic::ElasticsearchEngine;
use crate::search::indexer::CandidateIndexer;
use crate::search::memory::InMemorySearchEngine;
use crate::search::scorer::SearchRelevanceScorer;
use crate::search::SearchEngine;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Matcher API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    ensure_schema(&db).await?;

    // Initialize search backend
    let engine = build_search_engine(&config)?;
    if let Err(e) = engine.ensure_index().await {
        warn!("Search index not ready, relevance will fall back to the floor: {e}");
    }

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone(), config.retry)?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let records: Arc<dyn RecordSource> = Arc::new(PgRecordSource::new(db.clone()));
    let scorer = SearchRelevanceScorer::new(engine.clone(), config.search_timeout, config.relevance_floor);
    let indexer = CandidateIndexer::new(records.clone(), engine, config.retry);

    // The in-process index starts empty on every boot
    if config.search_url.is_none() {
        match indexer.reindex(None).await {
            Ok(summary) => info!(
                "In-process index loaded: {} of {} candidates",
                summary.indexed, summary.requested
            ),
            Err(e) => warn!("Could not load candidates into the in-process index: {e}"),
        }
    }

    let cache = AnalysisCache::new(Arc::new(PgAnalysisStore::new(db)));
    let evaluator = QualitativeEvaluator::new(Arc::new(llm), config.evaluation_timeout);
    let orchestrator = Arc::new(MatchingOrchestrator::new(
        records.clone(),
        scorer.clone(),
        evaluator,
        cache.clone(),
        config.combination_strategy,
    ));
    info!(
        "Combination strategy: {}",
        config.combination_strategy.label()
    );

    // Build app state
    let state = AppState {
        config: config.clone(),
        records,
        scorer,
        indexer,
        cache,
        orchestrator,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Elasticsearch when `SEARCH_URL` is set, otherwise the in-process index.
fn build_search_engine(config: &Config) -> Result<Arc<dyn SearchEngine>> {
    match &config.search_url {
        Some(url) => {
            info!("Search backend: Elasticsearch at {url} (index: {})", config.search_index);
            let engine = ElasticsearchEngine::new(
                url,
                &config.search_index,
                config.search_username.clone(),
                config.search_password.clone(),
                config.retry,
            )?;
            Ok(Arc::new(engine))
        }
        None => {
            warn!("SEARCH_URL not set, using the in-process candidate index");
            Ok(Arc::new(InMemorySearchEngine::new()))
        }
    }
}

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version and the active scoring setup.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "matcher-api",
        "combination_strategy": state.config.combination_strategy.label(),
        "search_backend": if state.config.search_url.is_some() { "elasticsearch" } else { "in_memory" }
    }))
}

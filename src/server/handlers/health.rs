use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let stats = state.service.stats();
    Ok(Json(json!({
        "initialized": true,
        "store": stats,
        "embedding_provider": state.embedder.name(),
        "index_path": state.service.store().index_path(),
        "metadata_path": state.service.store().metadata_path(),
        "relevance_floor": state.settings.retrieval.relevance_floor,
    })))
}

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn reset(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    state.service.reset()?;
    tracing::warn!("Vector store reset via admin endpoint");
    Ok(Json(json!({ "status": "reset", "store": state.service.stats() })))
}

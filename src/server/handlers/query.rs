use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::core::errors::ApiError;
use crate::rag::QueryRequest;
use crate::state::AppState;

pub async fn query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(min_score) = payload.min_score {
        if !min_score.is_finite() {
            return Err(ApiError::BadRequest(
                "min_score must be a finite number".to_string(),
            ));
        }
    }

    let outcome = state.service.query(payload).await?;
    Ok(Json(outcome))
}

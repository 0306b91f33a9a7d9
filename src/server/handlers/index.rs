use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::core::errors::ApiError;
use crate::rag::{DocumentLoader, SourceDocument};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IndexRequest {
    #[serde(default)]
    pub documents: Vec<SourceDocument>,
}

pub async fn index_documents(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<IndexRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.documents.is_empty() {
        return Err(ApiError::BadRequest("No documents provided".to_string()));
    }

    let report = state.service.ingest_batch(&payload.documents).await;
    Ok(Json(report))
}

/// Ingest every document in the configured documents folder.
pub async fn index_folder(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let loader = DocumentLoader::new(
        state.settings.documents_dir.clone(),
        state.settings.document_extensions.clone(),
    );
    let documents = loader.load()?;

    let report = state.service.ingest_batch(&documents).await;
    Ok(Json(report))
}

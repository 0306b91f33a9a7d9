use std::sync::Arc;

use crate::core::config::{AppPaths, AppSettings, ConfigService, EmbeddingBackend};
use crate::embedding::{EmbeddingProvider, HashingEmbeddingProvider, HttpEmbeddingProvider};
use crate::rag::{ChunkSplitter, SearchService, SearchServiceConfig, VectorStore};

pub mod error;

use error::InitializationError;

/// Application state shared across all routes.
///
/// Owns the single process-wide vector store; every consumer reaches it
/// through `service`.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: Arc<AppSettings>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub service: Arc<SearchService>,
}

impl AppState {
    /// Initializes the application state:
    /// 1. Loading and validating configuration
    /// 2. Building the embedding provider
    /// 3. Opening (and locking) the vector store
    pub async fn initialize_with_paths(paths: AppPaths) -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(paths);
        let config = ConfigService::new(paths.clone());
        let raw_config = config
            .load_config()
            .map_err(|e| InitializationError::Config(e.into()))?;
        let settings = Arc::new(AppSettings::from_config(&raw_config, &paths));

        let embedder = build_embedder(&settings)?;

        let splitter = ChunkSplitter::new(settings.chunking.max_words, settings.chunking.overlap)
            .map_err(|e| InitializationError::Config(e.into()))?;

        let store = Arc::new(
            VectorStore::open(settings.store.clone())
                .map_err(|e| InitializationError::Store(e.into()))?,
        );

        let service = Arc::new(SearchService::new(
            store,
            embedder.clone(),
            splitter,
            SearchServiceConfig {
                default_top_k: settings.retrieval.default_top_k,
                max_top_k: settings.retrieval.max_top_k,
                export_dir: settings.export_dir.clone(),
                retrieval: settings.retrieval_config(),
                answer: settings.answer.clone(),
            },
        ));

        tracing::info!(
            "Search service ready ({} embeddings, {} vectors stored)",
            embedder.name(),
            service.stats().vectors
        );

        Ok(Arc::new(AppState {
            paths,
            config,
            settings,
            embedder,
            service,
        }))
    }
}

fn build_embedder(settings: &AppSettings) -> Result<Arc<dyn EmbeddingProvider>, InitializationError> {
    let dimension = settings.store.dimension;
    match settings.embedding.backend {
        EmbeddingBackend::Http => {
            let provider = HttpEmbeddingProvider::new(
                &settings.embedding.base_url,
                &settings.embedding.model,
                dimension,
                settings.embedding.timeout,
            )
            .map_err(|e| InitializationError::Embedding(e.into()))?;
            Ok(Arc::new(provider))
        }
        EmbeddingBackend::Hashing => Ok(Arc::new(HashingEmbeddingProvider::new(dimension))),
    }
}

//! SearchService: ingestion and query orchestration over one store.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::answer::{AnswerComposer, AnswerConfig, Citation, TRIAGE_RESPONSE};
use super::chunker::ChunkSplitter;
use super::error::StoreError;
use super::export::export_citations;
use super::metadata::MetadataRecord;
use super::retrieval::{Retrieval, RetrievalConfig, RetrievalPipeline};
use super::store::{StoreStats, VectorStore};
use crate::embedding::EmbeddingProvider;

pub const NO_DOCUMENTS_MESSAGE: &str = "📝 No relevant documents found.";
pub const INSUFFICIENT_RELEVANCE_MESSAGE: &str =
    "📝 No relevant documents found with sufficient relevance.";
pub const EMPTY_QUERY_MESSAGE: &str = "❌ Query is empty.";

const EMPTY_CONTENT_REASON: &str = "Empty content";
const NO_EMBEDDINGS_REASON: &str = "No embeddings generated";

#[derive(Debug, Clone)]
pub struct SearchServiceConfig {
    pub default_top_k: usize,
    pub max_top_k: usize,
    pub export_dir: PathBuf,
    pub retrieval: RetrievalConfig,
    pub answer: AnswerConfig,
}

/// Raw document text keyed by its source identifier (URL or file name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    #[serde(alias = "url")]
    pub source_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub source_id: String,
    pub chunks_indexed: usize,
    pub chunks_failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedSource {
    pub source_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchIngestReport {
    pub indexed: Vec<String>,
    pub failed: Vec<FailedSource>,
    pub completed_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub min_score: Option<f32>,
    #[serde(default)]
    pub save_to_csv: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryOutcome {
    Answered {
        query: String,
        top_k: usize,
        min_score: Option<f32>,
        summary: String,
        citations: Vec<Citation>,
        csv_path: Option<String>,
    },
    EmptyQuery {
        message: String,
    },
    Triaged {
        message: String,
    },
    NoResults {
        message: String,
    },
    InsufficientRelevance {
        message: String,
        best_score: f32,
    },
    EmbeddingFailed {
        message: String,
    },
}

pub struct SearchService {
    store: Arc<VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    splitter: ChunkSplitter,
    pipeline: RetrievalPipeline,
    composer: AnswerComposer,
    config: SearchServiceConfig,
}

impl SearchService {
    pub fn new(
        store: Arc<VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        splitter: ChunkSplitter,
        config: SearchServiceConfig,
    ) -> Self {
        let pipeline = RetrievalPipeline::new(store.clone(), config.retrieval);
        let composer = AnswerComposer::new(config.answer.clone());
        Self {
            store,
            embedder,
            splitter,
            pipeline,
            composer,
            config,
        }
    }

    pub fn store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    pub fn config(&self) -> &SearchServiceConfig {
        &self.config
    }

    /// Chunk, embed and store one document.
    ///
    /// Chunks whose embedding fails are skipped and counted; only store
    /// errors abort.
    pub async fn ingest(&self, source_id: &str, raw_text: &str) -> Result<IngestReport, StoreError> {
        let mut report = IngestReport {
            source_id: source_id.to_string(),
            chunks_indexed: 0,
            chunks_failed: 0,
            failure_reason: None,
        };

        if raw_text.trim().is_empty() {
            tracing::warn!("Skipped {} due to empty content", source_id);
            report.failure_reason = Some(EMPTY_CONTENT_REASON.to_string());
            return Ok(report);
        }

        let chunks = self.splitter.split(raw_text);
        let embedded = self.embed_chunks(&chunks).await;

        let dimension = self.store.dimension();
        let mut vectors = Vec::with_capacity(chunks.len());
        let mut records = Vec::with_capacity(chunks.len());
        for (chunk, vector) in chunks.into_iter().zip(embedded) {
            match vector {
                Some(vector) if vector.len() == dimension && all_finite(&vector) => {
                    vectors.push(vector);
                    records.push(MetadataRecord::new(chunk, source_id));
                }
                Some(vector) if vector.len() != dimension => {
                    tracing::warn!(
                        "Skipping chunk of {}: embedding has dimension {}, store expects {}",
                        source_id,
                        vector.len(),
                        dimension
                    );
                    report.chunks_failed += 1;
                }
                Some(_) => {
                    tracing::warn!("Skipping chunk of {}: embedding is not finite", source_id);
                    report.chunks_failed += 1;
                }
                None => report.chunks_failed += 1,
            }
        }

        if vectors.is_empty() {
            tracing::warn!("No embeddings generated for {}", source_id);
            report.failure_reason = Some(NO_EMBEDDINGS_REASON.to_string());
            return Ok(report);
        }

        // Persisting rewrites both files, so keep it off the async workers.
        let store = self.store.clone();
        let range = tokio::task::spawn_blocking(move || store.add(vectors, records))
            .await
            .map_err(|err| StoreError::Io(io::Error::new(io::ErrorKind::Other, err)))??;
        report.chunks_indexed = range.len();
        tracing::info!(
            "Indexed {} chunks from {} ({} failed)",
            report.chunks_indexed,
            source_id,
            report.chunks_failed
        );
        Ok(report)
    }

    /// Ingest every document, collecting per-source failures.
    pub async fn ingest_batch(&self, documents: &[SourceDocument]) -> BatchIngestReport {
        let mut indexed = Vec::new();
        let mut failed = Vec::new();

        for document in documents {
            match self.ingest(&document.source_id, &document.text).await {
                Ok(IngestReport {
                    failure_reason: Some(reason),
                    ..
                }) => failed.push(FailedSource {
                    source_id: document.source_id.clone(),
                    reason,
                }),
                Ok(_) => indexed.push(document.source_id.clone()),
                Err(err) => {
                    tracing::error!("Failed to index {}: {}", document.source_id, err);
                    failed.push(FailedSource {
                        source_id: document.source_id.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Batch ingestion finished: {} indexed, {} failed",
            indexed.len(),
            failed.len()
        );
        BatchIngestReport {
            indexed,
            failed,
            completed_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub async fn query(&self, request: QueryRequest) -> Result<QueryOutcome, StoreError> {
        let query = request.query.trim();
        if query.is_empty() {
            return Ok(QueryOutcome::EmptyQuery {
                message: EMPTY_QUERY_MESSAGE.to_string(),
            });
        }

        if self.composer.should_triage(query) {
            tracing::debug!("Triaged query {:?}", query);
            return Ok(QueryOutcome::Triaged {
                message: TRIAGE_RESPONSE.to_string(),
            });
        }

        let top_k = self.clamp_top_k(request.top_k);

        let query_vector = match self.embedder.embed_one(query).await {
            Ok(vector) if vector.len() != self.store.dimension() => {
                return Ok(QueryOutcome::EmbeddingFailed {
                    message: format!(
                        "Query embedding has dimension {}, store expects {}",
                        vector.len(),
                        self.store.dimension()
                    ),
                });
            }
            Ok(vector) if !all_finite(&vector) => {
                return Ok(QueryOutcome::EmbeddingFailed {
                    message: "Query embedding has non-finite components".to_string(),
                });
            }
            Ok(vector) => vector,
            Err(err) => {
                tracing::warn!("Query embedding failed: {}", err);
                return Ok(QueryOutcome::EmbeddingFailed {
                    message: err.to_string(),
                });
            }
        };

        let ranked = match self
            .pipeline
            .retrieve(&query_vector, top_k, request.min_score)?
        {
            Retrieval::NoDocuments => {
                return Ok(QueryOutcome::NoResults {
                    message: NO_DOCUMENTS_MESSAGE.to_string(),
                });
            }
            Retrieval::InsufficientRelevance { best_score } => {
                return Ok(QueryOutcome::InsufficientRelevance {
                    message: INSUFFICIENT_RELEVANCE_MESSAGE.to_string(),
                    best_score,
                });
            }
            Retrieval::Ranked(ranked) => ranked,
        };

        let answer = self.composer.compose(&ranked, query);
        tracing::info!(
            "Answered query with {} citations (best score {:.3})",
            answer.citations.len(),
            ranked[0].score
        );

        let csv_path = if request.save_to_csv {
            let path = export_citations(&self.config.export_dir, &answer.citations)?;
            Some(path.display().to_string())
        } else {
            None
        };

        Ok(QueryOutcome::Answered {
            query: query.to_string(),
            top_k,
            min_score: request.min_score,
            summary: answer.summary,
            citations: answer.citations,
            csv_path,
        })
    }

    pub fn reset(&self) -> Result<(), StoreError> {
        self.store.reset()
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    fn clamp_top_k(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.config.default_top_k)
            .clamp(1, self.config.max_top_k.max(1))
    }

    /// One entry per chunk; `None` where embedding failed.
    ///
    /// Tries a single batch request first and falls back to one request
    /// per chunk so a bad chunk only loses itself.
    async fn embed_chunks(&self, chunks: &[String]) -> Vec<Option<Vec<f32>>> {
        match self.embedder.embed(chunks).await {
            Ok(vectors) if vectors.len() == chunks.len() => {
                return vectors
                    .into_iter()
                    .map(|vector| (!vector.is_empty()).then_some(vector))
                    .collect();
            }
            Ok(vectors) => tracing::warn!(
                "Embedding batch returned {} vectors for {} chunks, retrying per chunk",
                vectors.len(),
                chunks.len()
            ),
            Err(err) => tracing::warn!("Embedding batch failed, retrying per chunk: {}", err),
        }

        let mut embedded = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            match self.embedder.embed_one(chunk).await {
                Ok(vector) => embedded.push(Some(vector)),
                Err(err) => {
                    tracing::warn!("Skipping chunk: embedding failed: {}", err);
                    embedded.push(None);
                }
            }
        }
        embedded
    }
}

fn all_finite(vector: &[f32]) -> bool {
    vector.iter().all(|value| value.is_finite())
}

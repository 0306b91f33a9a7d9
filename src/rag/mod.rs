//! Retrieval core.
//!
//! This module provides:
//! - `ChunkSplitter`: word-window chunking of raw text
//! - `VectorStore`: the vector index and its metadata, persisted together
//! - `RetrievalPipeline`: search, score filtering and the relevance floor
//! - `AnswerComposer`: extractive summary, cited snippets and query triage
//! - `SearchService`: ingestion and query orchestration used by the server

mod answer;
mod chunker;
mod error;
mod export;
mod index;
mod loader;
mod metadata;
mod persist;
mod retrieval;
mod service;
mod store;
mod text;

pub use answer::{AnswerComposer, AnswerConfig, Citation, ComposedAnswer, default_denylist};
pub use chunker::ChunkSplitter;
pub use error::StoreError;
pub use export::export_citations;
pub use index::{Metric, VectorIndex};
pub use loader::DocumentLoader;
pub use metadata::{MetadataRecord, MetadataStore};
pub use retrieval::{Retrieval, RetrievalConfig, RetrievalPipeline, DEFAULT_RELEVANCE_FLOOR};
pub use service::{
    BatchIngestReport, FailedSource, IngestReport, QueryOutcome, QueryRequest, SearchService,
    SearchServiceConfig, SourceDocument,
};
pub use store::{ScoredResult, StoreOptions, StoreStats, VectorStore};

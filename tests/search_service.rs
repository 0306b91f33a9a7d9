use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};
use tempfile::TempDir;

use citesearch_backend::core::config::AppPaths;
use citesearch_backend::core::errors::ApiError;
use citesearch_backend::embedding::EmbeddingProvider;
use citesearch_backend::rag::{
    AnswerConfig, ChunkSplitter, Metric, QueryOutcome, QueryRequest, RetrievalConfig,
    SearchService, SearchServiceConfig, StoreOptions, VectorStore,
};
use citesearch_backend::server::handlers::{admin, health, index, query};
use citesearch_backend::state::AppState;

/// Embeds "cat" texts as e0 and everything else as e3, counting calls.
#[derive(Default)]
struct FakeEmbedder {
    calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    fn name(&self) -> &str {
        "fake"
    }

    fn dimension(&self) -> usize {
        4
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(inputs
            .iter()
            .map(|input| {
                if input.to_lowercase().contains("cat") {
                    vec![1.0, 0.0, 0.0, 0.0]
                } else {
                    vec![0.0, 0.0, 0.0, 1.0]
                }
            })
            .collect())
    }
}

fn store_options(dir: &TempDir) -> StoreOptions {
    StoreOptions {
        dimension: 4,
        metric: Metric::Cosine,
        index_path: dir.path().join("store").join("index.bin"),
        metadata_path: dir.path().join("store").join("metadata.json"),
    }
}

fn service(dir: &TempDir, store: Arc<VectorStore>, embedder: Arc<FakeEmbedder>) -> SearchService {
    SearchService::new(
        store,
        embedder,
        ChunkSplitter::new(500, 50).unwrap(),
        SearchServiceConfig {
            default_top_k: 1,
            max_top_k: 50,
            export_dir: dir.path().join("outputs"),
            retrieval: RetrievalConfig::default(),
            answer: AnswerConfig::default(),
        },
    )
}

#[tokio::test]
async fn cats_scenario_answers_with_citation() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(VectorStore::open(store_options(&dir)).unwrap());
    let service = service(&dir, store.clone(), Arc::new(FakeEmbedder::default()));

    let report = service.ingest("u1", "Cats are great pets.").await.unwrap();
    assert_eq!(report.chunks_indexed, 1);

    let hits = store.search(&[1.0, 0.0, 0.0, 0.0], 1).unwrap();
    assert_eq!(hits.len(), 1);
    assert!((hits[0].score - 1.0).abs() < 1e-5);

    let outcome = service
        .query(QueryRequest {
            query: "are cats good pets".into(),
            top_k: Some(1),
            ..QueryRequest::default()
        })
        .await
        .unwrap();
    match outcome {
        QueryOutcome::Answered {
            summary, citations, ..
        } => {
            assert!(summary.contains("Cats are great pets."));
            assert_eq!(citations.len(), 1);
            assert_eq!(citations[0].source_url, "u1");
            assert!((citations[0].score - 1.0).abs() < 1e-5);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn one_word_query_never_reaches_the_embedder() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(VectorStore::open(store_options(&dir)).unwrap());
    let embedder = Arc::new(FakeEmbedder::default());
    let service = service(&dir, store, embedder.clone());

    let outcome = service
        .query(QueryRequest {
            query: "hi".into(),
            ..QueryRequest::default()
        })
        .await
        .unwrap();

    assert!(matches!(outcome, QueryOutcome::Triaged { .. }));
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn reset_clears_search_and_files() {
    let dir = TempDir::new().unwrap();
    let options = store_options(&dir);
    let store = Arc::new(VectorStore::open(options.clone()).unwrap());
    let service = service(&dir, store.clone(), Arc::new(FakeEmbedder::default()));
    service.ingest("u1", "Cats are great pets.").await.unwrap();
    assert!(options.index_path.exists());
    assert!(options.metadata_path.exists());

    service.reset().unwrap();

    assert!(store.search(&[1.0, 0.0, 0.0, 0.0], 5).unwrap().is_empty());
    assert!(!options.index_path.exists());
    assert!(!options.metadata_path.exists());
}

#[tokio::test]
async fn reopened_store_keeps_answering() {
    let dir = TempDir::new().unwrap();
    let options = store_options(&dir);
    {
        let store = Arc::new(VectorStore::open(options.clone()).unwrap());
        let service = service(&dir, store, Arc::new(FakeEmbedder::default()));
        service.ingest("u1", "Cats are great pets.").await.unwrap();
        service.ingest("u2", "Stock markets closed higher.").await.unwrap();
    }

    let store = Arc::new(VectorStore::open(options).unwrap());
    assert_eq!(store.len(), 2);
    let hits = store.search(&[1.0, 0.0, 0.0, 0.0], 2).unwrap();
    assert_eq!(hits[0].record.source_url, "u1");
    assert_eq!(hits[0].ordinal, 0);
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn app_state(dir: &TempDir) -> Arc<AppState> {
    app_state_with_config(
        dir,
        "embedding:\n  provider: hashing\nstore:\n  dimension: 256\nretrieval:\n  relevance_floor: 0.3\n",
    )
    .await
}

async fn app_state_with_config(dir: &TempDir, config: &str) -> Arc<AppState> {
    let paths = AppPaths::from_dirs(dir.path().join("root"), dir.path().join("data"));
    std::fs::write(paths.user_data_dir.join("config.yml"), config).unwrap();
    AppState::initialize_with_paths(paths).await.unwrap()
}

#[tokio::test]
async fn handlers_index_query_and_reset() {
    if std::env::var("CITESEARCH_CONFIG_PATH").is_ok() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let state = app_state(&dir).await;

    let response = index::index_documents(
        State(state.clone()),
        Json(
            serde_json::from_value(json!({
                "documents": [
                    { "source_id": "doc-a", "text": "Vector search ranks chunks by similarity. It uses embeddings." },
                    { "url": "doc-b", "text": "" }
                ]
            }))
            .unwrap(),
        ),
    )
    .await
    .unwrap()
    .into_response();
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["indexed"], json!(["doc-a"]));
    assert_eq!(report["failed"][0]["reason"], "Empty content");

    let response = query::query(
        State(state.clone()),
        Json(QueryRequest {
            query: "vector search ranks chunks by similarity".into(),
            ..QueryRequest::default()
        }),
    )
    .await
    .unwrap()
    .into_response();
    let outcome = body_json(response).await;
    assert_eq!(outcome["status"], "answered");
    assert_eq!(outcome["citations"][0]["source_url"], "doc-a");

    let status = body_json(
        health::get_status(State(state.clone()))
            .await
            .unwrap()
            .into_response(),
    )
    .await;
    assert_eq!(status["store"]["vectors"], 1);
    assert_eq!(status["store"]["metric"], "cosine");

    admin::reset(State(state.clone())).await.unwrap();
    assert_eq!(state.service.stats().vectors, 0);
}

#[tokio::test]
async fn second_state_on_same_store_is_rejected() {
    if std::env::var("CITESEARCH_CONFIG_PATH").is_ok() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let _state = app_state(&dir).await;

    let paths = AppPaths::from_dirs(dir.path().join("root"), dir.path().join("data"));
    let err = AppState::initialize_with_paths(paths)
        .await
        .err()
        .expect("store lock should be held");
    assert!(err.to_string().contains("vector store"));
}

#[tokio::test]
async fn empty_index_request_is_a_bad_request() {
    if std::env::var("CITESEARCH_CONFIG_PATH").is_ok() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let state = app_state(&dir).await;

    let err = index::index_documents(
        State(state),
        Json(serde_json::from_value(json!({ "documents": [] })).unwrap()),
    )
    .await
    .err()
    .expect("empty batch should be rejected");
    assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn euclidean_config_without_floor_answers_queries() {
    if std::env::var("CITESEARCH_CONFIG_PATH").is_ok() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let state = app_state_with_config(
        &dir,
        "embedding:\n  provider: hashing\nstore:\n  dimension: 64\n  metric: euclidean\n",
    )
    .await;

    let response = index::index_documents(
        State(state.clone()),
        Json(
            serde_json::from_value(json!({
                "documents": [
                    { "source_id": "doc-a", "text": "Cats are great pets." },
                    { "source_id": "doc-b", "text": "Stock markets closed higher today." }
                ]
            }))
            .unwrap(),
        ),
    )
    .await
    .unwrap()
    .into_response();
    assert_eq!(body_json(response).await["indexed"], json!(["doc-a", "doc-b"]));

    let response = query::query(
        State(state.clone()),
        Json(QueryRequest {
            query: "Cats are great pets.".into(),
            ..QueryRequest::default()
        }),
    )
    .await
    .unwrap()
    .into_response();
    let outcome = body_json(response).await;
    assert_eq!(outcome["status"], "answered");
    assert_eq!(outcome["citations"][0]["source_url"], "doc-a");
    assert!(outcome["citations"][0]["score"].as_f64().unwrap().abs() < 1e-6);

    let status = body_json(
        health::get_status(State(state))
            .await
            .unwrap()
            .into_response(),
    )
    .await;
    assert_eq!(status["store"]["metric"], "euclidean");
}

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;

use super::paths::AppPaths;
use crate::rag::{AnswerConfig, Metric, RetrievalConfig, StoreOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    Http,
    Hashing,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    pub backend: EmbeddingBackend,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ChunkingSettings {
    pub max_words: usize,
    pub overlap: usize,
}

#[derive(Debug, Clone)]
pub struct RetrievalSettings {
    pub default_top_k: usize,
    pub max_top_k: usize,
    pub relevance_floor: f32,
}

/// Typed view of the config file, with defaults for everything missing.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub server: ServerSettings,
    pub embedding: EmbeddingSettings,
    pub store: StoreOptions,
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub answer: AnswerConfig,
    pub export_dir: PathBuf,
    pub documents_dir: PathBuf,
    pub document_extensions: Vec<String>,
}

impl AppSettings {
    pub fn from_config(config: &Value, paths: &AppPaths) -> Self {
        let section = |name: &str| config.get(name).cloned().unwrap_or(Value::Null);
        let server = section("server");
        let embedding = section("embedding");
        let store = section("store");
        let chunking = section("chunking");
        let retrieval = section("retrieval");
        let answer = section("answer");

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .or_else(|| {
                server
                    .get("port")
                    .and_then(|v| v.as_u64())
                    .and_then(|v| u16::try_from(v).ok())
            })
            .unwrap_or(8000);

        let backend = match embedding.get("provider").and_then(|v| v.as_str()) {
            Some(name) if name.eq_ignore_ascii_case("hashing") => EmbeddingBackend::Hashing,
            _ => EmbeddingBackend::Http,
        };

        let metric = store
            .get("metric")
            .and_then(|v| v.as_str())
            .and_then(|v| v.parse::<Metric>().ok())
            .unwrap_or(Metric::Cosine);

        let defaults = AnswerConfig::default();
        let denylist = string_list(&answer, "denylist").unwrap_or(defaults.denylist);

        let default_top_k = usize_field(&retrieval, "default_top_k", 5).max(1);
        let max_top_k = usize_field(&retrieval, "max_top_k", 50).max(default_top_k);

        Self {
            server: ServerSettings {
                host: str_field(&server, "host").unwrap_or_else(|| "127.0.0.1".to_string()),
                port,
                cors_allowed_origins: string_list(&server, "cors_allowed_origins")
                    .unwrap_or_default(),
            },
            embedding: EmbeddingSettings {
                backend,
                base_url: str_field(&embedding, "base_url")
                    .unwrap_or_else(|| "http://127.0.0.1:8080".to_string()),
                model: str_field(&embedding, "model")
                    .unwrap_or_else(|| "all-MiniLM-L6-v2".to_string()),
                timeout: Duration::from_secs(
                    embedding
                        .get("timeout_secs")
                        .and_then(|v| v.as_u64())
                        .unwrap_or(30)
                        .max(1),
                ),
            },
            store: StoreOptions {
                dimension: usize_field(&store, "dimension", 384),
                metric,
                index_path: path_field(&store, "index_path", paths)
                    .unwrap_or_else(|| paths.index_path.clone()),
                metadata_path: path_field(&store, "metadata_path", paths)
                    .unwrap_or_else(|| paths.metadata_path.clone()),
            },
            chunking: ChunkingSettings {
                max_words: usize_field(&chunking, "max_words", 500),
                overlap: usize_field(&chunking, "overlap", 50),
            },
            retrieval: RetrievalSettings {
                default_top_k,
                max_top_k,
                relevance_floor: retrieval
                    .get("relevance_floor")
                    .and_then(|v| v.as_f64())
                    .map(|v| v as f32)
                    .unwrap_or_else(|| RetrievalConfig::for_metric(metric).relevance_floor),
            },
            answer: AnswerConfig {
                summary_max_chars: usize_field(
                    &answer,
                    "summary_max_chars",
                    defaults.summary_max_chars,
                ),
                summary_short_sentence: usize_field(
                    &answer,
                    "summary_short_sentence",
                    defaults.summary_short_sentence,
                ),
                snippet_max_chars: usize_field(
                    &answer,
                    "snippet_max_chars",
                    defaults.snippet_max_chars,
                ),
                snippet_short_sentence: usize_field(
                    &answer,
                    "snippet_short_sentence",
                    defaults.snippet_short_sentence,
                ),
                denylist,
            },
            export_dir: path_field(&section("export"), "dir", paths)
                .unwrap_or_else(|| paths.export_dir.clone()),
            documents_dir: path_field(&section("documents"), "dir", paths)
                .unwrap_or_else(|| paths.documents_dir.clone()),
            document_extensions: string_list(&section("documents"), "extensions")
                .unwrap_or_else(|| vec!["txt".to_string()]),
        }
    }

    pub fn retrieval_config(&self) -> RetrievalConfig {
        RetrievalConfig {
            relevance_floor: self.retrieval.relevance_floor,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn str_field(section: &Value, key: &str) -> Option<String> {
    section
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn usize_field(section: &Value, key: &str, default: usize) -> usize {
    section
        .get(key)
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .unwrap_or(default)
}

fn string_list(section: &Value, key: &str) -> Option<Vec<String>> {
    section.get(key).and_then(|v| v.as_array()).map(|list| {
        list.iter()
            .filter_map(|item| item.as_str())
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
}

/// Relative paths resolve against the user data dir.
fn path_field(section: &Value, key: &str, paths: &AppPaths) -> Option<PathBuf> {
    str_field(section, key).map(|raw| {
        let candidate = PathBuf::from(raw);
        if candidate.is_absolute() {
            candidate
        } else {
            paths.user_data_dir.join(candidate)
        }
    })
}

//! Query-vector retrieval: search, score filtering and the relevance floor.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::StoreError;
use super::index::Metric;
use super::store::{ScoredResult, VectorStore};

pub const DEFAULT_RELEVANCE_FLOOR: f32 = 0.6;

/// Result of a retrieval, keeping "nothing found" apart from "nothing
/// relevant enough".
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    /// The store is empty, or nothing survived the caller's `min_score`.
    NoDocuments,
    /// Results existed but none reached the relevance floor.
    InsufficientRelevance { best_score: f32 },
    /// Results at or above the floor, best first.
    Ranked(Vec<ScoredResult>),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub relevance_floor: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            relevance_floor: DEFAULT_RELEVANCE_FLOOR,
        }
    }
}

impl RetrievalConfig {
    /// Default floor for a metric. Euclidean scores are negated distances
    /// and never positive, so that metric has no floor unless configured.
    pub fn for_metric(metric: Metric) -> Self {
        let relevance_floor = match metric {
            Metric::Cosine => DEFAULT_RELEVANCE_FLOOR,
            Metric::Euclidean => f32::NEG_INFINITY,
        };
        Self { relevance_floor }
    }
}

pub struct RetrievalPipeline {
    store: Arc<VectorStore>,
    config: RetrievalConfig,
}

impl RetrievalPipeline {
    pub fn new(store: Arc<VectorStore>, config: RetrievalConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn retrieve(
        &self,
        query_vector: &[f32],
        top_k: usize,
        min_score: Option<f32>,
    ) -> Result<Retrieval, StoreError> {
        if self.store.is_empty() {
            return Ok(Retrieval::NoDocuments);
        }

        let mut results = self.store.search(query_vector, top_k)?;
        if let Some(min_score) = min_score {
            results.retain(|result| result.score >= min_score);
        }
        if results.is_empty() {
            return Ok(Retrieval::NoDocuments);
        }

        // Stable: equal scores keep index order.
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        let best_score = results[0].score;

        results.retain(|result| result.score >= self.config.relevance_floor);
        if results.is_empty() {
            tracing::debug!(
                "Best score {:.3} is below relevance floor {:.3}",
                best_score,
                self.config.relevance_floor
            );
            return Ok(Retrieval::InsufficientRelevance { best_score });
        }

        Ok(Retrieval::Ranked(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::metadata::MetadataRecord;
    use crate::rag::store::StoreOptions;

    fn pipeline(dir: &std::path::Path, floor: f32) -> (Arc<VectorStore>, RetrievalPipeline) {
        pipeline_with(
            dir,
            Metric::Cosine,
            RetrievalConfig {
                relevance_floor: floor,
            },
        )
    }

    fn pipeline_with(
        dir: &std::path::Path,
        metric: Metric,
        config: RetrievalConfig,
    ) -> (Arc<VectorStore>, RetrievalPipeline) {
        let store = Arc::new(
            VectorStore::open(StoreOptions {
                dimension: 2,
                metric,
                index_path: dir.join("index.bin"),
                metadata_path: dir.join("metadata.json"),
            })
            .unwrap(),
        );
        let pipeline = RetrievalPipeline::new(store.clone(), config);
        (store, pipeline)
    }

    fn seed(store: &VectorStore) {
        store
            .add(
                vec![vec![1.0, 0.0], vec![0.6, 0.8], vec![0.0, 1.0]],
                vec![
                    MetadataRecord::new("exact", "u1"),
                    MetadataRecord::new("close", "u2"),
                    MetadataRecord::new("orthogonal", "u3"),
                ],
            )
            .unwrap();
    }

    #[test]
    fn empty_store_has_no_documents() {
        let dir = tempfile::tempdir().unwrap();
        let (_store, pipeline) = pipeline(dir.path(), 0.6);

        assert_eq!(
            pipeline.retrieve(&[1.0, 0.0], 5, None).unwrap(),
            Retrieval::NoDocuments
        );
    }

    #[test]
    fn floor_filters_and_ranks_descending() {
        let dir = tempfile::tempdir().unwrap();
        let (store, pipeline) = pipeline(dir.path(), 0.5);
        seed(&store);

        let Retrieval::Ranked(results) = pipeline.retrieve(&[1.0, 0.0], 3, None).unwrap() else {
            panic!("expected ranked results");
        };
        let texts: Vec<&str> = results.iter().map(|r| r.record.text.as_str()).collect();
        assert_eq!(texts, vec!["exact", "close"]);
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn results_below_floor_are_distinct_from_no_documents() {
        let dir = tempfile::tempdir().unwrap();
        let (store, pipeline) = pipeline(dir.path(), 0.6);
        seed(&store);

        let outcome = pipeline.retrieve(&[-1.0, 0.1], 3, None).unwrap();
        assert!(matches!(
            outcome,
            Retrieval::InsufficientRelevance { best_score } if best_score < 0.6
        ));
    }

    #[test]
    fn min_score_that_removes_everything_means_no_documents() {
        let dir = tempfile::tempdir().unwrap();
        let (store, pipeline) = pipeline(dir.path(), 0.6);
        seed(&store);

        assert_eq!(
            pipeline.retrieve(&[-1.0, 0.1], 3, Some(0.9)).unwrap(),
            Retrieval::NoDocuments
        );
    }

    #[test]
    fn min_score_applies_before_the_floor() {
        let dir = tempfile::tempdir().unwrap();
        let (store, pipeline) = pipeline(dir.path(), 0.0);
        seed(&store);

        let Retrieval::Ranked(results) = pipeline.retrieve(&[1.0, 0.0], 3, Some(0.7)).unwrap()
        else {
            panic!("expected ranked results");
        };
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.source_url, "u1");
    }

    #[test]
    fn query_dimension_mismatch_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (store, pipeline) = pipeline(dir.path(), 0.6);
        seed(&store);

        assert!(matches!(
            pipeline.retrieve(&[1.0, 0.0, 0.0], 3, None),
            Err(StoreError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn default_floor_depends_on_metric() {
        assert_eq!(
            RetrievalConfig::for_metric(Metric::Cosine).relevance_floor,
            DEFAULT_RELEVANCE_FLOOR
        );
        assert_eq!(
            RetrievalConfig::for_metric(Metric::Euclidean).relevance_floor,
            f32::NEG_INFINITY
        );
    }

    #[test]
    fn euclidean_store_ranks_with_its_default_floor() {
        let dir = tempfile::tempdir().unwrap();
        let (store, pipeline) = pipeline_with(
            dir.path(),
            Metric::Euclidean,
            RetrievalConfig::for_metric(Metric::Euclidean),
        );
        seed(&store);

        let Retrieval::Ranked(results) = pipeline.retrieve(&[1.0, 0.0], 3, None).unwrap() else {
            panic!("expected ranked results");
        };
        let texts: Vec<&str> = results.iter().map(|r| r.record.text.as_str()).collect();
        assert_eq!(texts, vec!["exact", "close", "orthogonal"]);
        assert!(results[0].score.abs() < 1e-6);

        let Retrieval::Ranked(far) = pipeline.retrieve(&[50.0, -50.0], 1, None).unwrap() else {
            panic!("distant matches still rank without a floor");
        };
        assert_eq!(far.len(), 1);
    }

    #[test]
    fn configured_euclidean_floor_is_a_maximum_distance() {
        let dir = tempfile::tempdir().unwrap();
        let (store, pipeline) = pipeline_with(
            dir.path(),
            Metric::Euclidean,
            RetrievalConfig {
                relevance_floor: -0.5,
            },
        );
        seed(&store);

        let Retrieval::Ranked(results) = pipeline.retrieve(&[1.0, 0.0], 3, None).unwrap() else {
            panic!("expected ranked results");
        };
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.text, "exact");

        assert!(matches!(
            pipeline.retrieve(&[5.0, 5.0], 3, None).unwrap(),
            Retrieval::InsufficientRelevance { best_score } if best_score < -0.5
        ));
    }
}

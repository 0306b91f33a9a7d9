use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::EmbeddingProvider;
use crate::core::errors::ApiError;

/// Client for an OpenAI-compatible `/v1/embeddings` endpoint
/// (llama.cpp server, LM Studio, text-embeddings-inference, ...).
#[derive(Clone)]
pub struct HttpEmbeddingProvider {
    base_url: String,
    model: String,
    dimension: usize,
    client: Client,
}

impl HttpEmbeddingProvider {
    pub fn new(
        base_url: &str,
        model: &str,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimension,
            client,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn name(&self) -> &str {
        "http"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "input": inputs,
        });

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::external)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::ExternalFailure(format!(
                "Embedding request failed: {} {}",
                status, text
            )));
        }

        let payload: Value = response.json().await.map_err(ApiError::external)?;
        let embeddings = parse_embedding_response(&payload)?;
        if embeddings.len() != inputs.len() {
            return Err(ApiError::ExternalFailure(format!(
                "Embedding response has {} vectors for {} inputs",
                embeddings.len(),
                inputs.len()
            )));
        }
        Ok(embeddings)
    }
}

fn parse_embedding_response(payload: &Value) -> Result<Vec<Vec<f32>>, ApiError> {
    let Some(data) = payload.get("data").and_then(|v| v.as_array()) else {
        return Err(ApiError::ExternalFailure(
            "Embedding response missing data array".to_string(),
        ));
    };

    let mut indexed_embeddings = Vec::with_capacity(data.len());
    for (fallback_idx, item) in data.iter().enumerate() {
        let Some(values) = item.get("embedding").and_then(|v| v.as_array()) else {
            return Err(ApiError::ExternalFailure(
                "Embedding response item missing embedding array".to_string(),
            ));
        };

        let mut embedding = Vec::with_capacity(values.len());
        for value in values {
            let Some(float_value) = value.as_f64() else {
                return Err(ApiError::ExternalFailure(
                    "Embedding contains non-numeric value".to_string(),
                ));
            };
            embedding.push(float_value as f32);
        }

        let index = item
            .get("index")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(fallback_idx);
        indexed_embeddings.push((index, embedding));
    }

    indexed_embeddings.sort_by_key(|(idx, _)| *idx);
    Ok(indexed_embeddings
        .into_iter()
        .map(|(_, embedding)| embedding)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_orders_by_index() {
        let payload = json!({
            "data": [
                { "index": 1, "embedding": [0.5, 0.25] },
                { "index": 0, "embedding": [1.0, 0.0] }
            ]
        });

        let parsed = parse_embedding_response(&payload).unwrap();
        assert_eq!(parsed, vec![vec![1.0, 0.0], vec![0.5, 0.25]]);
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert!(parse_embedding_response(&json!({})).is_err());
        assert!(parse_embedding_response(&json!({ "data": [{ "index": 0 }] })).is_err());
        assert!(
            parse_embedding_response(&json!({ "data": [{ "embedding": ["x"] }] })).is_err()
        );
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        let provider = HttpEmbeddingProvider::new(
            "http://127.0.0.1:8080/",
            "all-MiniLM-L6-v2",
            384,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(provider.base_url, "http://127.0.0.1:8080");
        assert_eq!(provider.dimension(), 384);
    }
}

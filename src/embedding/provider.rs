use async_trait::async_trait;

use crate::core::errors::ApiError;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// return the provider name (e.g. "http", "hashing")
    fn name(&self) -> &str;

    /// embedding dimension produced by this provider
    fn dimension(&self) -> usize;

    /// embed a batch of inputs, one vector per input, in input order
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;

    /// embed a single input
    async fn embed_one(&self, input: &str) -> Result<Vec<f32>, ApiError> {
        let mut vectors = self.embed(&[input.to_string()]).await?;
        match vectors.pop() {
            Some(vector) if !vector.is_empty() => Ok(vector),
            _ => Err(ApiError::ExternalFailure(
                "Embedding provider returned no vector".to_string(),
            )),
        }
    }
}

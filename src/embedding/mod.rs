//! Embedding providers.
//!
//! The core only sees [`EmbeddingProvider`]; which model produces the
//! vectors is a deployment choice.

mod hashing;
mod http;
mod provider;

pub use hashing::HashingEmbeddingProvider;
pub use http::HttpEmbeddingProvider;
pub use provider::EmbeddingProvider;

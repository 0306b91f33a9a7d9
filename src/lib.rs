//! Retrieval-augmented search backend: chunk and embed documents, search
//! them by vector similarity and answer queries with an extractive summary
//! and cited snippets.

pub mod core;
pub mod embedding;
pub mod rag;
pub mod server;
pub mod state;

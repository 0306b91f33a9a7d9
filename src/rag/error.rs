use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the chunker, the vector index and the metadata store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid vector: component {position} is not finite")]
    InvalidVector { position: usize },

    #[error("batch mismatch: {vectors} vectors but {records} metadata records")]
    BatchMismatch { vectors: usize, records: usize },

    #[error("empty input: {0}")]
    EmptyInput(String),

    #[error("store corruption: {0}")]
    StoreCorruption(String),

    #[error("no metadata at ordinal {0}")]
    NotFound(usize),

    #[error("store at {0} is locked by another process")]
    Locked(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

}

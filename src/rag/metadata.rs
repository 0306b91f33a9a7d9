//! Per-vector metadata, ordinal-aligned with the vector index.
//!
//! Persisted as a pretty-printed JSON array so it can be inspected without
//! decoding the vector file.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::StoreError;
use super::persist::{remove_if_exists, write_atomically};

/// Metadata attached to one stored vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// The chunk text that was embedded.
    pub text: String,
    /// Source identifier (URL, filename, etc.).
    #[serde(alias = "url")]
    pub source_url: String,
}

impl MetadataRecord {
    pub fn new(text: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_url: source_url.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetadataStore {
    records: Vec<MetadataRecord>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn append(&mut self, records: Vec<MetadataRecord>) {
        self.records.extend(records);
    }

    pub fn get(&self, ordinal: usize) -> Result<&MetadataRecord, StoreError> {
        self.records
            .get(ordinal)
            .ok_or(StoreError::NotFound(ordinal))
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.records.truncate(len);
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        write_atomically(path, |file| {
            serde_json::to_writer_pretty(file, &self.records).map_err(io::Error::from)
        })?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let contents = fs::read_to_string(path)?;
        let records: Vec<MetadataRecord> = serde_json::from_str(&contents).map_err(|err| {
            StoreError::StoreCorruption(format!("{}: {}", path.display(), err))
        })?;
        Ok(Self { records })
    }

    /// Clear all records and delete the backing file. Idempotent.
    pub fn reset(&mut self, path: &Path) -> io::Result<()> {
        self.records.clear();
        remove_if_exists(path)
    }
}

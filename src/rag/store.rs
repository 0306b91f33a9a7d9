//! VectorStore: the index, its metadata and their files as one unit.
//!
//! Every mutation takes the write lock, appends to both collections and
//! persists both files before releasing it, so a reader never observes a
//! vector without its metadata.

use std::fs::{self, File, OpenOptions};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use super::error::StoreError;
use super::index::{Metric, VectorIndex};
use super::metadata::{MetadataRecord, MetadataStore};

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub dimension: usize,
    pub metric: Metric,
    pub index_path: PathBuf,
    pub metadata_path: PathBuf,
}

/// A metadata record joined with its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub ordinal: usize,
    /// Similarity score (higher = better).
    pub score: f32,
    #[serde(flatten)]
    pub record: MetadataRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub vectors: usize,
    pub dimension: usize,
    pub metric: Metric,
}

struct StoreState {
    index: VectorIndex,
    metadata: MetadataStore,
}

pub struct VectorStore {
    state: RwLock<StoreState>,
    index_path: PathBuf,
    metadata_path: PathBuf,
    // Held for the lifetime of the store; the OS releases the lock on drop.
    _lock_file: File,
}

impl VectorStore {
    /// Open the store, loading persisted files when present.
    ///
    /// Fails with [`StoreError::Locked`] if another process already owns
    /// the same index path.
    pub fn open(options: StoreOptions) -> Result<Self, StoreError> {
        if let Some(parent) = options.index_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let lock_path = lock_path_for(&options.index_path);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked(lock_path));
        }

        let (index, metadata) = load_state(&options)?;
        tracing::info!(
            "Opened vector store at {} ({} vectors, dimension {}, {})",
            options.index_path.display(),
            index.len(),
            index.dimension(),
            index.metric()
        );

        Ok(Self {
            state: RwLock::new(StoreState { index, metadata }),
            index_path: options.index_path,
            metadata_path: options.metadata_path,
            _lock_file: lock_file,
        })
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    pub fn len(&self) -> usize {
        self.read().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().index.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.read().index.dimension()
    }

    pub fn metric(&self) -> Metric {
        self.read().index.metric()
    }

    pub fn stats(&self) -> StoreStats {
        let state = self.read();
        StoreStats {
            vectors: state.index.len(),
            dimension: state.index.dimension(),
            metric: state.index.metric(),
        }
    }

    /// Append vectors with their metadata and persist both files.
    ///
    /// The batch is rejected as a whole on a count or dimension mismatch,
    /// or when any vector has a non-finite component.
    /// If persisting fails the in-memory append is rolled back.
    pub fn add(
        &self,
        vectors: Vec<Vec<f32>>,
        records: Vec<MetadataRecord>,
    ) -> Result<Range<usize>, StoreError> {
        if vectors.len() != records.len() {
            return Err(StoreError::BatchMismatch {
                vectors: vectors.len(),
                records: records.len(),
            });
        }

        let mut state = self.write();
        let previous = state.index.len();
        if vectors.is_empty() {
            return Ok(previous..previous);
        }

        let range = state.index.add(&vectors)?;
        state.metadata.append(records);

        if let Err(err) = self.persist(&state) {
            tracing::error!("Failed to persist vector store, rolling back batch: {}", err);
            state.index.truncate(previous);
            state.metadata.truncate(previous);
            return Err(err);
        }

        tracing::debug!("Stored ordinals {:?}", range);
        Ok(range)
    }

    /// Search and join metadata under one read lock.
    ///
    /// Ordinals with no metadata are skipped and logged.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<ScoredResult>, StoreError> {
        let state = self.read();
        let hits = state.index.search(query, top_k)?;

        Ok(hits
            .into_iter()
            .filter_map(|(ordinal, score)| match state.metadata.get(ordinal) {
                Ok(record) => Some(ScoredResult {
                    ordinal,
                    score,
                    record: record.clone(),
                }),
                Err(err) => {
                    tracing::warn!("Skipping search hit: {}", err);
                    None
                }
            })
            .collect())
    }

    /// Drop every vector and record and delete both files. Idempotent.
    pub fn reset(&self) -> Result<(), StoreError> {
        let mut state = self.write();
        state.index.reset(&self.index_path)?;
        state.metadata.reset(&self.metadata_path)?;
        tracing::info!("Vector store reset");
        Ok(())
    }

    fn persist(&self, state: &StoreState) -> Result<(), StoreError> {
        state.index.save(&self.index_path)?;
        state.metadata.save(&self.metadata_path)?;
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn lock_path_for(index_path: &Path) -> PathBuf {
    let mut name = index_path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    index_path.with_file_name(name)
}

fn load_state(options: &StoreOptions) -> Result<(VectorIndex, MetadataStore), StoreError> {
    let mut index = if options.index_path.exists() {
        let index = VectorIndex::load(&options.index_path)?;
        if index.dimension() != options.dimension || index.metric() != options.metric {
            return Err(StoreError::Configuration(format!(
                "{} was built with dimension {} ({}), configuration expects {} ({})",
                options.index_path.display(),
                index.dimension(),
                index.metric(),
                options.dimension,
                options.metric
            )));
        }
        index
    } else {
        VectorIndex::new(options.dimension, options.metric)?
    };

    let mut metadata = if options.metadata_path.exists() {
        MetadataStore::load(&options.metadata_path)?
    } else {
        MetadataStore::new()
    };

    if index.len() != metadata.len() {
        let aligned = index.len().min(metadata.len());
        let err = StoreError::StoreCorruption(format!(
            "{} vectors but {} metadata records; keeping the first {}",
            index.len(),
            metadata.len(),
            aligned
        ));
        tracing::warn!("{}", err);
        index.truncate(aligned);
        metadata.truncate(aligned);
    }

    Ok((index, metadata))
}

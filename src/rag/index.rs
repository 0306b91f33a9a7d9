//! Append-only flat similarity index.
//!
//! Vectors live in one contiguous `Vec<f32>`; search is an exact scan.
//!
//! # File Structure
//!
//! ```text
//! Offset   Size    Type        Description
//! ─────────────────────────────────────────────
//! 0x00     8       [u8; 8]     Magic: "CSIDX001"
//! 0x08     4       u32 LE      D: Dimension
//! 0x0C     4       u32 LE      Metric (0 = cosine, 1 = euclidean)
//! 0x10     8       u64 LE      N: Number of vectors
//! 0x18     N*D*4   [f32]       Vector data (Little Endian)
//! ```

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::ops::Range;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::StoreError;
use super::persist::{remove_if_exists, write_atomically};

pub const MAGIC: [u8; 8] = *b"CSIDX001";
pub const HEADER_SIZE: usize = 24;

/// Similarity metric of an index. Scores are always "higher is better".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Cosine,
    Euclidean,
}

impl Metric {
    fn code(self) -> u32 {
        match self {
            Metric::Cosine => 0,
            Metric::Euclidean => 1,
        }
    }

    fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Metric::Cosine),
            1 => Some(Metric::Euclidean),
            _ => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Cosine => f.write_str("cosine"),
            Metric::Euclidean => f.write_str("euclidean"),
        }
    }
}

impl FromStr for Metric {
    type Err = StoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(Metric::Cosine),
            "euclidean" | "l2" => Ok(Metric::Euclidean),
            other => Err(StoreError::Configuration(format!(
                "unknown similarity metric '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimension: usize,
    metric: Metric,
    data: Vec<f32>,
}

impl VectorIndex {
    pub fn new(dimension: usize, metric: Metric) -> Result<Self, StoreError> {
        if dimension == 0 {
            return Err(StoreError::Configuration(
                "index dimension must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            metric,
            data: Vec::new(),
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append a batch. Either every vector is added or none is.
    ///
    /// Vectors with NaN or infinite components are rejected.
    ///
    /// Returns the ordinals assigned to the batch, in call order.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<Range<usize>, StoreError> {
        for vector in vectors {
            self.check_vector(vector)?;
        }

        let start = self.len();
        self.data.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            match self.metric {
                Metric::Cosine => self.data.extend(normalized(vector)),
                Metric::Euclidean => self.data.extend_from_slice(vector),
            }
        }
        Ok(start..self.len())
    }

    /// Return up to `top_k` `(ordinal, score)` pairs, best first.
    ///
    /// An empty index answers every query with no results.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<(usize, f32)>, StoreError> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        self.check_vector(query)?;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query = match self.metric {
            Metric::Cosine => normalized(query),
            Metric::Euclidean => query.to_vec(),
        };

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(ordinal, stored)| {
                let score = match self.metric {
                    Metric::Cosine => dot(&query, stored),
                    Metric::Euclidean => -l2_distance(&query, stored),
                };
                (ordinal, score)
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);
        Ok(scored)
    }

    /// Keep only the first `len` vectors.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.data.truncate(len * self.dimension);
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE + self.data.len() * 4);
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        bytes.extend_from_slice(&self.metric.code().to_le_bytes());
        bytes.extend_from_slice(&(self.len() as u64).to_le_bytes());
        for value in &self.data {
            bytes.extend_from_slice(&value.to_le_bytes());
        }

        write_atomically(path, |file| file.write_all(&bytes))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let bytes = fs::read(path)?;
        if bytes.len() < HEADER_SIZE {
            return Err(StoreError::StoreCorruption(format!(
                "{} is too small for an index header",
                path.display()
            )));
        }
        if bytes[0..8] != MAGIC {
            return Err(StoreError::StoreCorruption(format!(
                "{} has invalid magic bytes",
                path.display()
            )));
        }

        let dimension = read_u32(&bytes[8..12]) as usize;
        let metric = Metric::from_code(read_u32(&bytes[12..16])).ok_or_else(|| {
            StoreError::StoreCorruption(format!("{} has an unknown metric code", path.display()))
        })?;
        let count = read_u64(&bytes[16..24]) as usize;

        let mut index = VectorIndex::new(dimension, metric).map_err(|_| {
            StoreError::StoreCorruption(format!("{} declares dimension zero", path.display()))
        })?;
        let body = &bytes[HEADER_SIZE..];
        let expected = count
            .checked_mul(dimension)
            .and_then(|values| values.checked_mul(4))
            .ok_or_else(|| {
                StoreError::StoreCorruption(format!("{} header overflows", path.display()))
            })?;
        if body.len() != expected {
            return Err(StoreError::StoreCorruption(format!(
                "{} holds {} data bytes, header promises {}",
                path.display(),
                body.len(),
                expected
            )));
        }

        index.data = body
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        Ok(index)
    }

    /// Clear all vectors and delete the backing file. Idempotent.
    pub fn reset(&mut self, path: &Path) -> io::Result<()> {
        self.data.clear();
        remove_if_exists(path)
    }

    fn check_vector(&self, vector: &[f32]) -> Result<(), StoreError> {
        if vector.len() != self.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if let Some(position) = vector.iter().position(|value| !value.is_finite()) {
            return Err(StoreError::InvalidVector { position });
        }
        Ok(())
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}

/// L2-normalize; a zero-norm vector stays the zero vector.
fn normalized(vector: &[f32]) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        return vec![0.0; vector.len()];
    }
    vector.iter().map(|x| x / norm).collect()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

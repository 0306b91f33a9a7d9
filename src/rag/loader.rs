use std::fs;
use std::path::{Path, PathBuf};

use super::error::StoreError;
use super::service::SourceDocument;

/// Loads plain-text documents from a folder.
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    dir: PathBuf,
    extensions: Vec<String>,
}

impl DocumentLoader {
    pub fn new(dir: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self {
            dir: dir.into(),
            extensions,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read every matching file, sorted by file name. The file name is the
    /// source id.
    pub fn load(&self) -> Result<Vec<SourceDocument>, StoreError> {
        if !self.dir.is_dir() {
            return Err(StoreError::Configuration(format!(
                "Documents folder not found: {}",
                self.dir.display()
            )));
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && self.matches(&path) {
                paths.push(path);
            }
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        if paths.is_empty() {
            return Err(StoreError::EmptyInput(format!(
                "no documents with extensions {:?} in {}",
                self.extensions,
                self.dir.display()
            )));
        }

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let text = fs::read_to_string(&path)?;
            let source_id = path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default();
            documents.push(SourceDocument { source_id, text });
        }
        tracing::info!(
            "Loaded {} documents from {}",
            documents.len(),
            self.dir.display()
        );
        Ok(documents)
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|allowed| allowed == &ext.to_lowercase()))
            .unwrap_or(false)
    }
}

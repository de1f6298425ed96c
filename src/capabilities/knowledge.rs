//! Knowledge-store and semantic segmentation collaborators

use super::{CapabilityError, CapabilityResult};
use crate::chunking::ChunkForest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// What a knowledge store did with a forest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnOutcome {
    pub chunks_created: usize,
    pub ids: Vec<String>,
}

/// Destination for finished chunk forests
///
/// Ownership of the chunks passes to the store; callers keep no references.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    async fn learn(&self, source: &str, forest: ChunkForest) -> CapabilityResult<LearnOutcome>;
}

/// Splits text into semantically coherent segments
pub trait SemanticSegmenter: Send + Sync {
    fn segment(&self, content: &str) -> CapabilityResult<Vec<String>>;
}

/// Segments text at blank lines
#[derive(Debug, Default, Clone, Copy)]
pub struct ParagraphSegmenter;

impl SemanticSegmenter for ParagraphSegmenter {
    fn segment(&self, content: &str) -> CapabilityResult<Vec<String>> {
        Ok(content
            .split("\n\n")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect())
    }
}

#[derive(Serialize)]
struct KnowledgeLine<'a> {
    source: &'a str,
    chunk: &'a crate::chunking::Chunk,
}

/// Appends one JSON line per chunk to a file
pub struct JsonlKnowledgeStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlKnowledgeStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl KnowledgeStore for JsonlKnowledgeStore {
    async fn learn(&self, source: &str, forest: ChunkForest) -> CapabilityResult<LearnOutcome> {
        let mut buffer = String::new();
        let mut ids = Vec::with_capacity(forest.len());
        for chunk in forest.iter() {
            buffer.push_str(&serde_json::to_string(&KnowledgeLine { source, chunk })?);
            buffer.push('\n');
            ids.push(chunk.id.to_string());
        }

        if ids.is_empty() {
            return Ok(LearnOutcome::default());
        }

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| CapabilityError::Knowledge(format!("{}: {}", self.path.display(), e)))?;
        file.write_all(buffer.as_bytes()).await?;
        file.flush().await?;

        debug!("Wrote {} chunks for {} to {}", ids.len(), source, self.path.display());
        info!("Learned {} chunks from {}", ids.len(), source);

        Ok(LearnOutcome {
            chunks_created: ids.len(),
            ids,
        })
    }
}

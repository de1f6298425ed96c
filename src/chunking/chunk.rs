//! Chunk records and the arena that links them

use super::ChunkingStrategy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use uuid::Uuid;

/// Unique identifier of a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(Uuid);

impl ChunkId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChunkId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of content a chunk holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    Text,
    Code,
    Table,
    List,
    Heading,
    Metadata,
    Composite,
}

impl ChunkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Code => "code",
            Self::Table => "table",
            Self::List => "list",
            Self::Heading => "heading",
            Self::Metadata => "metadata",
            Self::Composite => "composite",
        }
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed, metadata-bearing unit of extracted content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub chunk_type: ChunkType,
    pub content: String,

    /// Programming language of a code chunk
    pub language: Option<String>,

    /// 1 to 6 for heading chunks
    pub heading_level: Option<u8>,

    pub source_url: Option<String>,
    pub strategy: ChunkingStrategy,

    /// Position within the document's chunk list
    pub chunk_index: usize,
    pub total_chunks: usize,

    pub char_count: usize,
    pub word_count: usize,
    pub line_count: usize,

    pub created_at: DateTime<Utc>,

    pub tags: BTreeSet<String>,
    pub categories: BTreeSet<String>,

    pub parent_id: Option<ChunkId>,
    pub children: Vec<ChunkId>,

    /// Trailing text before this chunk (size-based splitting only)
    pub preceding_context: Option<String>,

    /// Leading text after this chunk (size-based splitting only)
    pub following_context: Option<String>,
}

impl Chunk {
    /// Creates an unlinked chunk with its content statistics filled in
    pub fn new(chunk_type: ChunkType, content: impl Into<String>, strategy: ChunkingStrategy) -> Self {
        let content = content.into();
        Self {
            id: ChunkId::new(),
            chunk_type,
            char_count: content.chars().count(),
            word_count: content.split_whitespace().count(),
            line_count: content.lines().count().max(1),
            content,
            language: None,
            heading_level: None,
            source_url: None,
            strategy,
            chunk_index: 0,
            total_chunks: 0,
            created_at: Utc::now(),
            tags: BTreeSet::new(),
            categories: BTreeSet::new(),
            parent_id: None,
            children: Vec::new(),
            preceding_context: None,
            following_context: None,
        }
    }

    pub fn with_source(mut self, source_url: Option<&str>) -> Self {
        self.source_url = source_url.map(str::to_string);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn is_heading(&self) -> bool {
        self.chunk_type == ChunkType::Heading
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Arena of chunks in document order, linked by id
///
/// Parent links only ever point backwards in document order, so the
/// structure is always a forest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Chunk>", into = "Vec<Chunk>")]
pub struct ChunkForest {
    chunks: Vec<Chunk>,
    index: HashMap<ChunkId, usize>,
}

impl From<Vec<Chunk>> for ChunkForest {
    fn from(chunks: Vec<Chunk>) -> Self {
        let index = chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| (chunk.id, i))
            .collect();
        Self { chunks, index }
    }
}

impl From<ChunkForest> for Vec<Chunk> {
    fn from(forest: ChunkForest) -> Self {
        forest.chunks
    }
}

impl ChunkForest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk at the end of document order
    pub fn push(&mut self, chunk: Chunk) -> ChunkId {
        let id = chunk.id;
        self.index.insert(id, self.chunks.len());
        self.chunks.push(chunk);
        id
    }

    pub fn get(&self, id: ChunkId) -> Option<&Chunk> {
        self.index.get(&id).map(|&i| &self.chunks[i])
    }

    pub fn position(&self, id: ChunkId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }

    /// Mutable access for metadata passes; ids and links must not be changed
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Chunk> {
        self.chunks.iter_mut()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn ids(&self) -> Vec<ChunkId> {
        self.chunks.iter().map(|c| c.id).collect()
    }

    /// Chunks without a parent
    pub fn roots(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter().filter(|c| c.parent_id.is_none())
    }

    pub fn children_of(&self, id: ChunkId) -> Vec<&Chunk> {
        self.get(id)
            .map(|parent| parent.children.iter().filter_map(|c| self.get(*c)).collect())
            .unwrap_or_default()
    }

    /// Makes `child` a child of `parent`, updating both sides
    ///
    /// Refuses (returning false) when either id is unknown, when the chunk
    /// would parent itself, or when the parent does not precede the child.
    /// A child that already has a parent is moved.
    pub fn attach(&mut self, parent: ChunkId, child: ChunkId) -> bool {
        let (Some(p), Some(c)) = (self.position(parent), self.position(child)) else {
            return false;
        };
        if p >= c {
            return false;
        }

        if let Some(old_parent) = self.chunks[c].parent_id {
            if old_parent == parent {
                return true;
            }
            if let Some(op) = self.position(old_parent) {
                self.chunks[op].children.retain(|id| *id != child);
            }
        }

        self.chunks[c].parent_id = Some(parent);
        self.chunks[p].children.push(child);
        true
    }

    /// Renumbers `chunk_index`/`total_chunks` to match document order
    pub(crate) fn renumber(&mut self) {
        let total = self.chunks.len();
        for (i, chunk) in self.chunks.iter_mut().enumerate() {
            chunk.chunk_index = i;
            chunk.total_chunks = total;
        }
    }

    /// Checks link consistency in both directions and the absence of cycles
    pub fn is_well_formed(&self) -> bool {
        for (i, chunk) in self.chunks.iter().enumerate() {
            if let Some(parent_id) = chunk.parent_id {
                let Some(p) = self.position(parent_id) else {
                    return false;
                };
                if p >= i || !self.chunks[p].children.contains(&chunk.id) {
                    return false;
                }
            }
            for child in &chunk.children {
                match self.get(*child) {
                    Some(c) if c.parent_id == Some(chunk.id) => {}
                    _ => return false,
                }
            }
        }
        true
    }
}

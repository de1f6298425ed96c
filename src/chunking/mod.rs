//! Chunking engine
//!
//! Turns normalized page text into a [`ChunkForest`]: typed chunks in
//! document order, with headings parenting the chunks of their section.
//!
//! # Strategies
//!
//! - `Structural`: code fences, headings and tables become their own chunks
//! - `SizeBased`: fixed-size character windows with overlap
//! - `Semantic`: segments from a [`SemanticSegmenter`], else Structural
//! - `Hybrid` (default): Structural, with oversized text re-split by size

mod chunk;
mod enrich;
mod hierarchy;
mod select;
mod size_based;
mod structural;

pub use chunk::{Chunk, ChunkForest, ChunkId, ChunkType};
pub use enrich::{enrich, PlatformMetadata};
pub use hierarchy::build_hierarchy;
pub use select::select_strategy;
pub use size_based::chunk_by_size;
pub use structural::{chunk_by_structure, identify_structures, Structure};

use crate::capabilities::SemanticSegmenter;
use crate::config::ChunkingConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Tag marking hybrid chunks that came from re-splitting a long text chunk
pub const HYBRID_SPLIT_TAG: &str = "hybrid:text-split";

/// Available chunking strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingStrategy {
    Structural,
    SizeBased,
    Semantic,
    #[default]
    Hybrid,
}

impl ChunkingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Structural => "structural",
            Self::SizeBased => "size_based",
            Self::Semantic => "semantic",
            Self::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for ChunkingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Runs chunking strategies with the configured sizes
#[derive(Clone, Default)]
pub struct ChunkingEngine {
    config: ChunkingConfig,
    segmenter: Option<Arc<dyn SemanticSegmenter>>,
}

impl fmt::Debug for ChunkingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkingEngine")
            .field("config", &self.config)
            .field("segmenter", &self.segmenter.is_some())
            .finish()
    }
}

impl ChunkingEngine {
    pub fn new(config: ChunkingConfig) -> Self {
        Self {
            config,
            segmenter: None,
        }
    }

    /// Enables the semantic strategy
    pub fn with_segmenter(mut self, segmenter: Arc<dyn SemanticSegmenter>) -> Self {
        self.segmenter = Some(segmenter);
        self
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Chunks content with the configured default strategy
    pub fn chunk_default(&self, content: &str, source_url: &str) -> ChunkForest {
        self.chunk(content, source_url, self.config.default_strategy)
    }

    /// Chunks content with the given strategy
    ///
    /// Chunk indices and totals are numbered over the final forest.
    #[instrument(skip(self, content), fields(len = content.len()))]
    pub fn chunk(&self, content: &str, source_url: &str, strategy: ChunkingStrategy) -> ChunkForest {
        let source = Some(source_url).filter(|s| !s.is_empty());

        let mut forest = match strategy {
            ChunkingStrategy::Structural => self.structural(content, source),
            ChunkingStrategy::SizeBased => ChunkForest::from(chunk_by_size(
                content,
                self.config.max_chunk_size,
                self.config.overlap_size,
                source,
            )),
            ChunkingStrategy::Semantic => self.semantic(content, source),
            ChunkingStrategy::Hybrid => self.hybrid(content, source),
        };

        forest.renumber();
        debug!("Chunked {} into {} chunks ({})", source_url, forest.len(), strategy);
        forest
    }

    fn structural(&self, content: &str, source: Option<&str>) -> ChunkForest {
        let mut forest = ChunkForest::from(chunk_by_structure(content, source));
        build_hierarchy(&mut forest);
        forest
    }

    fn semantic(&self, content: &str, source: Option<&str>) -> ChunkForest {
        let Some(segmenter) = &self.segmenter else {
            return self.structural(content, source);
        };

        match segmenter.segment(content) {
            Ok(segments) => ChunkForest::from(
                segments
                    .into_iter()
                    .filter(|s| !s.trim().is_empty())
                    .map(|s| {
                        Chunk::new(ChunkType::Text, s.trim(), ChunkingStrategy::Semantic)
                            .with_source(source)
                    })
                    .collect::<Vec<_>>(),
            ),
            Err(e) => {
                warn!("Semantic segmentation failed, using structural chunking: {}", e);
                self.structural(content, source)
            }
        }
    }

    fn hybrid(&self, content: &str, source: Option<&str>) -> ChunkForest {
        let mut refined = Vec::new();

        for mut chunk in chunk_by_structure(content, source) {
            if chunk.chunk_type == ChunkType::Text
                && chunk.char_count > self.config.hybrid_split_threshold
            {
                for mut piece in chunk_by_size(
                    &chunk.content,
                    self.config.max_chunk_size,
                    self.config.overlap_size,
                    source,
                ) {
                    piece.strategy = ChunkingStrategy::Hybrid;
                    piece.tags.insert(HYBRID_SPLIT_TAG.to_string());
                    refined.push(piece);
                }
            } else {
                chunk.strategy = ChunkingStrategy::Hybrid;
                refined.push(chunk);
            }
        }

        let mut forest = ChunkForest::from(refined);
        build_hierarchy(&mut forest);
        forest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{CapabilityError, CapabilityResult, ParagraphSegmenter};

    const SCENARIO: &str = "# Title\n\nIntro text.\n\n```python\nprint(1)\n```\n\nMore text.";
    const SOURCE: &str = "https://example.com/doc";

    #[test]
    fn test_hybrid_scenario() {
        let forest = ChunkingEngine::default().chunk(SCENARIO, SOURCE, ChunkingStrategy::Hybrid);
        let chunks = forest.chunks();

        let headings: Vec<&Chunk> = chunks.iter().filter(|c| c.is_heading()).collect();
        assert_eq!(headings.len(), 1);
        assert_eq!(headings[0].content, "Title");
        assert_eq!(headings[0].heading_level, Some(1));

        let code: Vec<&Chunk> = chunks.iter().filter(|c| c.chunk_type == ChunkType::Code).collect();
        assert_eq!(code.len(), 1);
        assert!(code[0].has_tag("lang:python"));

        let texts: Vec<&Chunk> = chunks.iter().filter(|c| c.chunk_type == ChunkType::Text).collect();
        assert!(texts.iter().any(|c| c.content.contains("Intro text.")));
        assert!(texts.iter().any(|c| c.content.contains("More text.")));

        let title = headings[0];
        let following: Vec<ChunkId> = chunks.iter().skip(1).map(|c| c.id).collect();
        assert_eq!(title.children, following);
        assert!(chunks.iter().all(|c| c.strategy == ChunkingStrategy::Hybrid));
        assert!(forest.is_well_formed());
    }

    #[test]
    fn test_hybrid_splits_long_text() {
        let long = "lorem ipsum dolor sit amet ".repeat(100);
        let content = format!("# Heading\n\n{}", long);
        let forest = ChunkingEngine::default().chunk(&content, SOURCE, ChunkingStrategy::Hybrid);

        let pieces: Vec<&Chunk> = forest.iter().filter(|c| c.has_tag(HYBRID_SPLIT_TAG)).collect();
        assert!(pieces.len() > 1);
        assert!(pieces.iter().all(|c| c.char_count <= 1000));
        assert!(pieces.iter().all(|c| c.strategy == ChunkingStrategy::Hybrid));

        let heading = forest.iter().next().unwrap();
        assert_eq!(heading.children.len(), pieces.len());
    }

    #[test]
    fn test_indices_cover_final_forest() {
        let forest = ChunkingEngine::default().chunk(SCENARIO, SOURCE, ChunkingStrategy::Hybrid);
        for (i, chunk) in forest.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i);
            assert_eq!(chunk.total_chunks, forest.len());
            assert_eq!(chunk.source_url.as_deref(), Some(SOURCE));
        }
    }

    #[test]
    fn test_structural_builds_hierarchy() {
        let forest =
            ChunkingEngine::default().chunk(SCENARIO, SOURCE, ChunkingStrategy::Structural);
        assert_eq!(forest.roots().count(), 1);
        assert!(forest.iter().all(|c| c.strategy == ChunkingStrategy::Structural));
    }

    #[test]
    fn test_size_based_is_flat() {
        let config = ChunkingConfig {
            max_chunk_size: 20,
            overlap_size: 5,
            ..ChunkingConfig::default()
        };
        let forest = ChunkingEngine::new(config).chunk(SCENARIO, SOURCE, ChunkingStrategy::SizeBased);
        assert!(forest.len() > 1);
        assert_eq!(forest.roots().count(), forest.len());
        assert!(forest.iter().all(|c| c.char_count <= 20));
    }

    #[test]
    fn test_semantic_without_segmenter_falls_back() {
        let forest = ChunkingEngine::default().chunk(SCENARIO, SOURCE, ChunkingStrategy::Semantic);
        assert!(forest.iter().all(|c| c.strategy == ChunkingStrategy::Structural));
        assert_eq!(forest.len(), 4);
    }

    #[test]
    fn test_semantic_with_segmenter() {
        let engine = ChunkingEngine::default().with_segmenter(Arc::new(ParagraphSegmenter));
        let forest = engine.chunk("one\n\ntwo\n\nthree", SOURCE, ChunkingStrategy::Semantic);
        let contents: Vec<&str> = forest.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
        assert!(forest.iter().all(|c| c.strategy == ChunkingStrategy::Semantic));
    }

    struct FailingSegmenter;

    impl SemanticSegmenter for FailingSegmenter {
        fn segment(&self, _content: &str) -> CapabilityResult<Vec<String>> {
            Err(CapabilityError::Knowledge("offline".to_string()))
        }
    }

    #[test]
    fn test_semantic_segmenter_error_falls_back() {
        let engine = ChunkingEngine::default().with_segmenter(Arc::new(FailingSegmenter));
        let forest = engine.chunk(SCENARIO, SOURCE, ChunkingStrategy::Semantic);
        assert_eq!(forest.len(), 4);
        assert!(forest.iter().all(|c| c.strategy == ChunkingStrategy::Structural));
    }

    #[test]
    fn test_strategy_deserializes_snake_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            strategy: ChunkingStrategy,
        }
        let w: Wrapper = toml::from_str("strategy = \"size_based\"").unwrap();
        assert_eq!(w.strategy, ChunkingStrategy::SizeBased);
        assert_eq!(ChunkingStrategy::default(), ChunkingStrategy::Hybrid);
    }

    #[test]
    fn test_empty_content() {
        let forest = ChunkingEngine::default().chunk("", SOURCE, ChunkingStrategy::Hybrid);
        assert!(forest.is_empty());
    }
}

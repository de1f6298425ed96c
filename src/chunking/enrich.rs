//! Metadata enrichment pass

use super::{ChunkForest, ChunkType};
use serde::{Deserialize, Serialize};

/// Longest title prefix kept in a `source:` tag, in characters
const SOURCE_TITLE_CHARS: usize = 50;

/// Platform facts stamped onto every chunk of a document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformMetadata {
    /// Platform name; `"unknown"` when absent
    pub platform: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl PlatformMetadata {
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: Some(platform.into()),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}

/// Adds platform/source tags and type categories to every chunk
pub fn enrich(forest: &mut ChunkForest, metadata: &PlatformMetadata) {
    let platform = metadata.platform.as_deref().unwrap_or("unknown");
    let source_tag = metadata
        .title
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(|t| format!("source:{}", t.chars().take(SOURCE_TITLE_CHARS).collect::<String>()));

    for chunk in forest.iter_mut() {
        chunk.tags.insert(format!("platform:{}", platform));
        chunk.tags.extend(metadata.tags.iter().cloned());
        if let Some(tag) = &source_tag {
            chunk.tags.insert(tag.clone());
        }

        match chunk.chunk_type {
            ChunkType::Code => {
                chunk.categories.insert("code".to_string());
                if let Some(lang) = &chunk.language {
                    chunk.categories.insert(format!("lang-{}", lang));
                }
            }
            ChunkType::Heading => {
                chunk.categories.insert("structure".to_string());
                if let Some(level) = chunk.heading_level {
                    chunk.categories.insert(format!("heading-h{}", level));
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::{Chunk, ChunkingStrategy};

    fn forest() -> ChunkForest {
        let mut code = Chunk::new(ChunkType::Code, "x = 1", ChunkingStrategy::Structural);
        code.language = Some("python".to_string());
        let mut heading = Chunk::new(ChunkType::Heading, "Intro", ChunkingStrategy::Structural);
        heading.heading_level = Some(2);
        let text = Chunk::new(ChunkType::Text, "words", ChunkingStrategy::Structural);
        ChunkForest::from(vec![heading, code, text])
    }

    #[test]
    fn test_enrich_tags_and_categories() {
        let mut forest = forest();
        let metadata = PlatformMetadata::new("pypi")
            .with_title("Requests")
            .with_tags(["http", "python"]);
        enrich(&mut forest, &metadata);

        for chunk in forest.iter() {
            assert!(chunk.has_tag("platform:pypi"));
            assert!(chunk.has_tag("http"));
            assert!(chunk.has_tag("python"));
            assert!(chunk.has_tag("source:Requests"));
        }

        let chunks = forest.chunks();
        assert!(chunks[0].categories.contains("structure"));
        assert!(chunks[0].categories.contains("heading-h2"));
        assert!(chunks[1].categories.contains("code"));
        assert!(chunks[1].categories.contains("lang-python"));
        assert!(chunks[2].categories.is_empty());
    }

    #[test]
    fn test_unknown_platform_and_no_title() {
        let mut forest = forest();
        enrich(&mut forest, &PlatformMetadata::default());

        let chunk = &forest.chunks()[2];
        assert!(chunk.has_tag("platform:unknown"));
        assert!(!chunk.tags.iter().any(|t| t.starts_with("source:")));
    }

    #[test]
    fn test_source_tag_truncated() {
        let mut forest = forest();
        let title = "t".repeat(80);
        enrich(&mut forest, &PlatformMetadata::new("web").with_title(title));

        let tag = forest.chunks()[0]
            .tags
            .iter()
            .find(|t| t.starts_with("source:"))
            .cloned()
            .unwrap();
        assert_eq!(tag.chars().count(), "source:".len() + 50);
    }
}

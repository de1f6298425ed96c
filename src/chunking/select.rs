//! Automatic strategy selection from content shape

use super::ChunkingStrategy;

const CODE_PLATFORMS: &[&str] = &["github", "crates"];
const DOC_PLATFORMS: &[&str] = &["pypi", "npm"];

/// Picks a chunking strategy for a document
///
/// - Code platforms, or two or more fenced blocks: Structural
/// - Many `#` markers, long content, or package-doc platforms: Hybrid
/// - Short content (under 1000 chars): Structural
/// - Anything else: Semantic
pub fn select_strategy(content: &str, platform: Option<&str>) -> ChunkingStrategy {
    let platform = platform.map(str::to_lowercase);
    let on = |list: &[&str]| platform.as_deref().is_some_and(|p| list.contains(&p));

    if on(CODE_PLATFORMS) || content.matches("```").count() >= 4 {
        return ChunkingStrategy::Structural;
    }

    let length = content.chars().count();
    if content.matches('#').count() > 3 || length > 5000 || on(DOC_PLATFORMS) {
        return ChunkingStrategy::Hybrid;
    }

    if length < 1000 {
        return ChunkingStrategy::Structural;
    }

    ChunkingStrategy::Semantic
}

//! Structure-aware chunking over markdown-like text
//!
//! Code fences, ATX headings and pipe-table runs become their own chunks;
//! the text between them becomes Text chunks. Unterminated fences simply
//! never match, so they stay part of the surrounding text.

use super::{Chunk, ChunkType, ChunkingStrategy};
use regex::Regex;
use std::sync::LazyLock;

static CODE_BLOCK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(\w+)?\s*(.*?)\s*```").expect("code fence regex is valid")
});

static HEADING_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(#{1,6})[ \t]+(.+)$").expect("heading regex is valid"));

static TABLE_LINE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\|.*\|[ \t\r]*$").expect("table line regex is valid"));

/// A structural element located in the source text (byte offsets)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Structure {
    pub kind: ChunkType,
    pub start: usize,
    pub end: usize,
    pub content: String,
    pub language: Option<String>,
    pub heading_level: Option<u8>,
}

/// Locates code fences, headings and tables, sorted by start offset
///
/// Elements overlapping an earlier one (a `#` line inside a code fence,
/// say) are dropped.
pub fn identify_structures(content: &str) -> Vec<Structure> {
    let mut found = Vec::new();

    for caps in CODE_BLOCK_PATTERN.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        found.push(Structure {
            kind: ChunkType::Code,
            start: whole.start(),
            end: whole.end(),
            content: caps.get(2).map_or("", |m| m.as_str()).trim().to_string(),
            language: Some(
                caps.get(1)
                    .map_or("unknown", |m| m.as_str())
                    .to_string(),
            ),
            heading_level: None,
        });
    }

    for caps in HEADING_PATTERN.captures_iter(content) {
        let (Some(whole), Some(hashes), Some(text)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let text = text.as_str().trim();
        if text.is_empty() {
            continue;
        }
        found.push(Structure {
            kind: ChunkType::Heading,
            start: whole.start(),
            end: whole.end(),
            content: text.to_string(),
            language: None,
            heading_level: Some(hashes.as_str().len() as u8),
        });
    }

    found.extend(table_runs(content));

    found.sort_by_key(|s| s.start);

    let mut accepted: Vec<Structure> = Vec::with_capacity(found.len());
    for structure in found {
        if accepted.last().is_some_and(|prev| structure.start < prev.end) {
            continue;
        }
        accepted.push(structure);
    }
    accepted
}

/// Groups consecutive pipe-table lines into one structure per run
fn table_runs(content: &str) -> Vec<Structure> {
    let mut runs: Vec<(usize, usize)> = Vec::new();

    for line in TABLE_LINE_PATTERN.find_iter(content) {
        match runs.last_mut() {
            Some((_, end)) if is_line_break(&content[*end..line.start()]) => *end = line.end(),
            _ => runs.push((line.start(), line.end())),
        }
    }

    runs.into_iter()
        .map(|(start, end)| Structure {
            kind: ChunkType::Table,
            start,
            end,
            content: content[start..end].trim_end().to_string(),
            language: None,
            heading_level: None,
        })
        .collect()
}

fn is_line_break(between: &str) -> bool {
    between == "\n" || between == "\r\n"
}

/// Chunks content along its structural boundaries
///
/// Chunks come back in document order, unlinked and unnumbered.
pub fn chunk_by_structure(content: &str, source_url: Option<&str>) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut last_end = 0;

    let text_chunk = |text: &str| {
        Chunk::new(ChunkType::Text, text, ChunkingStrategy::Structural).with_source(source_url)
    };

    for structure in identify_structures(content) {
        let before = content[last_end..structure.start].trim();
        if !before.is_empty() {
            chunks.push(text_chunk(before));
        }

        let mut chunk = Chunk::new(structure.kind, structure.content, ChunkingStrategy::Structural)
            .with_source(source_url);
        match structure.kind {
            ChunkType::Code => {
                if let Some(lang) = &structure.language {
                    chunk.tags.insert(format!("lang:{}", lang));
                }
                chunk.language = structure.language;
            }
            ChunkType::Heading => {
                if let Some(level) = structure.heading_level {
                    chunk.tags.insert(format!("heading:h{}", level));
                }
                chunk.heading_level = structure.heading_level;
            }
            _ => {}
        }
        chunks.push(chunk);
        last_end = structure.end;
    }

    let rest = content[last_end..].trim();
    if !rest.is_empty() {
        chunks.push(text_chunk(rest));
    }

    chunks
}

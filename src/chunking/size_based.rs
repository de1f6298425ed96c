//! Fixed-size chunking with overlap
//!
//! Sizes and offsets are counted in characters, never bytes, so multi-byte
//! text is never split inside a code point.

use super::{Chunk, ChunkType, ChunkingStrategy};

/// Longest preceding/following context kept on each chunk
const CONTEXT_CHARS: usize = 100;

/// Splits content into chunks of at most `max_size` characters
///
/// A split that would land mid-word backs up to the last space in range.
/// Each following chunk starts `overlap` characters before the previous
/// end, but always strictly after the previous start.
///
/// # Arguments
///
/// * `content` - Text to split
/// * `max_size` - Maximum characters per chunk (must be non-zero)
/// * `overlap` - Characters repeated at the start of the next chunk
/// * `source_url` - Source recorded on every chunk
pub fn chunk_by_size(
    content: &str,
    max_size: usize,
    overlap: usize,
    source_url: Option<&str>,
) -> Vec<Chunk> {
    let chars: Vec<char> = content.chars().collect();
    let len = chars.len();
    let max_size = max_size.max(1);
    let slice = |from: usize, to: usize| chars[from..to].iter().collect::<String>();

    let mut chunks: Vec<Chunk> = Vec::new();
    let mut start = 0;

    while start < len {
        let mut end = (start + max_size).min(len);

        if end < len {
            if let Some(space) = (start + 1..end).rev().find(|&i| chars[i] == ' ') {
                end = space;
            }
        }

        let text = slice(start, end);
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            let mut chunk = Chunk::new(ChunkType::Text, trimmed, ChunkingStrategy::SizeBased)
                .with_source(source_url);
            chunk.chunk_index = chunks.len();

            if !chunks.is_empty() && start > 0 {
                let preceding = slice(start.saturating_sub(overlap), start);
                let tail: String = tail_chars(&preceding, CONTEXT_CHARS);
                chunk.preceding_context = Some(tail).filter(|s| !s.is_empty());
            }
            if end < len {
                let following = slice(end, (end + overlap).min(len));
                let head: String = following.chars().take(CONTEXT_CHARS).collect();
                chunk.following_context = Some(head).filter(|s| !s.is_empty());
            }

            chunks.push(chunk);
        }

        if end >= len {
            break;
        }
        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { end };
    }

    let total = chunks.len();
    for chunk in &mut chunks {
        chunk.total_chunks = total;
    }
    chunks
}

fn tail_chars(text: &str, n: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(n)).collect()
}

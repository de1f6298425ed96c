//! Pluggable collaborators around the crawl core
//!
//! Each capability is a trait plus an ordered registry of implementations.
//! Registries are composed explicitly at startup; the first implementation
//! that claims an input handles it.
//!
//! # Components
//!
//! - [`ContentProcessor`]: converts binary content types (audio, images) to text
//! - [`PlatformParser`]: platform-aware rewriting of crawled pages before chunking
//! - [`KnowledgeStore`]: receives finished chunk forests
//! - [`SemanticSegmenter`]: splits text for the semantic chunking strategy

mod knowledge;
mod parsers;
mod processors;

pub use knowledge::{
    JsonlKnowledgeStore, KnowledgeStore, LearnOutcome, ParagraphSegmenter, SemanticSegmenter,
};
pub use parsers::{
    CratesParser, GithubParser, NpmParser, ParseResult, ParserRegistry, PlatformParser, PypiParser,
};
pub use processors::{
    AudioProcessor, ContentProcessor, ImageProcessor, PdfProcessor, ProcessorRegistry,
};

use thiserror::Error;

/// Errors raised by capability implementations
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("No processor available for content type: {0}")]
    Unsupported(String),

    #[error("No parser available for URL: {0}")]
    NoParser(String),

    #[error("Processing failed for {url}: {message}")]
    Processing { url: String, message: String },

    #[error("Knowledge store error: {0}")]
    Knowledge(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for capability operations
pub type CapabilityResult<T> = Result<T, CapabilityError>;

//! Content processors for non-text media types
//!
//! PDF text is extracted with `pdf-extract`; audio and image bodies get a
//! short description only.

use super::{CapabilityError, CapabilityResult};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Strips parameters and case from a `Content-Type` value
///
/// `"Audio/MPEG; charset=x"` becomes `"audio/mpeg"`.
fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

/// Converts raw bytes of some media type into markdown text
#[async_trait]
pub trait ContentProcessor: Send + Sync {
    fn name(&self) -> &str;

    /// Returns true if this processor handles the given `Content-Type`
    fn can_process(&self, content_type: &str) -> bool;

    async fn process(&self, content: &[u8], url: &str) -> CapabilityResult<String>;
}

const PDF_TYPES: &[&str] = &["application/pdf", "application/x-pdf"];
const AUDIO_TYPES: &[&str] = &["audio/mpeg", "audio/mp3", "audio/wav", "audio/ogg"];
const IMAGE_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/gif", "image/webp"];

/// Extracts the text layer of PDF documents
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfProcessor;

#[async_trait]
impl ContentProcessor for PdfProcessor {
    fn name(&self) -> &str {
        "pdf"
    }

    fn can_process(&self, content_type: &str) -> bool {
        PDF_TYPES.contains(&media_type(content_type).as_str())
    }

    async fn process(&self, content: &[u8], url: &str) -> CapabilityResult<String> {
        let processing_error = |message: String| CapabilityError::Processing {
            url: url.to_string(),
            message,
        };

        // Extraction is CPU-bound and can panic on malformed documents
        let bytes = content.to_vec();
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| processing_error(format!("PDF extraction aborted: {}", e)))?
            .map_err(|e| processing_error(format!("Invalid PDF: {}", e)))?;

        let text = text.trim();
        debug!("Extracted {} characters of PDF text from {}", text.len(), url);
        if text.is_empty() {
            return Ok(format!(
                "# PDF Document from {}\n\nNo extractable text layer.\n\n**Size:** {} bytes\n",
                url,
                content.len()
            ));
        }
        Ok(format!("# PDF Document from {}\n\n{}\n", url, text))
    }
}

/// Placeholder description of audio content
#[derive(Debug, Default, Clone, Copy)]
pub struct AudioProcessor;

#[async_trait]
impl ContentProcessor for AudioProcessor {
    fn name(&self) -> &str {
        "audio"
    }

    fn can_process(&self, content_type: &str) -> bool {
        AUDIO_TYPES.contains(&media_type(content_type).as_str())
    }

    async fn process(&self, content: &[u8], url: &str) -> CapabilityResult<String> {
        Ok(format!(
            "# Audio Content from {}\n\nAudio content detected; transcription is not available.\n\n**Size:** {} bytes\n",
            url,
            content.len()
        ))
    }
}

/// Placeholder description of image content
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageProcessor;

#[async_trait]
impl ContentProcessor for ImageProcessor {
    fn name(&self) -> &str {
        "image"
    }

    fn can_process(&self, content_type: &str) -> bool {
        IMAGE_TYPES.contains(&media_type(content_type).as_str())
    }

    async fn process(&self, content: &[u8], url: &str) -> CapabilityResult<String> {
        Ok(format!(
            "# Image Content from {}\n\nImage content detected; text recognition is not available.\n\n**Size:** {} bytes\n",
            url,
            content.len()
        ))
    }
}

/// Ordered list of content processors; the first match wins
#[derive(Default)]
pub struct ProcessorRegistry {
    processors: Vec<Box<dyn ContentProcessor>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in PDF, audio and image processors
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(PdfProcessor));
        registry.register(Box::new(AudioProcessor));
        registry.register(Box::new(ImageProcessor));
        registry
    }

    pub fn register(&mut self, processor: Box<dyn ContentProcessor>) {
        self.processors.push(processor);
    }

    pub fn find(&self, content_type: &str) -> Option<&dyn ContentProcessor> {
        self.processors
            .iter()
            .find(|p| p.can_process(content_type))
            .map(|p| p.as_ref())
    }

    pub fn can_process(&self, content_type: &str) -> bool {
        self.find(content_type).is_some()
    }

    /// Converts content with the first processor that claims its type
    #[instrument(skip(self, content), fields(size = content.len()))]
    pub async fn process(
        &self,
        content: &[u8],
        content_type: &str,
        url: &str,
    ) -> CapabilityResult<String> {
        let processor = self
            .find(content_type)
            .ok_or_else(|| CapabilityError::Unsupported(content_type.to_string()))?;
        debug!("Processing {} with {} processor", url, processor.name());
        processor.process(content, url).await
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type() {
        assert_eq!(media_type("Audio/MPEG; charset=x"), "audio/mpeg");
        assert_eq!(media_type("image/png"), "image/png");
        assert_eq!(media_type(""), "");
    }

    #[test]
    fn test_processor_claims() {
        assert!(AudioProcessor.can_process("audio/ogg"));
        assert!(!AudioProcessor.can_process("image/png"));
        assert!(ImageProcessor.can_process("image/webp"));
        assert!(!ImageProcessor.can_process("application/pdf"));
        assert!(PdfProcessor.can_process("application/pdf"));
        assert!(PdfProcessor.can_process("Application/PDF; qs=0.9"));
        assert!(!PdfProcessor.can_process("text/html"));
    }

    #[tokio::test]
    async fn test_pdf_processor_rejects_non_pdf() {
        let err = PdfProcessor
            .process(b"<html>not a pdf</html>", "https://example.com/a.pdf")
            .await
            .unwrap_err();
        match err {
            CapabilityError::Processing { url, .. } => assert_eq!(url, "https://example.com/a.pdf"),
            other => panic!("expected a processing error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_registry_dispatch() {
        let registry = ProcessorRegistry::with_defaults();
        assert_eq!(registry.len(), 3);
        assert!(registry.can_process("application/pdf"));

        let text = registry
            .process(&[0u8; 42], "image/png", "https://example.com/a.png")
            .await
            .unwrap();
        assert!(text.starts_with("# Image Content from https://example.com/a.png"));
        assert!(text.contains("**Size:** 42 bytes"));
    }

    #[tokio::test]
    async fn test_registry_unsupported_type() {
        let registry = ProcessorRegistry::with_defaults();
        let err = registry
            .process(b"\x00\x01", "video/mp4", "https://example.com/a.mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::Unsupported(t) if t == "video/mp4"));
    }

    #[test]
    fn test_empty_registry_claims_nothing() {
        let registry = ProcessorRegistry::new();
        assert!(registry.is_empty());
        assert!(!registry.can_process("audio/mpeg"));
    }
}

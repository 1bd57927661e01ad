use super::{Document, ExtractionError, NormalizedText, TextExtractor};
use tracing::debug;

const PDF_MIME: &str = "application/pdf";

/// Extracts text from PDF documents with `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, document: &Document) -> Result<NormalizedText, ExtractionError> {
        match infer::get(&document.bytes) {
            Some(kind) if kind.mime_type() == PDF_MIME => {}
            Some(kind) => return Err(ExtractionError::NotPdf(kind.mime_type().to_string())),
            None => return Err(ExtractionError::NotPdf("unknown".to_string())),
        }

        // pdf-extract panics on some malformed files.
        let bytes = document.bytes.as_slice();
        let raw = match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return Err(ExtractionError::Parse(e.to_string())),
            Err(_) => {
                return Err(ExtractionError::Parse(
                    "extraction panicked (malformed file)".to_string(),
                ))
            }
        };

        let text = NormalizedText::normalize(&raw);
        if text.is_empty() {
            return Err(ExtractionError::Empty);
        }
        debug!(
            "Extracted {} characters of text from {}",
            text.len(),
            document.source_url
        );
        Ok(text)
    }
}

//! Retrieval of the daily gazette and its conversion to searchable text.

mod extract;
mod normalize;
mod source;

pub use extract::PdfTextExtractor;
pub use normalize::NormalizedText;
pub use source::{resolve_document_url, HttpGazetteSource};

use async_trait::async_trait;
use thiserror::Error;

/// Raw bytes of a downloaded gazette edition.
#[derive(Debug, Clone)]
pub struct Document {
    /// URL the bytes were actually downloaded from.
    pub source_url: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("no document link found on {0}")]
    DocumentLinkNotFound(String),

    #[error("document at {0} is empty")]
    EmptyDocument(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("document is not a PDF (detected: {0})")]
    NotPdf(String),

    #[error("failed to parse PDF: {0}")]
    Parse(String),

    #[error("document contains no text")]
    Empty,
}

/// Where the gazette comes from. Each call is exactly one attempt.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch_document(&self) -> Result<Document, FetchError>;
}

/// Turns a document into normalized text. Each call is exactly one attempt.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, document: &Document) -> Result<NormalizedText, ExtractionError>;
}

//! Outgoing email: message types, the sending trait and its Brevo implementation.

mod brevo;
mod templates;

pub use brevo::{BrevoMailer, BrevoSettings, DEFAULT_BREVO_API_URL};
pub use templates::{
    html_escape, HtmlTemplates, RenderedEmail, Template, TemplateParams, TemplateRenderer,
    FAILURE_SUBJECT, MATCH_SUBJECT,
};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    pub html_body: String,
}

/// Acknowledgement returned by the mail provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailReceipt {
    pub message_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mail provider rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Sends a single email. No retries happen at this level.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<MailReceipt, MailError>;
}

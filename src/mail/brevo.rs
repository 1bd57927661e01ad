//! Brevo (formerly Sendinblue) transactional email client.

use super::{MailError, MailReceipt, Mailer, OutgoingEmail};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BREVO_API_URL: &str = "https://api.brevo.com/v3/smtp/email";

#[derive(Debug, Clone)]
pub struct BrevoSettings {
    pub api_url: String,
    pub api_key: String,
    pub sender_email: String,
    pub sender_name: String,
    pub timeout_sec: u64,
}

pub struct BrevoMailer {
    client: reqwest::Client,
    settings: BrevoSettings,
}

#[derive(Serialize)]
struct Contact<'a> {
    email: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailRequest<'a> {
    sender: Contact<'a>,
    to: Vec<Contact<'a>>,
    subject: &'a str,
    html_content: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailResponse {
    message_id: Option<String>,
}

impl BrevoMailer {
    pub fn new(settings: BrevoSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_sec))
            .build()
            .context("Failed to create Brevo HTTP client")?;

        Ok(Self { client, settings })
    }
}

#[async_trait]
impl Mailer for BrevoMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<MailReceipt, MailError> {
        let request = SendEmailRequest {
            sender: Contact {
                email: &self.settings.sender_email,
                name: &self.settings.sender_name,
            },
            to: vec![Contact {
                email: &email.to_email,
                name: &email.to_name,
            }],
            subject: &email.subject,
            html_content: &email.html_body,
        };

        let response = self
            .client
            .post(&self.settings.api_url)
            .header("api-key", &self.settings.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        // A success without a parseable body still counts as delivered.
        let message_id = response
            .json::<SendEmailResponse>()
            .await
            .ok()
            .and_then(|r| r.message_id);
        debug!(to = %email.to_email, ?message_id, "Email accepted by Brevo");

        Ok(MailReceipt { message_id })
    }
}

//! HTTP source for the gazette.
//!
//! The publisher does not expose a stable file URL: the landing page links (or
//! embeds) the current edition, so the page is fetched and parsed first to find
//! the PDF, which is then downloaded.

use super::{Document, DocumentSource, FetchError};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub struct HttpGazetteSource {
    client: reqwest::Client,
    landing_url: Url,
}

impl HttpGazetteSource {
    pub fn new(landing_url: &str, timeout_sec: u64) -> anyhow::Result<Self> {
        let landing_url = Url::parse(landing_url)
            .with_context(|| format!("Invalid gazette URL: {}", landing_url))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            landing_url,
        })
    }

    pub fn landing_url(&self) -> &Url {
        &self.landing_url
    }

    async fn get(&self, url: &Url) -> Result<reqwest::Response, FetchError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn download(&self, response: reqwest::Response) -> Result<Document, FetchError> {
        let source_url = response.url().to_string();
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(FetchError::EmptyDocument(source_url));
        }
        debug!(url = %source_url, size = bytes.len(), "Downloaded gazette document");
        Ok(Document {
            source_url,
            bytes: bytes.to_vec(),
        })
    }
}

fn is_pdf_response(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.trim().to_ascii_lowercase().starts_with("application/pdf"))
        .unwrap_or(false)
}

#[async_trait]
impl DocumentSource for HttpGazetteSource {
    async fn fetch_document(&self) -> Result<Document, FetchError> {
        debug!(url = %self.landing_url, "Fetching gazette landing page");
        let response = self.get(&self.landing_url).await?;

        // Some days the landing page redirects straight to the file.
        if is_pdf_response(&response) {
            return self.download(response).await;
        }

        let page_url = response.url().clone();
        let html = response.text().await?;
        let document_url = resolve_document_url(&html, &page_url)
            .ok_or_else(|| FetchError::DocumentLinkNotFound(page_url.to_string()))?;
        info!(url = %document_url, "Resolved gazette document URL");

        let response = self.get(&document_url).await?;
        self.download(response).await
    }
}

fn looks_like_pdf(url: &Url) -> bool {
    url.path().to_ascii_lowercase().ends_with(".pdf")
}

fn join_candidate(base: &Url, raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') || raw.to_ascii_lowercase().starts_with("javascript:") {
        return None;
    }
    base.join(raw).ok()
}

/// Finds the gazette document on a landing page.
///
/// In order of preference: a link to a `.pdf`, an embedded `.pdf` viewer, and
/// finally a link carrying the `download` attribute (the page's download
/// button). Relative URLs are resolved against `base`.
pub fn resolve_document_url(html: &str, base: &Url) -> Option<Url> {
    let document = Html::parse_document(html);

    let lookups: [(&str, &str, bool); 5] = [
        ("a[href]", "href", true),
        ("iframe[src]", "src", true),
        ("embed[src]", "src", true),
        ("object[data]", "data", true),
        ("a[download][href]", "href", false),
    ];

    for (selector, attribute, require_pdf) in lookups {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };
        let found = document
            .select(&selector)
            .filter_map(|el| el.value().attr(attribute))
            .filter_map(|raw| join_candidate(base, raw))
            .find(|url| !require_pdf || looks_like_pdf(url));
        if found.is_some() {
            return found;
        }
    }
    None
}

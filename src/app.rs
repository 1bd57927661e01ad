//! Assembles the production pipeline from resolved configuration.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::config::AppConfig;
use crate::gazette::{HttpGazetteSource, PdfTextExtractor};
use crate::mail::{BrevoMailer, BrevoSettings, HtmlTemplates};
use crate::notifier::Notifier;
use crate::pipeline::{
    GazettePipeline, PipelineComponents, PipelineSettings, RetryPolicy, SystemClock,
};
use crate::registry::SqliteRegistry;

pub fn build_pipeline(config: &AppConfig, registry: Arc<SqliteRegistry>) -> Result<GazettePipeline> {
    let source = HttpGazetteSource::new(&config.gazette_url, config.http_timeout_sec)?;
    let mailer = BrevoMailer::new(BrevoSettings {
        api_url: config.mail.api_url.clone(),
        api_key: config.mail.api_key.clone(),
        sender_email: config.mail.sender_email.clone(),
        sender_name: config.mail.sender_name.clone(),
        timeout_sec: config.http_timeout_sec,
    })?;
    let notifier = Notifier::new(
        Arc::new(mailer),
        registry.clone(),
        Arc::new(HtmlTemplates),
        config.mail.logo_url.clone(),
    );

    info!(
        "Pipeline configured: {} attempts, {:?} between attempts, earliest hour {}",
        config.max_retries, config.retry_interval, config.earliest_run_hour
    );

    Ok(GazettePipeline::new(
        PipelineComponents {
            source: Arc::new(source),
            extractor: Arc::new(PdfTextExtractor::new()),
            registry: registry.clone(),
            state_store: registry,
            notifier,
            calendar: config.calendar.clone(),
            clock: Arc::new(SystemClock),
        },
        PipelineSettings {
            retry: RetryPolicy::new(config.max_retries, config.retry_interval),
            earliest_run_hour: config.earliest_run_hour,
        },
    ))
}

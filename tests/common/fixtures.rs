//! Pipeline assembled against the mock servers and a temporary registry.

use super::constants::*;
use super::mock_servers::{MockBrevo, MockGazette};
use chrono::NaiveDateTime;
use gazette_watcher::calendar::CalendarGate;
use gazette_watcher::gazette::{
    Document, ExtractionError, HttpGazetteSource, NormalizedText, TextExtractor,
};
use gazette_watcher::mail::{BrevoMailer, BrevoSettings, HtmlTemplates};
use gazette_watcher::notifier::Notifier;
use gazette_watcher::pipeline::{
    FixedClock, GazettePipeline, PipelineComponents, PipelineSettings, RetryPolicy,
};
use gazette_watcher::{RegistryAdmin, SqliteRegistry};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// The mock gazette serves plain text, so the bytes are read as UTF-8.
struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_text(&self, document: &Document) -> Result<NormalizedText, ExtractionError> {
        let text = NormalizedText::normalize(&String::from_utf8_lossy(&document.bytes));
        if text.is_empty() {
            return Err(ExtractionError::Empty);
        }
        Ok(text)
    }
}

pub struct TestEnv {
    pub pipeline: Arc<GazettePipeline>,
    pub registry: Arc<SqliteRegistry>,
    pub gazette: MockGazette,
    pub brevo: MockBrevo,
    _db_dir: TempDir,
}

impl TestEnv {
    /// Two registered people, a Friday morning clock, three attempts
    /// with no wait in between.
    pub async fn spawn() -> Self {
        Self::spawn_at(friday_morning()).await
    }

    pub async fn spawn_at(now: NaiveDateTime) -> Self {
        let gazette = MockGazette::spawn().await;
        let brevo = MockBrevo::spawn().await;

        let db_dir = TempDir::new().expect("Failed to create temp dir");
        let registry = Arc::new(
            SqliteRegistry::new(db_dir.path().join("registry.db"))
                .expect("Failed to open registry"),
        );
        registry
            .add_person(TEST_USER_1_NAME, TEST_USER_1_EMAIL)
            .expect("Failed to add person");
        registry
            .add_person(TEST_USER_2_NAME, TEST_USER_2_EMAIL)
            .expect("Failed to add person");

        let source = HttpGazetteSource::new(&gazette.landing_url(), 5)
            .expect("Failed to create gazette source");
        let mailer = BrevoMailer::new(BrevoSettings {
            api_url: brevo.api_url(),
            api_key: TEST_API_KEY.to_string(),
            sender_email: "bot@example.com".to_string(),
            sender_name: "Gazette Bot".to_string(),
            timeout_sec: 5,
        })
        .expect("Failed to create mailer");
        let notifier = Notifier::new(
            Arc::new(mailer),
            registry.clone(),
            Arc::new(HtmlTemplates),
            None,
        );

        let pipeline = Arc::new(GazettePipeline::new(
            PipelineComponents {
                source: Arc::new(source),
                extractor: Arc::new(PlainTextExtractor),
                registry: registry.clone(),
                state_store: registry.clone(),
                notifier,
                calendar: CalendarGate::default(),
                clock: Arc::new(FixedClock(now)),
            },
            PipelineSettings {
                retry: RetryPolicy::new(3, Duration::ZERO),
                earliest_run_hour: 7,
            },
        ));

        Self {
            pipeline,
            registry,
            gazette,
            brevo,
            _db_dir: db_dir,
        }
    }
}

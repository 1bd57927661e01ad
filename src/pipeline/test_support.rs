//! Fakes for driving the pipeline in tests.

use super::{FixedClock, GazettePipeline, PipelineComponents, PipelineSettings, RetryPolicy};
use crate::calendar::CalendarGate;
use crate::gazette::{
    Document, DocumentSource, ExtractionError, FetchError, NormalizedText, TextExtractor,
};
use crate::mail::HtmlTemplates;
use crate::notifier::test_support::{InMemoryRegistry, RecordingMailer};
use crate::notifier::Notifier;
use crate::registry::{Person, RegistryError, RunStateStore};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const INTERVAL: Duration = Duration::from_secs(3600);

/// Replays scripted results; an empty script yields a status error.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<Vec<u8>, u16>>>,
    calls: AtomicUsize,
    pub delay: Option<Duration>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<&str, u16>>) -> Self {
        Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|r| r.map(|s| s.as_bytes().to_vec()))
                    .collect(),
            ),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentSource for ScriptedSource {
    async fn fetch_document(&self) -> Result<Document, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().unwrap().pop_front().unwrap_or(Err(503));
        match next {
            Ok(bytes) => Ok(Document {
                source_url: "http://localhost/dom.pdf".to_string(),
                bytes,
            }),
            Err(status) => Err(FetchError::Status {
                url: "http://localhost/".to_string(),
                status,
            }),
        }
    }
}

/// Treats the document bytes as UTF-8 text; "corrupt" fails to parse.
pub struct Utf8Extractor;

impl TextExtractor for Utf8Extractor {
    fn extract_text(&self, document: &Document) -> Result<NormalizedText, ExtractionError> {
        let raw = String::from_utf8_lossy(&document.bytes);
        if raw == "corrupt" {
            return Err(ExtractionError::Parse("bad xref table".to_string()));
        }
        Ok(NormalizedText::normalize(&raw))
    }
}

#[derive(Default)]
pub struct InMemoryStateStore {
    values: Mutex<HashMap<String, String>>,
}

impl RunStateStore for InMemoryStateStore {
    fn get_state(&self, key: &str) -> Result<Option<String>, RegistryError> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    fn set_state(&self, key: &str, value: &str) -> Result<(), RegistryError> {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Claims never go stale here unless `stale_after` is zero.
    fn try_claim(
        &self,
        key: &str,
        holder: &str,
        stale_after: Duration,
    ) -> Result<bool, RegistryError> {
        let mut values = self.values.lock().unwrap();
        if values.contains_key(key) && !stale_after.is_zero() {
            return Ok(false);
        }
        values.insert(key.to_string(), holder.to_string());
        Ok(true)
    }

    fn release_claim(&self, key: &str, holder: &str) -> Result<(), RegistryError> {
        let mut values = self.values.lock().unwrap();
        if values.get(key).map(String::as_str) == Some(holder) {
            values.remove(key);
        }
        Ok(())
    }
}

pub struct Harness {
    pub pipeline: Arc<GazettePipeline>,
    pub source: Arc<ScriptedSource>,
    pub mailer: Arc<RecordingMailer>,
    pub registry: Arc<InMemoryRegistry>,
    pub state_store: Arc<InMemoryStateStore>,
}

pub fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
}

pub fn people() -> Vec<Person> {
    vec![
        Person::new("a1", "Test User 1", "one@example.com"),
        Person::new("b2", "Test User 2", "two@example.com"),
    ]
}

pub fn harness_with(
    source: ScriptedSource,
    registry: InMemoryRegistry,
    now: NaiveDateTime,
) -> Harness {
    let source = Arc::new(source);
    let mailer = Arc::new(RecordingMailer::default());
    let registry = Arc::new(registry);
    let state_store = Arc::new(InMemoryStateStore::default());
    let notifier = Notifier::new(
        mailer.clone(),
        registry.clone(),
        Arc::new(HtmlTemplates),
        None,
    );
    let pipeline = GazettePipeline::new(
        PipelineComponents {
            source: source.clone(),
            extractor: Arc::new(Utf8Extractor),
            registry: registry.clone(),
            state_store: state_store.clone(),
            notifier,
            calendar: CalendarGate::default(),
            clock: Arc::new(FixedClock(now)),
        },
        PipelineSettings {
            retry: RetryPolicy::new(3, INTERVAL),
            earliest_run_hour: 7,
        },
    );
    Harness {
        pipeline: Arc::new(pipeline),
        source,
        mailer,
        registry,
        state_store,
    }
}

/// Friday 26 July 2024, 10:00.
pub fn harness(script: Vec<Result<&str, u16>>) -> Harness {
    harness_with(
        ScriptedSource::new(script),
        InMemoryRegistry::with_people(people()),
        at("2024-07-26 10:00"),
    )
}

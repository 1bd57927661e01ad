//! The gazette pipeline: gate, acquire text with retries, match, notify.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, Timelike};
use tracing::{debug, error, info, warn};

use super::clock::Clock;
use super::retry::RetryPolicy;
use super::state::{AttemptError, PipelineState, RunOutcome, RunTrigger, SkipReason};
use crate::calendar::CalendarGate;
use crate::gazette::{DocumentSource, ExtractionError, NormalizedText, TextExtractor};
use crate::matcher::match_people;
use crate::notifier::Notifier;
use crate::registry::{PersonRegistry, RegistryError, RunStateStore};
use crate::server::metrics;

/// `pipeline_state` key holding the last local date a run completed.
pub const LAST_COMPLETED_RUN_DATE_KEY: &str = "last_completed_run_date";

/// `pipeline_state` key claimed while a run is executing, shared by every
/// process using the same registry.
pub const RUN_LEASE_KEY: &str = "run_lease";

/// Added to the longest possible retry schedule before a lease counts as
/// abandoned by a crashed process.
const LEASE_GRACE: Duration = Duration::from_secs(3600);

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub retry: RetryPolicy,
    /// Scheduled runs are skipped before this local hour.
    pub earliest_run_hour: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            earliest_run_hour: 7,
        }
    }
}

/// Everything the pipeline talks to.
pub struct PipelineComponents {
    pub source: Arc<dyn DocumentSource>,
    pub extractor: Arc<dyn TextExtractor>,
    pub registry: Arc<dyn PersonRegistry>,
    pub state_store: Arc<dyn RunStateStore>,
    pub notifier: Notifier,
    pub calendar: CalendarGate,
    pub clock: Arc<dyn Clock>,
}

pub struct GazettePipeline {
    source: Arc<dyn DocumentSource>,
    extractor: Arc<dyn TextExtractor>,
    registry: Arc<dyn PersonRegistry>,
    state_store: Arc<dyn RunStateStore>,
    notifier: Notifier,
    calendar: CalendarGate,
    clock: Arc<dyn Clock>,
    settings: PipelineSettings,
    in_flight: AtomicBool,
    state: Mutex<PipelineState>,
    lease_holder: String,
}

/// Clears the in-flight flag when the run ends, including when its future is
/// dropped mid-way.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Cross-process counterpart of `InFlightGuard`, released on drop.
struct RunLease<'a> {
    store: &'a dyn RunStateStore,
    holder: &'a str,
}

impl Drop for RunLease<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.store.release_claim(RUN_LEASE_KEY, self.holder) {
            error!(error = %e, "Failed to release run lease");
        }
    }
}

struct AcquisitionFailure {
    attempts: u32,
    last_error: AttemptError,
}

impl GazettePipeline {
    pub fn new(components: PipelineComponents, settings: PipelineSettings) -> Self {
        Self {
            source: components.source,
            extractor: components.extractor,
            registry: components.registry,
            state_store: components.state_store,
            notifier: components.notifier,
            calendar: components.calendar,
            clock: components.clock,
            settings,
            in_flight: AtomicBool::new(false),
            state: Mutex::new(PipelineState::Idle),
            lease_holder: format!("pid-{}-{:08x}", std::process::id(), rand::random::<u32>()),
        }
    }

    pub fn current_state(&self) -> PipelineState {
        self.state.lock().map(|s| *s).unwrap_or_default()
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn set_state(&self, state: PipelineState) {
        debug!(%state, "Pipeline state changed");
        if let Ok(mut current) = self.state.lock() {
            *current = state;
        }
    }

    /// Entry point for the recurring trigger.
    pub async fn run_scheduled(&self) -> RunOutcome {
        self.run(RunTrigger::Scheduled).await
    }

    pub async fn run(&self, trigger: RunTrigger) -> RunOutcome {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            warn!(?trigger, "Gazette run requested while another is in progress");
            metrics::record_pipeline_run(RunOutcome::AlreadyRunning.label());
            return RunOutcome::AlreadyRunning;
        };

        let started = std::time::Instant::now();
        let today = self.clock.now().date();
        info!(?trigger, %today, "Gazette run starting");

        self.set_state(PipelineState::GateCheck);
        let outcome = match self.check_gate(trigger) {
            Ok(Some(reason)) => {
                info!(%reason, "Gazette run skipped");
                RunOutcome::Skipped(reason)
            }
            Ok(None) => match self.claim_lease() {
                Ok(Some(_lease)) => self.execute(today).await,
                Ok(None) => {
                    warn!("Another process holds the run lease, not running");
                    RunOutcome::AlreadyRunning
                }
                Err(e) => {
                    error!(error = %e, "Failed to claim run lease, aborting run");
                    RunOutcome::Aborted(e.to_string())
                }
            },
            Err(e) => {
                error!(error = %e, "Registry error during gate check, aborting run");
                RunOutcome::Aborted(e.to_string())
            }
        };
        self.set_state(PipelineState::Idle);

        metrics::record_pipeline_run(outcome.label());
        if !matches!(outcome, RunOutcome::Skipped(_)) {
            metrics::observe_run_duration(started.elapsed().as_secs_f64());
            info!(%outcome, elapsed_ms = started.elapsed().as_millis() as u64, "Gazette run finished");
        }
        outcome
    }

    fn check_gate(&self, trigger: RunTrigger) -> Result<Option<SkipReason>, RegistryError> {
        let now = self.clock.now();
        let today = now.date();

        if trigger != (RunTrigger::Manual { force: true }) {
            if let Some(day) = self.calendar.non_run_reason(today) {
                return Ok(Some(SkipReason::NonRunDay(day)));
            }
        }

        if trigger == RunTrigger::Scheduled {
            if now.hour() < self.settings.earliest_run_hour {
                return Ok(Some(SkipReason::BeforeEarliestHour {
                    hour: now.hour(),
                    earliest: self.settings.earliest_run_hour,
                }));
            }
            let last = self.state_store.get_state(LAST_COMPLETED_RUN_DATE_KEY)?;
            let last = last.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok());
            if last == Some(today) {
                return Ok(Some(SkipReason::AlreadyCompleted(today)));
            }
        }

        Ok(None)
    }

    fn claim_lease(&self) -> Result<Option<RunLease<'_>>, RegistryError> {
        let retry = self.settings.retry;
        let stale_after = retry
            .interval()
            .checked_mul(retry.max_attempts())
            .and_then(|d| d.checked_add(LEASE_GRACE))
            .unwrap_or(Duration::MAX);
        let claimed =
            self.state_store
                .try_claim(RUN_LEASE_KEY, &self.lease_holder, stale_after)?;
        Ok(claimed.then(|| RunLease {
            store: self.state_store.as_ref(),
            holder: &self.lease_holder,
        }))
    }

    async fn execute(&self, today: NaiveDate) -> RunOutcome {
        let text = match self.acquire_text().await {
            Ok(text) => text,
            Err(failure) => return self.broadcast_failure(today, failure).await,
        };

        self.set_state(PipelineState::Matching);
        let people = match self.registry.list_people() {
            Ok(people) => people,
            Err(e) => {
                error!(error = %e, "Failed to load people, aborting run");
                return RunOutcome::Aborted(e.to_string());
            }
        };
        let matched: Vec<_> = match_people(&text, &people)
            .into_iter()
            .filter(|r| r.matched)
            .map(|r| r.person)
            .collect();
        info!(
            people = people.len(),
            matched = matched.len(),
            "Matched registered names against the gazette"
        );

        self.set_state(PipelineState::Notifying);
        let mut notified = 0;
        for person in &matched {
            match self.notifier.notify_match(person).await {
                Ok(outcome) if outcome.delivered => notified += 1,
                Ok(_) => {}
                Err(e) => {
                    error!(person_id = %person.id, error = %e, "Failed to record selection, aborting run");
                    return RunOutcome::Aborted(e.to_string());
                }
            }
        }

        self.mark_completed(today);
        RunOutcome::Completed {
            matched: matched.len(),
            notified,
        }
    }

    /// Fetches and extracts the gazette, retrying on any failure until the
    /// policy runs out. Never sleeps after the last attempt or after a success.
    async fn acquire_text(&self) -> Result<NormalizedText, AcquisitionFailure> {
        let max_attempts = self.settings.retry.max_attempts();
        let mut attempt = 1;
        loop {
            info!(attempt, max_attempts, "Gazette attempt starting");
            match self.attempt_once(attempt).await {
                Ok(text) => {
                    info!(attempt, chars = text.len(), "Gazette attempt succeeded");
                    metrics::record_fetch_attempt("success");
                    return Ok(text);
                }
                Err(e) => {
                    metrics::record_fetch_attempt(e.kind());
                    warn!(attempt, max_attempts, error = %e, "Gazette attempt failed");
                    match self.settings.retry.delay_after(attempt) {
                        Some(delay) => {
                            info!(
                                attempt,
                                next_attempt = attempt + 1,
                                delay_secs = delay.as_secs(),
                                "Gazette retry scheduled"
                            );
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                        }
                        None => {
                            error!(attempts = attempt, error = %e, "Gazette retries exhausted");
                            return Err(AcquisitionFailure {
                                attempts: attempt,
                                last_error: e,
                            });
                        }
                    }
                }
            }
        }
    }

    async fn attempt_once(&self, attempt: u32) -> Result<NormalizedText, AttemptError> {
        self.set_state(PipelineState::Fetching { attempt });
        let document = self.source.fetch_document().await?;

        self.set_state(PipelineState::Extracting { attempt });
        let extractor = self.extractor.clone();
        let text = tokio::task::spawn_blocking(move || extractor.extract_text(&document))
            .await
            .map_err(|e| ExtractionError::Parse(format!("extraction task failed: {}", e)))??;
        Ok(text)
    }

    async fn broadcast_failure(&self, today: NaiveDate, failure: AcquisitionFailure) -> RunOutcome {
        self.set_state(PipelineState::Failed);
        warn!(
            attempts = failure.attempts,
            last_error = %failure.last_error,
            "Could not read today's gazette, notifying everyone"
        );

        let people = match self.registry.list_people() {
            Ok(people) => people,
            Err(e) => {
                error!(error = %e, "Failed to load people for the failure notice, aborting run");
                return RunOutcome::Aborted(e.to_string());
            }
        };

        self.set_state(PipelineState::NotifyingFailure);
        let summary = self.notifier.notify_all_failure(&people).await;

        self.mark_completed(today);
        RunOutcome::FailureBroadcast {
            attempts: failure.attempts,
            recipients: people.len(),
            sent: summary.sent,
        }
    }

    fn mark_completed(&self, today: NaiveDate) {
        let value = today.format(DATE_FORMAT).to_string();
        if let Err(e) = self.state_store.set_state(LAST_COMPLETED_RUN_DATE_KEY, &value) {
            // The run itself succeeded; the worst case is a repeat later today.
            error!(error = %e, "Failed to persist last completed run date");
        }
    }
}

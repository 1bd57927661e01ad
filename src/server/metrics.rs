use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, GaugeVec, Histogram, HistogramOpts, HistogramVec, IntCounter, Opts,
    Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all gazette watcher metrics
const PREFIX: &str = "gazette_watcher";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Pipeline Metrics
    pub static ref PIPELINE_RUNS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_pipeline_runs_total"), "Pipeline runs by outcome"),
        &["outcome"]
    ).expect("Failed to create pipeline_runs_total metric");

    pub static ref PIPELINE_RUN_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_pipeline_run_duration_seconds"),
            "Duration of pipeline runs that got past the gate, in seconds"
        )
        .buckets(vec![1.0, 5.0, 15.0, 60.0, 300.0, 3600.0, 7200.0, 10800.0])
    ).expect("Failed to create pipeline_run_duration_seconds metric");

    pub static ref FETCH_ATTEMPTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_fetch_attempts_total"), "Gazette acquisition attempts by outcome"),
        &["outcome"]
    ).expect("Failed to create fetch_attempts_total metric");

    // Notification Metrics
    pub static ref EMAILS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_emails_total"), "Emails by template and outcome"),
        &["template", "outcome"]
    ).expect("Failed to create emails_total metric");

    pub static ref SELECTIONS_TOTAL: IntCounter = IntCounter::new(
        format!("{PREFIX}_selections_total"),
        "Selections recorded"
    ).expect("Failed to create selections_total metric");

    // Background Job Metrics
    pub static ref BACKGROUND_JOB_EXECUTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_background_job_executions_total"), "Background job executions"),
        &["job_id", "status"]
    ).expect("Failed to create background_job_executions_total metric");

    pub static ref BACKGROUND_JOB_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_background_job_duration_seconds"),
            "Background job duration in seconds"
        )
        .buckets(vec![0.1, 1.0, 10.0, 60.0, 600.0, 3600.0, 10800.0]),
        &["job_id"]
    ).expect("Failed to create background_job_duration_seconds metric");

    pub static ref BACKGROUND_JOB_RUNNING: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_background_job_running"), "Whether a background job is running"),
        &["job_id"]
    ).expect("Failed to create background_job_running metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(PIPELINE_RUNS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PIPELINE_RUN_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(FETCH_ATTEMPTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(EMAILS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(SELECTIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(BACKGROUND_JOB_EXECUTIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(BACKGROUND_JOB_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(BACKGROUND_JOB_RUNNING.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Record the outcome of a pipeline run
pub fn record_pipeline_run(outcome: &str) {
    PIPELINE_RUNS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn observe_run_duration(secs: f64) {
    PIPELINE_RUN_DURATION_SECONDS.observe(secs);
}

/// Record a single fetch+extract attempt
pub fn record_fetch_attempt(outcome: &str) {
    FETCH_ATTEMPTS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_email(template: &str, outcome: &str) {
    EMAILS_TOTAL.with_label_values(&[template, outcome]).inc();
}

pub fn record_selection() {
    SELECTIONS_TOTAL.inc();
}

pub fn record_background_job_execution(job_id: &str, status: &str, duration: Duration) {
    BACKGROUND_JOB_EXECUTIONS_TOTAL
        .with_label_values(&[job_id, status])
        .inc();
    BACKGROUND_JOB_DURATION_SECONDS
        .with_label_values(&[job_id])
        .observe(duration.as_secs_f64());
}

pub fn set_background_job_running(job_id: &str, running: bool) {
    BACKGROUND_JOB_RUNNING
        .with_label_values(&[job_id])
        .set(if running { 1.0 } else { 0.0 });
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initialization() {
        init_metrics();

        // Vec metrics only show up once a label set exists
        record_pipeline_run("skipped");
        let metric_families = REGISTRY.gather();
        assert!(!metric_families.is_empty(), "Metrics should be registered");
    }

    #[test]
    fn test_record_email() {
        init_metrics();

        record_email("match_notice", "sent");
        record_email("match_notice", "sent");

        let value = EMAILS_TOTAL
            .with_label_values(&["match_notice", "sent"])
            .get();
        assert!(value >= 2.0);
    }

    #[test]
    fn test_gathered_names_use_prefix() {
        init_metrics();
        record_fetch_attempt("success");

        let names: Vec<String> = REGISTRY
            .gather()
            .iter()
            .map(|m| m.get_name().to_string())
            .collect();
        assert!(names.contains(&"gazette_watcher_fetch_attempts_total".to_string()));
    }

    #[tokio::test]
    async fn test_metrics_handler_returns_text() {
        init_metrics();
        record_selection();

        let response = metrics_handler().await.into_response();

        assert_eq!(response.status(), StatusCode::OK);
    }
}

//! Recurring gazette scan.
//!
//! Polls the pipeline on a fixed interval and once at startup. The pipeline
//! itself decides whether today still needs a run, so most ticks end as a
//! cheap skip.

use crate::background_jobs::{
    context::JobContext,
    job::{BackgroundJob, HookEvent, JobError, JobSchedule},
};
use crate::pipeline::{GazettePipeline, RunOutcome};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub struct GazetteScanJob {
    pipeline: Arc<GazettePipeline>,
    poll_interval: Duration,
}

impl GazetteScanJob {
    pub fn new(pipeline: Arc<GazettePipeline>, poll_interval: Duration) -> Self {
        Self {
            pipeline,
            poll_interval,
        }
    }
}

#[async_trait]
impl BackgroundJob for GazetteScanJob {
    fn id(&self) -> &'static str {
        "gazette_scan"
    }

    fn name(&self) -> &'static str {
        "Gazette Scan"
    }

    fn description(&self) -> &'static str {
        "Check today's official gazette for registered names and notify them"
    }

    fn schedule(&self) -> JobSchedule {
        JobSchedule::Combined {
            interval: Some(self.poll_interval),
            hooks: vec![HookEvent::OnStartup],
        }
    }

    async fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        // Dropping the run future on shutdown abandons it; the next start
        // picks the day up again since it was never marked complete.
        let outcome = tokio::select! {
            outcome = self.pipeline.run_scheduled() => outcome,
            _ = ctx.cancellation_token.cancelled() => {
                info!("Gazette scan interrupted by shutdown");
                return Err(JobError::Cancelled);
            }
        };

        match outcome {
            RunOutcome::Aborted(reason) => Err(JobError::ExecutionFailed(reason)),
            RunOutcome::Skipped(reason) => {
                debug!(%reason, "Gazette scan skipped");
                Ok(())
            }
            other => {
                info!(outcome = %other, "Gazette scan finished");
                Ok(())
            }
        }
    }
}

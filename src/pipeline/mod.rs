//! Daily gazette run: gating, retrying acquisition, matching and notification.

mod clock;
mod orchestrator;
mod retry;
mod state;

pub use clock::{Clock, FixedClock, SystemClock};
pub use orchestrator::{
    GazettePipeline, PipelineComponents, PipelineSettings, LAST_COMPLETED_RUN_DATE_KEY,
    RUN_LEASE_KEY,
};
pub use retry::RetryPolicy;
pub use state::{AttemptError, PipelineState, RunOutcome, RunTrigger, SkipReason};

#[cfg(test)]
pub(crate) mod test_support;

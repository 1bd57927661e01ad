use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

use crate::calendar::NonRunDay;
use crate::gazette::{ExtractionError, FetchError};

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    GateCheck,
    Fetching { attempt: u32 },
    Extracting { attempt: u32 },
    Matching,
    Notifying,
    Failed,
    NotifyingFailure,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "idle"),
            PipelineState::GateCheck => write!(f, "gate_check"),
            PipelineState::Fetching { attempt } => write!(f, "fetching (attempt {})", attempt),
            PipelineState::Extracting { attempt } => write!(f, "extracting (attempt {})", attempt),
            PipelineState::Matching => write!(f, "matching"),
            PipelineState::Notifying => write!(f, "notifying"),
            PipelineState::Failed => write!(f, "failed"),
            PipelineState::NotifyingFailure => write!(f, "notifying_failure"),
        }
    }
}

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunTrigger {
    /// The recurring scheduler tick. Subject to every gate.
    Scheduled,
    /// An operator request. Ignores the earliest hour and whether today
    /// already ran; `force` also bypasses the calendar.
    Manual { force: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NonRunDay(NonRunDay),
    BeforeEarliestHour { hour: u32, earliest: u32 },
    AlreadyCompleted(NaiveDate),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NonRunDay(day) => write!(f, "not a publication day: {}", day),
            SkipReason::BeforeEarliestHour { hour, earliest } => {
                write!(f, "too early ({}h, runs from {}h)", hour, earliest)
            }
            SkipReason::AlreadyCompleted(date) => write!(f, "already completed on {}", date),
        }
    }
}

/// A single failed attempt at getting the gazette text.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
}

impl AttemptError {
    pub fn kind(&self) -> &'static str {
        match self {
            AttemptError::Fetch(_) => "fetch_error",
            AttemptError::Extraction(_) => "extraction_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Skipped(SkipReason),
    /// Another run was in flight; nothing was done.
    AlreadyRunning,
    Completed {
        matched: usize,
        notified: usize,
    },
    /// Every attempt failed and everyone was told.
    FailureBroadcast {
        attempts: u32,
        recipients: usize,
        sent: usize,
    },
    /// The registry failed; the run stopped where it was.
    Aborted(String),
}

impl RunOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RunOutcome::Skipped(_) => "skipped",
            RunOutcome::AlreadyRunning => "already_running",
            RunOutcome::Completed { .. } => "completed",
            RunOutcome::FailureBroadcast { .. } => "failure_broadcast",
            RunOutcome::Aborted(_) => "aborted",
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Skipped(reason) => write!(f, "skipped: {}", reason),
            RunOutcome::AlreadyRunning => write!(f, "skipped: another run is in progress"),
            RunOutcome::Completed { matched, notified } => {
                write!(f, "completed: {} matched, {} notified", matched, notified)
            }
            RunOutcome::FailureBroadcast {
                attempts,
                recipients,
                sent,
            } => write!(
                f,
                "failed after {} attempts, failure notice sent to {}/{}",
                attempts, sent, recipients
            ),
            RunOutcome::Aborted(reason) => write!(f, "aborted: {}", reason),
        }
    }
}

//! Background job scheduling and execution system.
//!
//! Runs periodic and hook-triggered tasks, currently the recurring gazette
//! scan, and lets the admin server inspect and trigger them.

mod context;
mod handle;
mod job;
pub mod jobs;
mod scheduler;

pub use context::JobContext;
pub use handle::{JobInfo, JobRunInfo, JobScheduleInfo, SchedulerHandle};
pub use job::{BackgroundJob, HookEvent, JobError, JobSchedule};
pub use scheduler::{create_scheduler, JobScheduler};

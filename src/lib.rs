//! Gazette Watcher Library
//!
//! Watches the daily official gazette for registered names and emails them.

pub mod app;
pub mod background_jobs;
pub mod calendar;
pub mod config;
pub mod gazette;
pub mod mail;
pub mod matcher;
pub mod notifier;
pub mod pipeline;
pub mod registry;
pub mod server;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use app::build_pipeline;
pub use pipeline::{GazettePipeline, RunOutcome, RunTrigger};
pub use registry::{PersonRegistry, RegistryAdmin, SqliteRegistry};

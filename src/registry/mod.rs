//! Registry of people watched for in the gazette, plus the selection audit trail.

mod models;
mod schema;
mod sqlite_registry;

pub use models::{generate_person_id, Person, SelectionRecord, PERSON_ID_LENGTH};
pub use schema::REGISTRY_VERSIONED_SCHEMAS;
pub use sqlite_registry::SqliteRegistry;

use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("registry connection lock poisoned")]
    LockPoisoned,

    #[error("person not found: {0}")]
    PersonNotFound(String),

    #[error("email already registered: {0}")]
    DuplicateEmail(String),

    #[error("no free person id after {0} attempts")]
    IdExhausted(usize),
}

/// Access needed by the pipeline on every run.
///
/// Reads are never cached across runs; selections are append-only.
pub trait PersonRegistry: Send + Sync {
    /// Returns every registered person, ordered by name.
    fn list_people(&self) -> Result<Vec<Person>, RegistryError>;

    /// Appends a selection for the given person.
    fn record_selection(
        &self,
        person_id: &str,
        selected_at: DateTime<Utc>,
    ) -> Result<SelectionRecord, RegistryError>;
}

/// Administrative operations, used by the registry CLI.
pub trait RegistryAdmin: PersonRegistry {
    /// Registers a new person and returns it with its generated id.
    fn add_person(&self, name: &str, email: &str) -> Result<Person, RegistryError>;

    /// Removes a person and, through the foreign key, their selections.
    fn remove_person(&self, person_id: &str) -> Result<(), RegistryError>;

    /// Returns the most recent selections, newest first.
    fn get_selections(&self, limit: usize) -> Result<Vec<SelectionRecord>, RegistryError>;
}

/// Small key-value store for pipeline bookkeeping that must survive restarts.
pub trait RunStateStore: Send + Sync {
    fn get_state(&self, key: &str) -> Result<Option<String>, RegistryError>;
    fn set_state(&self, key: &str, value: &str) -> Result<(), RegistryError>;

    /// Stores `holder` under `key` unless another holder set it less than
    /// `stale_after` ago. Returns whether the claim was taken.
    fn try_claim(&self, key: &str, holder: &str, stale_after: Duration)
        -> Result<bool, RegistryError>;

    /// Removes the claim on `key` if `holder` still owns it.
    fn release_claim(&self, key: &str, holder: &str) -> Result<(), RegistryError>;
}

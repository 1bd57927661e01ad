use super::models::{generate_person_id, Person, SelectionRecord};
use super::schema::REGISTRY_VERSIONED_SCHEMAS;
use super::{PersonRegistry, RegistryAdmin, RegistryError, RunStateStore};
use crate::sqlite_persistence::open_versioned;
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{ffi, params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::time::Duration;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Fresh ids tried before giving up on a new person.
const MAX_ID_ATTEMPTS: usize = 5;

pub struct SqliteRegistry {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRegistry {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned(db_path, REGISTRY_VERSIONED_SCHEMAS, "registry")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, RegistryError> {
        self.conn.lock().map_err(|_| RegistryError::LockPoisoned)
    }

    fn parse_datetime(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_selection(row: &rusqlite::Row) -> rusqlite::Result<SelectionRecord> {
        let selected_at: String = row.get("selected_at")?;
        Ok(SelectionRecord {
            id: row.get("id")?,
            person_id: row.get("person_id")?,
            selected_at: Self::parse_datetime(&selected_at),
        })
    }

    /// Extended result code of a constraint violation, if `err` is one.
    fn constraint_kind(err: &rusqlite::Error) -> Option<i32> {
        match err {
            rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
                Some(e.extended_code)
            }
            _ => None,
        }
    }

    fn insert_person(
        &self,
        name: &str,
        email: &str,
        mut next_id: impl FnMut() -> String,
    ) -> Result<Person, RegistryError> {
        let conn = self.conn()?;
        for _ in 0..MAX_ID_ATTEMPTS {
            let person = Person::new(next_id(), name.trim(), email.trim());
            let inserted = conn.execute(
                "INSERT INTO people (id, name, email) VALUES (?1, ?2, ?3)",
                params![person.id, person.name, person.email],
            );
            match inserted {
                Ok(_) => {
                    info!("Registered {} <{}> as {}", person.name, person.email, person.id);
                    return Ok(person);
                }
                Err(e) => match Self::constraint_kind(&e) {
                    Some(ffi::SQLITE_CONSTRAINT_PRIMARYKEY) => {
                        debug!("Person id {} already taken, generating another", person.id);
                    }
                    Some(ffi::SQLITE_CONSTRAINT_UNIQUE) => {
                        return Err(RegistryError::DuplicateEmail(person.email))
                    }
                    _ => return Err(e.into()),
                },
            }
        }
        Err(RegistryError::IdExhausted(MAX_ID_ATTEMPTS))
    }
}

impl PersonRegistry for SqliteRegistry {
    fn list_people(&self) -> Result<Vec<Person>, RegistryError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name, email FROM people ORDER BY name, id")?;
        let people = stmt
            .query_map([], |row| {
                Ok(Person {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        debug!("Loaded {} people from the registry", people.len());
        Ok(people)
    }

    fn record_selection(
        &self,
        person_id: &str,
        selected_at: DateTime<Utc>,
    ) -> Result<SelectionRecord, RegistryError> {
        let conn = self.conn()?;
        let selected_at_str = selected_at.to_rfc3339();
        let inserted = conn.execute(
            "INSERT INTO selections (person_id, selected_at) VALUES (?1, ?2)",
            params![person_id, selected_at_str],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if Self::constraint_kind(&e) == Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => {
                return Err(RegistryError::PersonNotFound(person_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        }
        Ok(SelectionRecord {
            id: conn.last_insert_rowid(),
            person_id: person_id.to_string(),
            selected_at: Self::parse_datetime(&selected_at_str),
        })
    }
}

impl RegistryAdmin for SqliteRegistry {
    fn add_person(&self, name: &str, email: &str) -> Result<Person, RegistryError> {
        self.insert_person(name, email, generate_person_id)
    }

    fn remove_person(&self, person_id: &str) -> Result<(), RegistryError> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM people WHERE id = ?1", params![person_id])?;
        if removed == 0 {
            return Err(RegistryError::PersonNotFound(person_id.to_string()));
        }
        info!("Removed person {}", person_id);
        Ok(())
    }

    fn get_selections(&self, limit: usize) -> Result<Vec<SelectionRecord>, RegistryError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, person_id, selected_at FROM selections
             ORDER BY selected_at DESC, id DESC LIMIT ?1",
        )?;
        let selections = stmt
            .query_map(params![limit as i64], Self::row_to_selection)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(selections)
    }
}

impl RunStateStore for SqliteRegistry {
    fn get_state(&self, key: &str) -> Result<Option<String>, RegistryError> {
        let conn = self.conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM pipeline_state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_state(&self, key: &str, value: &str) -> Result<(), RegistryError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO pipeline_state (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                 updated_at = cast(strftime('%s','now') as int)",
            params![key, value],
        )?;
        Ok(())
    }

    fn try_claim(
        &self,
        key: &str,
        holder: &str,
        stale_after: Duration,
    ) -> Result<bool, RegistryError> {
        let conn = self.conn()?;
        // A single upsert, so two processes cannot both win.
        let changed = conn.execute(
            "INSERT INTO pipeline_state (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                 updated_at = cast(strftime('%s','now') as int)
             WHERE pipeline_state.updated_at <= cast(strftime('%s','now') as int) - ?3",
            params![
                key,
                holder,
                i64::try_from(stale_after.as_secs()).unwrap_or(i64::MAX)
            ],
        )?;
        Ok(changed == 1)
    }

    fn release_claim(&self, key: &str, holder: &str) -> Result<(), RegistryError> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM pipeline_state WHERE key = ?1 AND value = ?2",
            params![key, holder],
        )?;
        Ok(())
    }
}

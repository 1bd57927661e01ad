use chrono::{DateTime, Utc};
use rand::{distr::Alphanumeric, Rng};

/// Length of the random alphanumeric identifier given to new people.
pub const PERSON_ID_LENGTH: usize = 8;

/// A registered person whose name is searched for in the gazette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl Person {
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Audit entry stating that a person was found in the gazette and notified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRecord {
    pub id: i64,
    pub person_id: String,
    pub selected_at: DateTime<Utc>,
}

pub fn generate_person_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(PERSON_ID_LENGTH)
        .map(char::from)
        .collect()
}

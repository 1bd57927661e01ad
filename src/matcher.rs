//! Name matching against gazette text.
//!
//! A person matches when their normalized name occurs as a substring of the
//! normalized gazette text. Substring matching means "ana silva" also matches
//! inside "joana silva"; this is accepted, a false positive only costs an email.

use crate::gazette::NormalizedText;
use crate::registry::Person;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub person: Person,
    pub matched: bool,
}

/// Returns one result per person, in input order.
pub fn match_people(text: &NormalizedText, people: &[Person]) -> Vec<MatchResult> {
    people
        .iter()
        .map(|person| MatchResult {
            matched: text.contains(&NormalizedText::normalize(&person.name)),
            person: person.clone(),
        })
        .collect()
}

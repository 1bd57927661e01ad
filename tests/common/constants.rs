//! Shared constants for end-to-end tests

use chrono::NaiveDateTime;

pub const TEST_USER_1_NAME: &str = "Test User 1";
pub const TEST_USER_1_EMAIL: &str = "test1@example.com";

pub const TEST_USER_2_NAME: &str = "Maria da Conceição";
pub const TEST_USER_2_EMAIL: &str = "maria@example.com";

pub const TEST_API_KEY: &str = "xkeysib-e2e";

/// Path of the edition linked from the mock landing page.
pub const DOCUMENT_PATH: &str = "/arquivos/dom-2024-07-26.pdf";

/// A regular Friday, past the earliest run hour.
pub fn friday_morning() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2024-07-26 10:00", "%Y-%m-%d %H:%M").unwrap()
}

pub fn sunday_morning() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2024-07-28 10:00", "%Y-%m-%d %H:%M").unwrap()
}

//! Decides whether a given date is a day on which the gazette is published.
//!
//! The gazette is not published on weekends or on fixed-date holidays, so the
//! pipeline does not even try on those days.

use chrono::{Datelike, NaiveDate, Weekday};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Fixed-date holidays, as `DD-MM`.
pub const DEFAULT_HOLIDAYS: &[&str] = &[
    "01-01", // Confraternização Universal
    "21-04", // Tiradentes
    "01-05", // Dia do Trabalho
    "02-07", // Independência da Bahia
    "07-09", // Independência do Brasil
    "12-10", // Nossa Senhora Aparecida
    "02-11", // Finados
    "15-11", // Proclamação da República
    "25-12", // Natal
];

pub const DEFAULT_WEEKEND_DAYS: &[Weekday] = &[Weekday::Sat, Weekday::Sun];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalendarError {
    #[error("invalid holiday code '{0}', expected DD-MM")]
    InvalidHolidayCode(String),

    #[error("invalid weekday '{0}'")]
    InvalidWeekday(String),
}

/// A day-month pair that recurs every year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HolidayCode {
    day: u32,
    month: u32,
}

impl HolidayCode {
    pub fn matches(&self, date: NaiveDate) -> bool {
        date.day() == self.day && date.month() == self.month
    }
}

impl FromStr for HolidayCode {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CalendarError::InvalidHolidayCode(s.to_string());
        let (day, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let day: u32 = day.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        // 2000 is a leap year, so 29-02 is accepted.
        NaiveDate::from_ymd_opt(2000, month, day).ok_or_else(invalid)?;
        Ok(Self { day, month })
    }
}

impl fmt::Display for HolidayCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.day, self.month)
    }
}

/// Why a date is not a run day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonRunDay {
    Weekend(Weekday),
    Holiday(HolidayCode),
}

impl fmt::Display for NonRunDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NonRunDay::Weekend(day) => write!(f, "weekend ({})", day),
            NonRunDay::Holiday(code) => write!(f, "holiday ({})", code),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CalendarGate {
    weekend_days: Vec<Weekday>,
    holidays: Vec<HolidayCode>,
}

impl CalendarGate {
    pub fn new(weekend_days: Vec<Weekday>, holidays: Vec<HolidayCode>) -> Self {
        Self {
            weekend_days,
            holidays,
        }
    }

    /// Builds a gate from configuration strings, rejecting anything unparseable.
    pub fn from_codes<S: AsRef<str>>(weekend_days: &[S], holidays: &[S]) -> Result<Self, CalendarError> {
        let weekend_days = weekend_days
            .iter()
            .map(|d| parse_weekday(d.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let holidays = holidays
            .iter()
            .map(|h| h.as_ref().parse())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(weekend_days, holidays))
    }

    pub fn should_run(&self, date: NaiveDate) -> bool {
        self.non_run_reason(date).is_none()
    }

    pub fn non_run_reason(&self, date: NaiveDate) -> Option<NonRunDay> {
        let weekday = date.weekday();
        if self.weekend_days.contains(&weekday) {
            return Some(NonRunDay::Weekend(weekday));
        }
        self.holidays
            .iter()
            .find(|h| h.matches(date))
            .map(|h| NonRunDay::Holiday(*h))
    }
}

impl Default for CalendarGate {
    fn default() -> Self {
        let holidays = DEFAULT_HOLIDAYS
            .iter()
            .filter_map(|code| code.parse().ok())
            .collect();
        Self::new(DEFAULT_WEEKEND_DAYS.to_vec(), holidays)
    }
}

pub fn parse_weekday(s: &str) -> Result<Weekday, CalendarError> {
    s.trim()
        .parse::<Weekday>()
        .map_err(|_| CalendarError::InvalidWeekday(s.to_string()))
}

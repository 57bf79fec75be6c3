//! Document Numbering - HIYES Codes
//!
//! Format: `HIYES{YY}{M}{DD}{NNN}`
//! - YY: last two digits of the year
//! - M: month letter, A (January) through L (December)
//! - DD: day of month as two letters, AA (1st) .. AZ (26th), BA (27th) .. BE (31st)
//! - NNN: zero-padded daily counter, 001-999
//!
//! Codes are persisted and shown to customers, so the encoding is frozen:
//! `HIYES25JBA001` is the first document issued on 2025-10-27.

use chrono::{Datelike, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

pub const CODE_PREFIX: &str = "HIYES";
pub const CODE_LEN: usize = 13;
pub const MAX_DAILY_COUNTER: u32 = 999;

lazy_static! {
    // ASCII classes only; `\d` would also accept non-ASCII digits.
    static ref CODE_PATTERN: Regex =
        Regex::new(r"^HIYES([0-9]{2})([A-L])([A-Z]{2})([0-9]{3})$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Invalid month: {0}. Must be between 1 and 12")]
    InvalidMonth(u32),

    #[error("Invalid day: {0}. Must be between 1 and 31")]
    InvalidDay(u32),

    #[error("Invalid counter: {0}. Must be between 1 and 999")]
    InvalidCounter(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CounterError {
    #[error("daily document limit reached for {date} (max 999 per day)")]
    DailyLimitReached { date: NaiveDate },

    #[error("counter source unavailable: {0}")]
    Unavailable(String),
}

/// Fields recovered from a well-formed code that names a real calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedNumber {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub counter: u32,
    pub date: NaiveDate,
}

pub fn month_to_letter(month: u32) -> Result<char, CodecError> {
    if !(1..=12).contains(&month) {
        return Err(CodecError::InvalidMonth(month));
    }
    Ok(char::from(b'A' + (month - 1) as u8))
}

/// Day 1 -> "AA", 26 -> "AZ", 27 -> "BA", 31 -> "BE".
pub fn day_to_double_letter(day: u32) -> Result<String, CodecError> {
    if !(1..=31).contains(&day) {
        return Err(CodecError::InvalidDay(day));
    }

    // Multiples of 26 stay in the lower band and end in Z.
    let rem = day % 26;
    let first = b'A' + (day / 26) as u8 + u8::from(rem != 0) - 1;
    let second = if rem != 0 { b'A' + rem as u8 - 1 } else { b'Z' };

    Ok([char::from(first), char::from(second)].iter().collect())
}

pub fn encode(date: NaiveDate, counter: u32) -> Result<String, CodecError> {
    if !(1..=MAX_DAILY_COUNTER).contains(&counter) {
        return Err(CodecError::InvalidCounter(counter));
    }

    let year = date.year().rem_euclid(100);
    let month = month_to_letter(date.month())?;
    let day = day_to_double_letter(date.day())?;

    Ok(format!("{CODE_PREFIX}{year:02}{month}{day}{counter:03}"))
}

/// Parse a code back into its parts.
///
/// Returns `None` for anything that is not a code, including well-formed
/// strings whose letters name an impossible date such as February 30th.
pub fn decode(code: &str) -> Option<DecodedNumber> {
    let caps = CODE_PATTERN.captures(code)?;

    let year = 2000 + caps[1].parse::<i32>().ok()?;
    let month = letter_index(caps[2].as_bytes()[0]);
    let day_letters = caps[3].as_bytes();
    let day = (letter_index(day_letters[0]) - 1) * 26 + letter_index(day_letters[1]);
    let counter = caps[4].parse::<u32>().ok()?;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    Some(DecodedNumber { year, month, day, counter, date })
}

/// Structural check only; no calendar validation.
pub fn is_valid(code: &str) -> bool {
    CODE_PATTERN.is_match(code)
}

// 'A' = 1
fn letter_index(letter: u8) -> u32 {
    u32::from(letter - b'A') + 1
}

/// An issued document number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentCode(String);

impl DocumentCode {
    pub fn generate(date: NaiveDate, counter: u32) -> Result<Self, CodecError> {
        encode(date, counter).map(Self)
    }

    pub fn parse(code: &str) -> Option<Self> {
        is_valid(code).then(|| Self(code.to_string()))
    }

    pub fn decode(&self) -> Option<DecodedNumber> {
        decode(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DocumentCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Persistence seam for daily counters.
///
/// `reserve` must be atomic per date: two callers never receive the same
/// counter. The codec only refuses counters outside 1..=999.
pub trait CounterSource {
    /// Number of documents already issued for `date`.
    fn issued_on(&self, date: NaiveDate) -> Result<u32, CounterError>;

    /// Allocate and record the next counter for `date`.
    fn reserve(&self, date: NaiveDate) -> Result<u32, CounterError>;
}

/// Next free counter for `date`: issued count + 1.
pub fn next_counter_for_date(
    source: &dyn CounterSource,
    date: NaiveDate,
) -> Result<u32, CounterError> {
    let next = source.issued_on(date)?.saturating_add(1);
    if next > MAX_DAILY_COUNTER {
        return Err(CounterError::DailyLimitReached { date });
    }
    debug!(%date, counter = next, "allocated daily document counter");
    Ok(next)
}

/// Process-local counter store.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    issued: Mutex<HashMap<NaiveDate, u32>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_issued(date: NaiveDate, count: u32) -> Self {
        let ledger = Self::new();
        ledger.set_issued(date, count);
        ledger
    }

    pub fn set_issued(&self, date: NaiveDate, count: u32) {
        self.lock().insert(date, count);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<NaiveDate, u32>> {
        // Every write is a single insert, so a poisoned map is still consistent.
        self.issued.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CounterSource for InMemoryLedger {
    fn issued_on(&self, date: NaiveDate) -> Result<u32, CounterError> {
        Ok(self.lock().get(&date).copied().unwrap_or(0))
    }

    fn reserve(&self, date: NaiveDate) -> Result<u32, CounterError> {
        let mut issued = self.lock();
        let entry = issued.entry(date).or_insert(0);
        if *entry >= MAX_DAILY_COUNTER {
            return Err(CounterError::DailyLimitReached { date });
        }
        *entry += 1;
        debug!(%date, counter = *entry, "reserved daily document counter");
        Ok(*entry)
    }
}

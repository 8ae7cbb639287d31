//! # Tide Moves Core Library
//!
//! This library turns published tide tables into small JSON summaries that static
//! tide widgets can read: the biggest low-to-high "tidal moves" over the coming
//! weeks, and the next high/low turn for each station.
//!
//! ## Data Flow
//!
//! ### Big tides over a window
//! 1. **Acquire**: read a local CSV/PDF or fetch the PDF from a remote URL
//! 2. **Tokenize**: turn noisy page text into month headings and day rows
//! 3. **Resolve**: anchor day rows to calendar dates with a running month/year
//! 4. **Store**: accumulate de-duplicated, time-sorted observations per date
//! 5. **Classify + pair**: label local extrema, pair each low with the next high
//! 6. **Aggregate**: per-day maxima, threshold filter, sort by move
//!
//! ### Next turn per station
//! The same event store is flattened into one time-ordered sequence, restricted to
//! a window around "now", classified, and queried for the first upcoming high and
//! low.
//!
//! ## Core Types
//!
//! - [`TideObservation`]: one (time, height) reading from a tide table
//! - [`TideKind`]: low or high water
//! - [`round2`]: the two-decimal rounding used for every reported height

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

// Module declarations
pub mod aggregate;
pub mod calendar;
pub mod config;
pub mod csv_source;
pub mod event_store;
pub mod extrema;
pub mod next_turn;
pub mod pdf_source;
pub mod renderer;
pub mod report;
pub mod summary;
pub mod tide_data;
pub mod tokenizer;
pub mod worldtides;

/// A single tide-table reading: local clock time and height in metres.
///
/// No timezone is attached. Times are whatever the published table says, and a
/// fixed UTC offset label is only appended when reporting.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use tide_moves_lib::TideObservation;
///
/// let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
/// let obs = TideObservation::from_hhmm(date, "0630", 2.8).unwrap();
/// assert_eq!(obs.hhmm(), "0630");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TideObservation {
    /// Local date and clock time (minute precision)
    pub at: NaiveDateTime,
    /// Height above chart datum in metres
    pub height_m: f64,
}

impl TideObservation {
    pub fn new(at: NaiveDateTime, height_m: f64) -> Self {
        Self { at, height_m }
    }

    /// Build an observation from a date and a 4-digit `HHMM` clock string.
    ///
    /// Returns `None` when the clock value is not a real time of day
    /// (e.g. `2460` or `0975`).
    pub fn from_hhmm(date: NaiveDate, hhmm: &str, height_m: f64) -> Option<Self> {
        let time = parse_hhmm(hhmm)?;
        Some(Self::new(date.and_time(time), height_m))
    }

    pub fn date(&self) -> NaiveDate {
        self.at.date()
    }

    /// Zero-padded 4-digit clock value, e.g. `"0043"`.
    pub fn hhmm(&self) -> String {
        format!("{:02}{:02}", self.at.hour(), self.at.minute())
    }
}

/// Whether a classified point is a local minimum or maximum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TideKind {
    Low,
    High,
}

/// Round to two decimal places, the precision every reported height uses.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Left-pad a clock token with zeros to width 4 after dropping any colons.
///
/// `"43"` → `"0043"`, `"6:30"` → `"0630"`, `"1845"` → `"1845"`.
pub fn normalize_hhmm(raw: &str) -> String {
    let digits: String = raw.trim().chars().filter(|c| *c != ':').collect();
    format!("{digits:0>4}")
}

/// Parse a normalized 4-digit clock value into a time of day.
pub fn parse_hhmm(hhmm: &str) -> Option<NaiveTime> {
    if hhmm.len() != 4 || !hhmm.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hour: u32 = hhmm[..2].parse().ok()?;
    let minute: u32 = hhmm[2..].parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

//! # Next-Turn Finder
//!
//! Answers "when is the next high and the next low?" for one station.
//!
//! The station's observations are restricted to a window around `now` (some
//! hours behind for classification context at the boundary, some hours ahead),
//! classified as extrema, collapsed so that consecutive same-kind points become
//! one, and searched for the first high and first low at or after `now`.
//!
//! The boundary is inclusive: a reading stamped exactly `now` is the next turn.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::extrema::{classify, collapse_runs, ClassifiedPoint};
use crate::{round2, TideKind, TideObservation};

/// Minimum readings in the window before the classification is trusted.
const MIN_WINDOW_EVENTS: usize = 3;

/// Hours kept either side of `now`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TurnWindow {
    pub behind_hours: i64,
    pub ahead_hours: i64,
}

impl Default for TurnWindow {
    fn default() -> Self {
        Self {
            behind_hours: 24,
            ahead_hours: 48,
        }
    }
}

/// Next high/low for one station, as published in `tide-next.json`.
///
/// Any field is `null` when it cannot be determined; `range_m` needs both turns.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NextTurn {
    #[serde(rename = "nextHighISO")]
    pub next_high_iso: Option<String>,
    #[serde(rename = "nextLowISO")]
    pub next_low_iso: Option<String>,
    #[serde(rename = "nextHigh_m")]
    pub next_high_m: Option<f64>,
    #[serde(rename = "nextLow_m")]
    pub next_low_m: Option<f64>,
    pub range_m: Option<f64>,
}

impl NextTurn {
    /// Assemble from whichever turns were found.
    pub fn from_turns(
        high: Option<(NaiveDateTime, f64)>,
        low: Option<(NaiveDateTime, f64)>,
        utc_offset: &str,
    ) -> Self {
        Self::assemble(
            high.map(|(at, h)| (iso_with_offset(at, utc_offset), h)),
            low.map(|(at, l)| (iso_with_offset(at, utc_offset), l)),
        )
    }

    /// Assemble from instants that carry their own offset.
    pub fn from_instants(
        high: Option<(DateTime<FixedOffset>, f64)>,
        low: Option<(DateTime<FixedOffset>, f64)>,
    ) -> Self {
        let iso = |at: DateTime<FixedOffset>| at.format("%Y-%m-%dT%H:%M:%S%:z").to_string();
        Self::assemble(high.map(|(at, h)| (iso(at), h)), low.map(|(at, l)| (iso(at), l)))
    }

    fn assemble(high: Option<(String, f64)>, low: Option<(String, f64)>) -> Self {
        let range_m = match (&high, &low) {
            (Some((_, h)), Some((_, l))) => Some(round2((h - l).abs())),
            _ => None,
        };
        Self {
            next_high_m: high.as_ref().map(|(_, h)| round2(*h)),
            next_low_m: low.as_ref().map(|(_, l)| round2(*l)),
            next_high_iso: high.map(|(iso, _)| iso),
            next_low_iso: low.map(|(iso, _)| iso),
            range_m,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.range_m.is_some()
    }
}

/// `2026-01-05T06:30:00+11:00`; seconds are always zero.
pub fn iso_with_offset(at: NaiveDateTime, utc_offset: &str) -> String {
    format!("{}{utc_offset}", at.format("%Y-%m-%dT%H:%M:00"))
}

/// Classified turns within the window around `now`.
///
/// Empty when fewer than three readings fall inside the window. Negative hours
/// count as zero, and a window reaching past the calendar is clamped to it.
pub fn window_turns(
    events: &[TideObservation],
    now: NaiveDateTime,
    window: TurnWindow,
) -> Vec<ClassifiedPoint> {
    let from = TimeDelta::try_hours(window.behind_hours.max(0))
        .and_then(|behind| now.checked_sub_signed(behind))
        .unwrap_or(NaiveDateTime::MIN);
    let to = TimeDelta::try_hours(window.ahead_hours.max(0))
        .and_then(|ahead| now.checked_add_signed(ahead))
        .unwrap_or(NaiveDateTime::MAX);
    let in_window: Vec<TideObservation> = events
        .iter()
        .filter(|e| e.at >= from && e.at <= to)
        .copied()
        .collect();

    if in_window.len() < MIN_WINDOW_EVENTS {
        return Vec::new();
    }
    collapse_runs(&classify(&in_window))
}

/// First high and first low at or after `now`.
///
/// `events` must be time ordered (as returned by
/// [`EventStore::events`](crate::event_store::EventStore::events)). Returns
/// `None` when the window is too sparse or either turn is missing.
pub fn next_turn(
    events: &[TideObservation],
    now: NaiveDateTime,
    window: TurnWindow,
    utc_offset: &str,
) -> Option<NextTurn> {
    let turns = window_turns(events, now, window);
    let first = |kind: TideKind| {
        turns
            .iter()
            .find(|p| p.kind == kind && p.at >= now)
            .map(|p| (p.at, p.height_m))
    };

    let high = first(TideKind::High)?;
    let low = first(TideKind::Low)?;
    Some(NextTurn::from_turns(Some(high), Some(low), utc_offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hhmm: &str) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, day)
            .unwrap()
            .and_time(crate::parse_hhmm(hhmm).unwrap())
    }

    fn events() -> Vec<TideObservation> {
        [
            (5, "0030", 0.3),
            (5, "0630", 2.8),
            (5, "1230", 0.4),
            (5, "1845", 2.9),
            (6, "0110", 0.35),
            (6, "0720", 2.75),
            (6, "1310", 0.45),
            (6, "1930", 2.85),
        ]
        .iter()
        .map(|(d, t, h)| TideObservation::new(at(*d, t), *h))
        .collect()
    }

    #[test]
    fn test_next_turn_after_now() {
        let turn = next_turn(&events(), at(5, "0800"), TurnWindow::default(), "+11:00").unwrap();
        assert_eq!(turn.next_low_iso.as_deref(), Some("2026-01-05T12:30:00+11:00"));
        assert_eq!(turn.next_high_iso.as_deref(), Some("2026-01-05T18:45:00+11:00"));
        assert_eq!(turn.next_low_m, Some(0.4));
        assert_eq!(turn.next_high_m, Some(2.9));
        assert_eq!(turn.range_m, Some(2.5));
    }

    #[test]
    fn test_now_equal_to_reading_counts_as_next() {
        let turn = next_turn(&events(), at(5, "1230"), TurnWindow::default(), "+11:00").unwrap();
        assert_eq!(turn.next_low_iso.as_deref(), Some("2026-01-05T12:30:00+11:00"));

        let turn = next_turn(&events(), at(5, "1231"), TurnWindow::default(), "+11:00").unwrap();
        assert_eq!(turn.next_low_iso.as_deref(), Some("2026-01-06T01:10:00+11:00"));
    }

    #[test]
    fn test_sparse_window_is_none() {
        let window = TurnWindow {
            behind_hours: 0,
            ahead_hours: 8,
        };
        // Only 0630 and 1230 fall in [0600, 1400]
        assert!(next_turn(&events(), at(5, "0600"), window, "+11:00").is_none());
    }

    #[test]
    fn test_missing_high_is_none() {
        let falling: Vec<TideObservation> = [("0100", 2.0), ("0500", 1.5), ("0900", 1.0)]
            .iter()
            .map(|(t, h)| TideObservation::new(at(5, t), *h))
            .collect();
        assert!(next_turn(&falling, at(5, "0400"), TurnWindow::default(), "+11:00").is_none());
    }

    #[test]
    fn test_offset_label_is_appended() {
        let turn = next_turn(&events(), at(5, "1800"), TurnWindow::default(), "+10:00").unwrap();
        assert_eq!(turn.next_high_iso.as_deref(), Some("2026-01-05T18:45:00+10:00"));
        assert_eq!(turn.next_low_iso.as_deref(), Some("2026-01-06T01:10:00+10:00"));
    }

    #[test]
    fn test_huge_window_is_clamped() {
        let window = TurnWindow {
            behind_hours: i64::MAX,
            ahead_hours: 2_000_000_000_000,
        };
        let turn = next_turn(&events(), at(5, "0800"), window, "+11:00").unwrap();
        assert_eq!(turn.next_low_iso.as_deref(), Some("2026-01-05T12:30:00+11:00"));
    }

    #[test]
    fn test_instants_keep_their_own_offset() {
        let winter = FixedOffset::east_opt(10 * 3600).unwrap();
        let high = DateTime::parse_from_rfc3339("2026-06-05T06:30:00+10:00").unwrap();
        let low = DateTime::parse_from_rfc3339("2026-06-05T12:41:00+10:00").unwrap();
        assert_eq!(high.offset(), &winter);

        let turn = NextTurn::from_instants(Some((high, 1.9)), Some((low, 0.4)));
        assert_eq!(turn.next_high_iso.as_deref(), Some("2026-06-05T06:30:00+10:00"));
        assert_eq!(turn.next_low_iso.as_deref(), Some("2026-06-05T12:41:00+10:00"));
        assert_eq!(turn.range_m, Some(1.5));
    }

    #[test]
    fn test_partial_turn_has_no_range() {
        let turn = NextTurn::from_turns(Some((at(5, "0630"), 2.8)), None, "+11:00");
        assert_eq!(turn.range_m, None);
        assert!(!turn.is_complete());
        assert_eq!(turn.next_low_iso, None);
    }
}

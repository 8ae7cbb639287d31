//! # Calendar Resolver
//!
//! Tide tables print a month heading followed by day-of-month rows, and often
//! omit the year. [`CalendarState`] carries the running month/year across a whole
//! document scan. It is a plain value: each page is folded through
//! [`CalendarState::scan_page`], which takes the state and hands back the
//! updated state, so a single page can be checked in isolation.

use chrono::NaiveDate;

use crate::event_store::EventStore;
use crate::tide_data::ParseReport;
use crate::tokenizer::{Heading, PageToken};
use crate::TideObservation;

/// Running month/year while scanning a document top to bottom.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalendarState {
    /// Month of the most recent heading, `None` until one is seen
    pub month: Option<u32>,
    pub year: i32,
    pub last_month_seen: Option<u32>,
}

impl CalendarState {
    /// Start a scan with the year to assume for headings that carry none.
    pub fn new(base_year: i32) -> Self {
        Self {
            month: None,
            year: base_year,
            last_month_seen: None,
        }
    }

    /// Apply a month heading.
    ///
    /// An explicit year always wins. Without one, December followed by January
    /// moves to the next year.
    pub fn apply_heading(mut self, heading: Heading) -> Self {
        if let Some(year) = heading.year {
            self.year = year;
        } else if self.last_month_seen == Some(12) && heading.month == 1 {
            self.year += 1;
        }
        self.month = Some(heading.month);
        self.last_month_seen = Some(heading.month);
        self
    }

    /// Date for a day-of-month under the current heading, if it exists.
    pub fn resolve(&self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month?, day)
    }

    /// Fold one tokenized page into the store.
    ///
    /// Rows before any heading, impossible dates, and impossible clock times are
    /// recorded in `report` and otherwise ignored.
    pub fn scan_page(
        self,
        page: usize,
        tokens: &[PageToken],
        store: &mut EventStore,
        report: &mut ParseReport,
    ) -> Self {
        tokens.iter().fold(self, |state, token| match token {
            PageToken::Heading(heading) => state.apply_heading(*heading),
            PageToken::Row(row) => {
                let location = format!("page {page} day {}", row.day);
                for height in &row.dropped {
                    report.skip(&location, format!("unparseable height {height:?}"));
                }

                let Some(month) = state.month else {
                    report.skip(location, "day row before any month heading");
                    return state;
                };
                let Some(date) = state.resolve(row.day) else {
                    report.skip(location, format!("no such date {}-{month:02}-{:02}", state.year, row.day));
                    return state;
                };

                for (hhmm, height) in &row.pairs {
                    match TideObservation::from_hhmm(date, hhmm, *height) {
                        Some(obs) => {
                            if store.add(obs) {
                                report.accepted += 1;
                            } else {
                                report.duplicates += 1;
                            }
                        }
                        None => report.skip(&location, format!("invalid clock time {hhmm}")),
                    }
                }
                state
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize_lines;

    fn heading(month: u32, year: Option<i32>) -> Heading {
        Heading { month, year }
    }

    #[test]
    fn test_december_to_january_rolls_year() {
        let state = CalendarState::new(2026)
            .apply_heading(heading(12, None))
            .apply_heading(heading(1, None));
        assert_eq!(state.year, 2027);
        assert_eq!(state.month, Some(1));
    }

    #[test]
    fn test_explicit_year_overrides_rollover() {
        let state = CalendarState::new(2026)
            .apply_heading(heading(12, None))
            .apply_heading(heading(1, Some(2030)));
        assert_eq!(state.year, 2030);
    }

    #[test]
    fn test_january_without_december_keeps_year() {
        let state = CalendarState::new(2026)
            .apply_heading(heading(11, None))
            .apply_heading(heading(1, None));
        assert_eq!(state.year, 2026);
    }

    #[test]
    fn test_rows_before_heading_are_discarded() {
        let mut store = EventStore::new();
        let mut report = ParseReport::default();
        let tokens = tokenize_lines(&["4 0100 0.5 0700 2.1"]);
        let state = CalendarState::new(2026).scan_page(1, &tokens, &mut store, &mut report);

        assert_eq!(state.month, None);
        assert_eq!(store.date_count(), 0);
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn test_invalid_date_and_time_are_discarded() {
        let mut store = EventStore::new();
        let mut report = ParseReport::default();
        let tokens = tokenize_lines(&["FEBRUARY 2026", "31 0100 0.5", "3 2460 0.5 0700 2.1"]);
        CalendarState::new(2026).scan_page(1, &tokens, &mut store, &mut report);

        assert_eq!(store.date_count(), 1);
        assert_eq!(report.accepted, 1);
        assert_eq!(report.skipped.len(), 2);
    }

    #[test]
    fn test_state_threads_across_pages() {
        let mut store = EventStore::new();
        let mut report = ParseReport::default();
        let page1 = tokenize_lines(&["DECEMBER", "31 2200 0.6"]);
        let page2 = tokenize_lines(&["JANUARY", "1 0400 2.4"]);

        let state = CalendarState::new(2026);
        let state = state.scan_page(1, &page1, &mut store, &mut report);
        let state = state.scan_page(2, &page2, &mut store, &mut report);

        assert_eq!(state.year, 2027);
        assert_eq!(store.get_iso("2026-12-31").len(), 1);
        assert_eq!(store.get_iso("2027-01-01").len(), 1);
    }
}

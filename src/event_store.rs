//! Per-date accumulation of tide observations.
//!
//! PDF extraction frequently yields the same reading twice (overlapping pages,
//! a table pass over text already seen). The store merges readings that share
//! a date, clock time, and height to two decimals. Readings at the same time
//! with different heights are both kept.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::{round2, TideObservation};

#[derive(Clone, Debug, Default)]
pub struct EventStore {
    days: BTreeMap<NaiveDate, Vec<TideObservation>>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observation unless an identical one is already stored.
    ///
    /// Returns `true` if the observation was inserted.
    pub fn add(&mut self, obs: TideObservation) -> bool {
        let day = self.days.entry(obs.date()).or_default();
        let duplicate = day
            .iter()
            .any(|e| e.at == obs.at && round2(e.height_m) == round2(obs.height_m));
        if duplicate {
            return false;
        }
        day.push(obs);
        true
    }

    /// Sort every date's observations by time (stable for equal times).
    pub fn finalize(&mut self) {
        for day in self.days.values_mut() {
            day.sort_by_key(|e| e.at);
        }
    }

    /// Observations for one date, empty if the date is unknown.
    pub fn get(&self, date: NaiveDate) -> &[TideObservation] {
        self.days.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// [`EventStore::get`] keyed by an ISO `YYYY-MM-DD` string.
    pub fn get_iso(&self, key: &str) -> &[TideObservation] {
        NaiveDate::parse_from_str(key, "%Y-%m-%d")
            .map(|date| self.get(date))
            .unwrap_or(&[])
    }

    pub fn date_count(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.keys().copied()
    }

    /// Every observation, ordered by date then time.
    pub fn events(&self) -> Vec<TideObservation> {
        self.days.values().flatten().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(date: &str, hhmm: &str, height: f64) -> TideObservation {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        TideObservation::from_hhmm(date, hhmm, height).unwrap()
    }

    #[test]
    fn test_overlapping_pages_do_not_duplicate() {
        let mut store = EventStore::new();
        assert!(store.add(obs("2026-01-05", "0630", 2.80)));
        assert!(!store.add(obs("2026-01-05", "0630", 2.8)));
        assert!(!store.add(obs("2026-01-05", "0630", 2.804)));
        assert_eq!(store.get_iso("2026-01-05").len(), 1);
    }

    #[test]
    fn test_same_time_different_height_is_kept() {
        let mut store = EventStore::new();
        store.add(obs("2026-01-05", "0630", 2.80));
        store.add(obs("2026-01-05", "0630", 2.95));
        assert_eq!(store.get_iso("2026-01-05").len(), 2);
    }

    #[test]
    fn test_finalize_sorts_by_time() {
        let mut store = EventStore::new();
        store.add(obs("2026-01-05", "1845", 2.9));
        store.add(obs("2026-01-05", "0030", 0.3));
        store.add(obs("2026-01-05", "1230", 0.4));
        store.finalize();

        let times: Vec<String> = store.get_iso("2026-01-05").iter().map(|e| e.hhmm()).collect();
        assert_eq!(times, ["0030", "1230", "1845"]);
    }

    #[test]
    fn test_unknown_date_is_empty() {
        let store = EventStore::new();
        assert!(store.get_iso("2026-01-05").is_empty());
        assert!(store.get_iso("not-a-date").is_empty());
    }

    #[test]
    fn test_events_are_flattened_in_order() {
        let mut store = EventStore::new();
        store.add(obs("2026-01-06", "0100", 0.5));
        store.add(obs("2026-01-05", "2300", 2.1));
        store.finalize();

        let events = store.events();
        assert_eq!(events.len(), 2);
        assert!(events[0].at < events[1].at);
    }
}

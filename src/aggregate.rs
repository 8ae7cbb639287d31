//! Window/threshold aggregation of tidal moves into per-day summaries.
//!
//! The inclusion rule comes in two flavours. [`ThresholdMode::AsPublished`] is the
//! rule the published widgets were built against: a day passes when the high
//! side is disabled-or-met **or** the move side is disabled-or-met. With either
//! threshold at zero that admits every day. [`ThresholdMode::Strict`] requires
//! both sides to be disabled-or-met.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::event_store::EventStore;
use crate::extrema::{day_moves, TidalMove};
use crate::round2;

/// How the high and move thresholds combine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdMode {
    /// `(high off or met) OR (move off or met)`
    #[default]
    #[serde(alias = "published")]
    AsPublished,
    /// `(high off or met) AND (move off or met)`
    Strict,
}

/// Minimum high and minimum move; zero or negative disables a side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub high_m: f64,
    pub move_m: f64,
}

/// All pairs of one day plus their maxima.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub pairs: Vec<TidalMove>,
    pub max_high_m: f64,
    pub max_move_m: f64,
}

impl DaySummary {
    /// Summarise one day; `None` when the day has no pairs.
    pub fn from_pairs(date: NaiveDate, pairs: Vec<TidalMove>) -> Option<Self> {
        let max_high_m = pairs.iter().map(|p| p.high_m).reduce(f64::max)?;
        let max_move_m = pairs.iter().map(|p| p.move_m).reduce(f64::max)?;
        Some(Self {
            date,
            pairs,
            max_high_m: round2(max_high_m),
            max_move_m: round2(max_move_m),
        })
    }
}

impl Thresholds {
    pub fn admits(&self, day: &DaySummary, mode: ThresholdMode) -> bool {
        let high_ok = self.high_m <= 0.0 || day.max_high_m >= self.high_m;
        let move_ok = self.move_m <= 0.0 || day.max_move_m >= self.move_m;
        match mode {
            ThresholdMode::AsPublished => high_ok || move_ok,
            ThresholdMode::Strict => high_ok && move_ok,
        }
    }
}

/// Parameters of one aggregation run.
#[derive(Clone, Copy, Debug)]
pub struct WindowQuery {
    pub start: NaiveDate,
    /// Inclusive
    pub end: NaiveDate,
    pub thresholds: Thresholds,
    pub mode: ThresholdMode,
    /// Keep only the biggest N days
    pub top_n: Option<usize>,
}

/// Summarise every day in the window, filter, and sort by move (largest first).
///
/// Ties keep date order.
pub fn aggregate(store: &EventStore, query: &WindowQuery) -> Vec<DaySummary> {
    let mut days: Vec<DaySummary> = query
        .start
        .iter_days()
        .take_while(|d| *d <= query.end)
        .filter_map(|date| DaySummary::from_pairs(date, day_moves(store.get(date))))
        .filter(|day| query.thresholds.admits(day, query.mode))
        .collect();

    days.sort_by(|a, b| b.max_move_m.total_cmp(&a.max_move_m));
    if let Some(n) = query.top_n {
        days.truncate(n);
    }
    days
}

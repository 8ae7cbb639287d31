//! # Extrema Classification and Low→High Pairing
//!
//! Tide tables list turning points, but not which are highs and which are lows.
//! This module recovers that labelling from heights alone and then pairs each low
//! with the high that follows it.
//!
//! ## Classification
//! Each point is compared with its immediate neighbours, in this order:
//! - **first point**: low if `h[0] <= h[1]`, otherwise high
//! - **last point**: high if `h[n-1] >= h[n-2]`, otherwise low
//! - **interior**: low if `<=` both neighbours, else high if `>=` both, else
//!   follow the slope (high when rising from the previous point)
//!
//! Ties (plateaus) therefore resolve to low first, then high, before the slope
//! fallback is consulted.
//!
//! ## Pairing
//! From each low, the nearest later high is taken. Lows in between are skipped.
//! When the high is not strictly above the low, no pair is emitted and the scan
//! resumes one point past the low. When a pair is emitted, the scan resumes past
//! the high. A low with no later high ends the scan.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::{round2, TideKind, TideObservation};

/// An observation labelled as a local minimum or maximum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassifiedPoint {
    pub at: NaiveDateTime,
    /// Height rounded to two decimals
    pub height_m: f64,
    pub kind: TideKind,
}

/// One low tide and the high tide that follows it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TidalMove {
    /// `HHMM`
    pub low_time: String,
    pub low_m: f64,
    /// `HHMM`
    pub high_time: String,
    pub high_m: f64,
    /// `high_m - low_m`, always strictly positive
    pub move_m: f64,
}

/// Label each observation of a time-sorted sequence as low or high.
///
/// Fewer than two observations cannot be classified and give an empty result.
pub fn classify(events: &[TideObservation]) -> Vec<ClassifiedPoint> {
    let n = events.len();
    if n < 2 {
        return Vec::new();
    }

    events
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let h = e.height_m;
            let kind = if i == 0 {
                if h <= events[1].height_m {
                    TideKind::Low
                } else {
                    TideKind::High
                }
            } else if i == n - 1 {
                if h >= events[n - 2].height_m {
                    TideKind::High
                } else {
                    TideKind::Low
                }
            } else {
                let prev = events[i - 1].height_m;
                let next = events[i + 1].height_m;
                if h <= prev && h <= next {
                    TideKind::Low
                } else if h >= prev && h >= next {
                    TideKind::High
                } else if h > prev {
                    TideKind::High
                } else {
                    TideKind::Low
                }
            };

            ClassifiedPoint {
                at: e.at,
                height_m: round2(h),
                kind,
            }
        })
        .collect()
}

/// Pair each low with the next high that rises above it.
pub fn pair_low_to_high(points: &[ClassifiedPoint]) -> Vec<TidalMove> {
    let mut moves = Vec::new();
    let mut i = 0;

    while i < points.len() {
        let low = &points[i];
        if low.kind != TideKind::Low {
            i += 1;
            continue;
        }

        let Some(offset) = points[i + 1..].iter().position(|p| p.kind == TideKind::High) else {
            break;
        };
        let j = i + 1 + offset;
        let high = &points[j];

        if high.height_m > low.height_m {
            moves.push(TidalMove {
                low_time: hhmm(low.at),
                low_m: low.height_m,
                high_time: hhmm(high.at),
                high_m: high.height_m,
                move_m: round2(high.height_m - low.height_m),
            });
            i = j + 1;
        } else {
            i += 1;
        }
    }

    moves
}

/// Classify then pair one day's observations.
pub fn day_moves(events: &[TideObservation]) -> Vec<TidalMove> {
    pair_low_to_high(&classify(events))
}

/// Merge runs of same-kind points, keeping the higher high or the lower low.
///
/// Used on windows that span several days, where monotonic stretches would
/// otherwise report a string of "highs" on the way up.
pub fn collapse_runs(points: &[ClassifiedPoint]) -> Vec<ClassifiedPoint> {
    let mut out: Vec<ClassifiedPoint> = Vec::with_capacity(points.len());
    for point in points {
        match out.last_mut() {
            Some(last) if last.kind == point.kind => {
                let more_extreme = match point.kind {
                    TideKind::High => point.height_m > last.height_m,
                    TideKind::Low => point.height_m < last.height_m,
                };
                if more_extreme {
                    *last = *point;
                }
            }
            _ => out.push(*point),
        }
    }
    out
}

fn hhmm(at: NaiveDateTime) -> String {
    at.format("%H%M").to_string()
}

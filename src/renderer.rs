//! # Terminal Rendering
//!
//! Development mode (`--stdout`) prints the summaries instead of writing JSON:
//! a horizontal bar per day scaled to the biggest move, and a small table of
//! next turns per station. Rendering is split into `render_*` functions that
//! return the text (so they can be tested) and `draw_*` wrappers that print it.

use crate::aggregate::DaySummary;
use crate::next_turn::NextTurn;

/// Width of the longest bar in characters
const BAR_WIDTH: usize = 40;

/// One line per day: date, bar, max move, and the day's pairs.
pub fn render_days(days: &[DaySummary]) -> String {
    if days.is_empty() {
        return "No tidal moves in window\n".to_string();
    }

    let biggest = days
        .iter()
        .map(|d| d.max_move_m)
        .fold(f64::NEG_INFINITY, f64::max);

    let mut out = String::new();
    for day in days {
        let filled = if biggest > 0.0 {
            ((day.max_move_m / biggest) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        let bar: String = "█".repeat(filled) + &"·".repeat(BAR_WIDTH - filled.min(BAR_WIDTH));
        let pairs: Vec<String> = day
            .pairs
            .iter()
            .map(|p| format!("{} {:.2}→{} {:.2}", p.low_time, p.low_m, p.high_time, p.high_m))
            .collect();
        out.push_str(&format!(
            "{} │{}│ {:>5.2} m  (high {:.2} m)  {}\n",
            day.date,
            bar,
            day.max_move_m,
            day.max_high_m,
            pairs.join(", ")
        ));
    }
    out
}

/// Table of next turns; stations with no answer show as `no data`.
pub fn render_next(stations: &[(&str, Option<&NextTurn>)]) -> String {
    let mut out = String::new();
    for (name, turn) in stations {
        let Some(turn) = turn else {
            out.push_str(&format!("{name:<4} no data\n"));
            continue;
        };
        let field = |iso: &Option<String>, m: Option<f64>| match (iso, m) {
            (Some(iso), Some(m)) => format!("{iso} ({m:.2} m)"),
            _ => "—".to_string(),
        };
        out.push_str(&format!(
            "{name:<4} high {}  low {}  range {}\n",
            field(&turn.next_high_iso, turn.next_high_m),
            field(&turn.next_low_iso, turn.next_low_m),
            turn.range_m
                .map(|r| format!("{r:.2} m"))
                .unwrap_or_else(|| "—".to_string()),
        ));
    }
    out
}

pub fn draw_ascii_days(days: &[DaySummary]) {
    print!("{}", render_days(days));
}

pub fn draw_ascii_next(stations: &[(&str, Option<&NextTurn>)]) {
    print!("{}", render_next(stations));
}

//! Output documents read by the static site.
//!
//! Two shapes are produced:
//! - `tides.json`: the biggest low→high moves over the coming window
//! - `tide-next.json`: the next high and low for each station
//!
//! Keys are part of the site's contract and must not change.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aggregate::{DaySummary, Thresholds};
use crate::next_turn::NextTurn;
use crate::tide_data::TideError;

/// Which kind of table the big-tides summary was built from.
#[derive(Debug, Clone, Serialize)]
pub enum TableSource {
    #[serde(rename = "source_csv")]
    Csv(String),
    #[serde(rename = "source_pdf")]
    Pdf(String),
}

/// `tides.json`
#[derive(Debug, Clone, Serialize)]
pub struct BigTidesReport {
    pub source: String,
    #[serde(flatten)]
    pub table: TableSource,
    pub timezone: String,
    pub generated_on: NaiveDate,
    pub days_ahead: i64,
    pub thresholds: Thresholds,
    /// Sorted by `max_move_m`, largest first
    pub days: Vec<DaySummary>,
}

/// `tide-next.json`
#[derive(Debug, Clone, Serialize)]
pub struct NextTurnReport {
    pub timezone: String,
    pub generated_on: NaiveDate,
    pub wp: Option<NextTurn>,
    pub ppb: Option<NextTurn>,
    pub source_wp: Option<String>,
    pub source_ppb: Option<String>,
}

/// Station blocks of an earlier `tide-next.json`.
///
/// Unknown or missing keys are tolerated so older files still load.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PreviousTurns {
    pub wp: Option<NextTurn>,
    pub ppb: Option<NextTurn>,
    pub source_wp: Option<String>,
    pub source_ppb: Option<String>,
}

/// Read the station blocks of an existing `tide-next.json`.
///
/// A missing or unreadable file yields empty blocks.
pub fn read_previous(path: &Path) -> PreviousTurns {
    let Ok(text) = fs::read_to_string(path) else {
        return PreviousTurns::default();
    };
    serde_json::from_str(&text).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "ignoring unreadable previous next-turn file");
        PreviousTurns::default()
    })
}

/// Write a report as pretty JSON, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, report: &T) -> Result<(), TideError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut data = serde_json::to_string_pretty(report)?;
    data.push('\n');
    fs::write(path, data)?;
    info!(path = %path.display(), "wrote report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extrema::TidalMove;
    use serde_json::json;
    use tempfile::tempdir;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn big_tides() -> BigTidesReport {
        BigTidesReport {
            source: "BoM tide tables – Western Port (Stony Point)".to_string(),
            table: TableSource::Csv("data/wp.csv".to_string()),
            timezone: "Australia/Melbourne".to_string(),
            generated_on: date("2026-01-01"),
            days_ahead: 60,
            thresholds: Thresholds {
                high_m: 0.0,
                move_m: 2.0,
            },
            days: vec![DaySummary {
                date: date("2026-01-05"),
                pairs: vec![TidalMove {
                    low_time: "0030".to_string(),
                    low_m: 0.3,
                    high_time: "0630".to_string(),
                    high_m: 2.8,
                    move_m: 2.5,
                }],
                max_high_m: 2.8,
                max_move_m: 2.5,
            }],
        }
    }

    #[test]
    fn test_big_tides_shape() {
        let value = serde_json::to_value(big_tides()).unwrap();
        assert_eq!(
            value,
            json!({
                "source": "BoM tide tables – Western Port (Stony Point)",
                "source_csv": "data/wp.csv",
                "timezone": "Australia/Melbourne",
                "generated_on": "2026-01-01",
                "days_ahead": 60,
                "thresholds": {"high_m": 0.0, "move_m": 2.0},
                "days": [{
                    "date": "2026-01-05",
                    "pairs": [{
                        "low_time": "0030",
                        "low_m": 0.3,
                        "high_time": "0630",
                        "high_m": 2.8,
                        "move_m": 2.5
                    }],
                    "max_high_m": 2.8,
                    "max_move_m": 2.5
                }]
            })
        );
    }

    #[test]
    fn test_pdf_source_key() {
        let mut report = big_tides();
        report.table = TableSource::Pdf("https://example.test/tides.pdf".to_string());
        let value = serde_json::to_value(report).unwrap();
        assert_eq!(value["source_pdf"], "https://example.test/tides.pdf");
        assert!(value.get("source_csv").is_none());
    }

    #[test]
    fn test_next_turn_shape_with_nulls() {
        let report = NextTurnReport {
            timezone: "Australia/Melbourne".to_string(),
            generated_on: date("2026-01-05"),
            wp: None,
            ppb: Some(NextTurn {
                next_high_iso: Some("2026-01-05T18:45:00+11:00".to_string()),
                next_low_iso: None,
                next_high_m: Some(2.9),
                next_low_m: None,
                range_m: None,
            }),
            source_wp: Some("data/wp.csv".to_string()),
            source_ppb: None,
        };
        let value = serde_json::to_value(report).unwrap();
        assert!(value["wp"].is_null());
        assert_eq!(value["ppb"]["nextHighISO"], "2026-01-05T18:45:00+11:00");
        assert!(value["ppb"]["nextLowISO"].is_null());
        assert!(value["ppb"]["range_m"].is_null());
    }

    #[test]
    fn test_read_previous_round_trips_station_blocks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tide-next.json");
        assert_eq!(read_previous(&path), PreviousTurns::default());

        let report = NextTurnReport {
            timezone: "Australia/Melbourne".to_string(),
            generated_on: date("2026-01-05"),
            wp: Some(NextTurn {
                next_high_iso: Some("2026-01-05T18:45:00+11:00".to_string()),
                next_low_iso: Some("2026-01-05T12:30:00+11:00".to_string()),
                next_high_m: Some(2.9),
                next_low_m: Some(0.4),
                range_m: Some(2.5),
            }),
            ppb: None,
            source_wp: Some("data/wp.csv".to_string()),
            source_ppb: None,
        };
        write_json(&path, &report).unwrap();

        let previous = read_previous(&path);
        assert_eq!(previous.wp, report.wp);
        assert_eq!(previous.source_wp.as_deref(), Some("data/wp.csv"));
        assert_eq!(previous.ppb, None);

        fs::write(&path, "not json").unwrap();
        assert_eq!(read_previous(&path), PreviousTurns::default());
    }

    #[test]
    fn test_write_creates_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("docs").join("tides.json");
        write_json(&path, &big_tides()).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["days"][0]["max_move_m"], 2.5);
    }
}

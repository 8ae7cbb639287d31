//! CSV tide tables: `date,time,height_m` rows into an [`EventStore`].
//!
//! `date` is `YYYY-MM-DD`; `time` is `HHMM` or `HMM`, optionally with a colon;
//! `height_m` is a decimal. Extra columns are ignored. A missing header column
//! is fatal. A bad individual row is recorded and skipped.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::event_store::EventStore;
use crate::tide_data::{ParseReport, TideError};
use crate::{normalize_hhmm, TideObservation};

const REQUIRED: [&str; 3] = ["date", "time", "height_m"];

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    height_m: Option<String>,
}

/// Parse CSV bytes into a finalized event store.
///
/// # Errors
/// [`TideError::MissingColumns`] if the header lacks a required column, or
/// [`TideError::Csv`] if the header itself cannot be read.
pub fn load_csv(bytes: &[u8]) -> Result<(EventStore, ParseReport), TideError> {
    let bytes = bytes.strip_prefix("\u{feff}".as_bytes()).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    if !REQUIRED.iter().all(|r| headers.iter().any(|h| h == *r)) {
        return Err(TideError::MissingColumns {
            required: REQUIRED.to_vec(),
            found: headers.iter().map(str::to_string).collect(),
        });
    }

    let mut store = EventStore::new();
    let mut report = ParseReport::default();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        // Header is line 1
        let location = format!("row {}", index + 2);
        let row = match result {
            Ok(row) => row,
            Err(error) => {
                report.skip(location, error.to_string());
                continue;
            }
        };
        match observation(&row) {
            Ok(obs) => {
                if store.add(obs) {
                    report.accepted += 1;
                } else {
                    report.duplicates += 1;
                }
            }
            Err(reason) => report.skip(location, reason),
        }
    }

    store.finalize();
    Ok((store, report))
}

fn observation(row: &CsvRow) -> Result<TideObservation, String> {
    let field = |value: &Option<String>, name: &str| -> Result<String, String> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| format!("missing {name}"))
    };
    let date = field(&row.date, "date")?;
    let time = field(&row.time, "time")?;
    let height = field(&row.height_m, "height_m")?;

    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|_| format!("invalid date {date:?}"))?;
    let height: f64 = height
        .parse()
        .map_err(|_| format!("non-numeric height {height:?}"))?;
    let hhmm = normalize_hhmm(&time);
    TideObservation::from_hhmm(date, &hhmm, height).ok_or_else(|| format!("invalid time {time:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loads_and_sorts_rows() {
        let csv = "date,time,height_m\n\
                   2026-01-05,1845,2.9\n\
                   2026-01-05,0030,0.3\n\
                   2026-01-05,6:30,2.8\n\
                   2026-01-05,1230,0.4\n";
        let (store, report) = load_csv(csv.as_bytes()).unwrap();
        let times: Vec<String> = store.get_iso("2026-01-05").iter().map(|e| e.hhmm()).collect();
        assert_eq!(times, ["0030", "0630", "1230", "1845"]);
        assert_eq!(report.accepted, 4);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_bad_rows_are_skipped() {
        let csv = "date,time,height_m\n\
                   2026-01-05,0030,0.3\n\
                   2026-02-31,0630,2.8\n\
                   2026-01-05,,2.8\n\
                   2026-01-05,1230,abc\n\
                   2026-01-05,2575,0.4\n\
                   2026-01-05,1845,2.9\n";
        let (store, report) = load_csv(csv.as_bytes()).unwrap();
        assert_eq!(store.get_iso("2026-01-05").len(), 2);
        assert_eq!(report.accepted, 2);
        assert_eq!(report.skipped.len(), 4);
    }

    #[test]
    fn test_bom_and_extra_columns() {
        let csv = "\u{feff}station,date,time,height_m\nWP,2026-03-01,43,0.51\n";
        let (store, _) = load_csv(csv.as_bytes()).unwrap();
        assert_eq!(store.get_iso("2026-03-01")[0].hhmm(), "0043");
    }

    #[test]
    fn test_missing_header_is_fatal() {
        let err = load_csv(b"date,time,height\n2026-01-05,0030,0.3\n").unwrap_err();
        assert!(matches!(err, TideError::MissingColumns { .. }));
    }

    #[test]
    fn test_empty_source_is_not_an_error() {
        let (store, report) = load_csv(b"date,time,height_m\n").unwrap();
        assert!(store.is_empty());
        assert_eq!(report, ParseReport::default());
    }
}

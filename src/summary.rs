//! # Summary Pipelines
//!
//! Glue between acquisition, parsing, and the two report shapes. Each function
//! here is one step the binary runs; none of them keep state between runs.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use tracing::{info, warn};

use crate::aggregate::{aggregate, WindowQuery};
use crate::config::{Config, StationSource};
use crate::csv_source::load_csv;
use crate::event_store::EventStore;
use crate::next_turn::{next_turn, NextTurn};
use crate::pdf_source::load_pdf;
use crate::report::{read_previous, BigTidesReport, NextTurnReport, PreviousTurns, TableSource};
use crate::tide_data::{acquire, is_pdf, SourceBytes, SourceSpec, TideError};
use crate::worldtides::{fetch_extremes, next_from_extremes, ExtremesQuery};

pub const WORLDTIDES_KEY_VAR: &str = "WORLDTIDES_API_KEY";

/// Parse acquired bytes as a PDF or CSV tide table.
pub fn parse_table(source: &SourceBytes, base_year: i32) -> Result<(EventStore, TableSource), TideError> {
    let (store, report, table) = if is_pdf(&source.label, &source.bytes) {
        let (store, report) = load_pdf(&source.bytes, base_year, &source.label)?;
        (store, report, TableSource::Pdf(source.label.clone()))
    } else {
        let (store, report) = load_csv(&source.bytes)?;
        (store, report, TableSource::Csv(source.label.clone()))
    };

    report.log_summary(&source.label);
    if store.is_empty() && !report.skipped.is_empty() {
        warn!(source = %source.label, "every row was skipped");
    }
    Ok((store, table))
}

/// Build `tides.json` for the window starting `today`.
///
/// # Errors
/// [`TideError::InvalidWindow`] when `days_ahead` is negative or out of range.
pub fn big_tides_report(
    store: &EventStore,
    table: TableSource,
    config: &Config,
    today: NaiveDate,
) -> Result<BigTidesReport, TideError> {
    let query = WindowQuery {
        start: today,
        end: config.window_end(today)?,
        thresholds: config.thresholds(),
        mode: config.report.threshold_mode,
        top_n: config.report.top_n,
    };
    let days = aggregate(store, &query);
    info!(
        days = days.len(),
        start = %query.start,
        end = %query.end,
        "aggregated tidal moves"
    );

    Ok(BigTidesReport {
        source: config.source.name.clone(),
        table,
        timezone: config.report.timezone.clone(),
        generated_on: today,
        days_ahead: config.report.days_ahead,
        thresholds: query.thresholds,
        days,
    })
}

/// Next turn for one station.
///
/// `Ok(None)` means the station's data was read but no complete turn was
/// found in the window. Tables are compared on `now`'s wall clock; WorldTides
/// extremes on the instant.
pub async fn station_turn(
    station: &StationSource,
    config: &Config,
    now: DateTime<FixedOffset>,
    api_key: Option<&str>,
) -> Result<Option<NextTurn>, TideError> {
    let offset = &config.report.utc_offset;
    let spec = match station {
        StationSource::Csv { path } => SourceSpec {
            path: Some(path.clone()),
            url: None,
        },
        StationSource::Pdf { path, url } => SourceSpec {
            path: path.clone(),
            url: url.clone(),
        },
        StationSource::Worldtides {
            lat,
            lon,
            station_distance_km,
        } => {
            let key = api_key.ok_or_else(|| {
                TideError::SourceMissing(format!("{WORLDTIDES_KEY_VAR} is not set"))
            })?;
            let query = ExtremesQuery {
                lat: *lat,
                lon: *lon,
                days: 2,
                station_distance_km: *station_distance_km,
            };
            let extremes = fetch_extremes(&query, key, &config.fetch_options()).await?;
            return Ok(Some(next_from_extremes(&extremes, now.with_timezone(&Utc))));
        }
    };

    let source = acquire(&spec, &config.fetch_options()).await?;
    let (store, _) = parse_table(&source, config.source.base_year)?;
    Ok(next_turn(&store.events(), now.naive_local(), config.turn_window(), offset))
}

/// Build `tide-next.json` for both stations.
///
/// A station with no configured source keeps its block from the existing
/// `next.output_path` file, so a job refreshing one station leaves the other
/// in place.
pub async fn next_turn_report(
    config: &Config,
    now: DateTime<FixedOffset>,
    api_key: Option<&str>,
) -> Result<NextTurnReport, TideError> {
    let previous = if config.next.wp.is_none() || config.next.ppb.is_none() {
        read_previous(&config.next.output_path)
    } else {
        PreviousTurns::default()
    };

    let (wp, source_wp) = match &config.next.wp {
        Some(station) => (station_turn(station, config, now, api_key).await?, Some(station.describe())),
        None => {
            info!(carried = previous.wp.is_some(), "wp not configured, keeping previous block");
            (previous.wp, previous.source_wp)
        }
    };
    let (ppb, source_ppb) = match &config.next.ppb {
        Some(station) => (station_turn(station, config, now, api_key).await?, Some(station.describe())),
        None => {
            info!(carried = previous.ppb.is_some(), "ppb not configured, keeping previous block");
            (previous.ppb, previous.source_ppb)
        }
    };

    Ok(NextTurnReport {
        timezone: config.report.timezone.clone(),
        generated_on: now.date_naive(),
        wp,
        ppb,
        source_wp,
        source_ppb,
    })
}

//! WorldTides v3 extremes as a station source.
//!
//! For stations without a local table, the next turn can come straight from the
//! WorldTides API, which already labels each extreme as high or low. Each extreme
//! carries its own UTC offset, so "upcoming" is decided on instants and the
//! reported timestamps keep the offset the API gave (`+10:00` in winter,
//! `+11:00` in summer) regardless of the host's zone.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::next_turn::NextTurn;
use crate::tide_data::{FetchOptions, TideError};

pub const WORLDTIDES_URL: &str = "https://www.worldtides.info/api/v3";

/// One extreme as returned by the API.
#[derive(Clone, Debug, Deserialize)]
pub struct Extreme {
    /// ISO 8601 with offset, e.g. `2026-01-05T06:30+11:00`
    pub date: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub height: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ExtremesResponse {
    status: u16,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    extremes: Vec<Extreme>,
}

/// Query parameters for one station.
#[derive(Clone, Debug)]
pub struct ExtremesQuery {
    pub lat: f64,
    pub lon: f64,
    pub days: u32,
    pub station_distance_km: u32,
}

/// Fetch the next few days of extremes around a coordinate.
///
/// # Errors
/// [`TideError::Http`] on transport failure, [`TideError::Api`] when the API
/// answers with a non-200 status.
pub async fn fetch_extremes(
    query: &ExtremesQuery,
    api_key: &str,
    opts: &FetchOptions,
) -> Result<Vec<Extreme>, TideError> {
    let client = reqwest::Client::builder().timeout(opts.timeout).build()?;
    let response: ExtremesResponse = client
        .get(WORLDTIDES_URL)
        .query(&[
            ("extremes", String::new()),
            ("date", "today".to_string()),
            ("days", query.days.to_string()),
            ("localtime", String::new()),
            ("lat", query.lat.to_string()),
            ("lon", query.lon.to_string()),
            ("stationDistance", query.station_distance_km.to_string()),
            ("key", api_key.to_string()),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    if response.status != 200 {
        return Err(TideError::Api(
            response
                .error
                .unwrap_or_else(|| format!("status {}", response.status)),
        ));
    }
    info!(extremes = response.extremes.len(), "fetched WorldTides extremes");
    Ok(response.extremes)
}

/// An extreme's timestamp; the API omits seconds.
fn instant(date: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(date)
        .or_else(|_| DateTime::parse_from_str(date, "%Y-%m-%dT%H:%M%:z"))
        .ok()
}

/// First high and first low at or after `now` from pre-labelled extremes.
///
/// Unlike the table path, a partial answer is kept: whichever of the two turns
/// is missing is `null` and `range_m` is omitted.
pub fn next_from_extremes(extremes: &[Extreme], now: DateTime<Utc>) -> NextTurn {
    let mut high = None;
    let mut low = None;

    for extreme in extremes {
        let (Some(date), Some(height)) = (&extreme.date, extreme.height) else {
            continue;
        };
        let Some(at) = instant(date) else {
            debug!(%date, "unparseable extreme timestamp");
            continue;
        };
        if at.with_timezone(&Utc) < now {
            continue;
        }
        match extreme.kind.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("high") if high.is_none() => high = Some((at, height)),
            Some("low") if low.is_none() => low = Some((at, height)),
            _ => {}
        }
        if high.is_some() && low.is_some() {
            break;
        }
    }

    NextTurn::from_instants(high, low)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extremes() -> Vec<Extreme> {
        serde_json::from_str(
            r#"[
                {"dt": 1767551400, "date": "2026-01-05T00:30+11:00", "height": -0.61, "type": "Low"},
                {"dt": 1767573000, "date": "2026-01-05T06:30+11:00", "height": 0.72, "type": "High"},
                {"dt": 1767594600, "date": "2026-01-05T12:30+11:00", "height": -0.55, "type": "Low"},
                {"dt": 1767617100, "date": "2026-01-05T18:45+11:00", "height": 0.81, "type": "High"}
            ]"#,
        )
        .unwrap()
    }

    fn at(iso: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(iso).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_first_turns_after_now() {
        let turn = next_from_extremes(&extremes(), at("2026-01-05T07:00:00+11:00"));
        assert_eq!(turn.next_low_iso.as_deref(), Some("2026-01-05T12:30:00+11:00"));
        assert_eq!(turn.next_high_iso.as_deref(), Some("2026-01-05T18:45:00+11:00"));
        assert_eq!(turn.range_m, Some(1.36));
    }

    #[test]
    fn test_exact_now_is_inclusive() {
        let turn = next_from_extremes(&extremes(), at("2026-01-05T06:30:00+11:00"));
        assert_eq!(turn.next_high_iso.as_deref(), Some("2026-01-05T06:30:00+11:00"));
    }

    #[test]
    fn test_partial_result_keeps_found_turn() {
        let turn = next_from_extremes(&extremes(), at("2026-01-05T13:00:00+11:00"));
        assert!(turn.next_high_iso.is_some());
        assert_eq!(turn.next_low_iso, None);
        assert_eq!(turn.range_m, None);
    }

    #[test]
    fn test_winter_offset_is_kept() {
        let winter: Vec<Extreme> = serde_json::from_str(
            r#"[
                {"date": "2026-06-05T00:12+10:00", "height": -0.48, "type": "Low"},
                {"date": "2026-06-05T06:30+10:00", "height": 0.66, "type": "High"},
                {"date": "2026-06-05T12:41+10:00", "height": -0.52, "type": "Low"}
            ]"#,
        )
        .unwrap();

        // 06:30+10:00 is 20:30 UTC the previous day
        let turn = next_from_extremes(&winter, at("2026-06-04T20:00:00Z"));
        assert_eq!(turn.next_high_iso.as_deref(), Some("2026-06-05T06:30:00+10:00"));
        assert_eq!(turn.next_low_iso.as_deref(), Some("2026-06-05T12:41:00+10:00"));

        // 07:00+11:00 is 06:00+10:00, so the 06:30 high is still ahead
        let turn = next_from_extremes(&winter, at("2026-06-05T07:00:00+11:00"));
        assert_eq!(turn.next_high_iso.as_deref(), Some("2026-06-05T06:30:00+10:00"));

        let turn = next_from_extremes(&winter, at("2026-06-05T06:31:00+10:00"));
        assert_eq!(turn.next_high_iso, None);
    }

    #[test]
    fn test_error_status_body() {
        let body: ExtremesResponse =
            serde_json::from_str(r#"{"status": 400, "error": "Missing key"}"#).unwrap();
        assert_eq!(body.status, 400);
        assert!(body.extremes.is_empty());
    }
}

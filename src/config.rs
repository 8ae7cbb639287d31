//! # Configuration Management
//!
//! This module loads configuration from the `tide-config.toml` file and then
//! applies environment overrides, so the same binary runs unchanged locally and
//! in a scheduled CI job that only sets variables.
//!
//! ## Environment Overrides
//! | Variable | Field |
//! |---|---|
//! | `LOCAL_CSV_PATH` | `source.csv_path` |
//! | `LOCAL_PDF_PATH` | `source.pdf_path` |
//! | `PDF_URL` | `source.pdf_url` |
//! | `BASE_YEAR` | `source.base_year` |
//! | `DAYS_AHEAD` | `report.days_ahead` |
//! | `MIN_HIGH_M` | `report.min_high_m` |
//! | `MIN_MOVE_M` | `report.min_move_m` |
//! | `THRESHOLD_MODE` | `report.threshold_mode` (`published` or `strict`) |
//! | `TOP_N` | `report.top_n` (`0` disables the cap) |
//! | `TZ_LABEL` | `report.timezone` |
//! | `UTC_OFFSET` | `report.utc_offset` |
//! | `OUTPUT_PATH` | `report.output_path` |
//! | `FETCH_TIMEOUT_SECS` | `fetch.timeout_secs` |
//!
//! ## Table Source Precedence
//! An explicitly set CSV that exists on disk is used first. Otherwise a configured
//! PDF (local path, then URL) is used. With neither set, the bundled
//! `data/westernport_tides_2026.csv` is read.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::{Datelike, Local, NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aggregate::{ThresholdMode, Thresholds};
use crate::next_turn::TurnWindow;
use crate::tide_data::{FetchOptions, SourceSpec, TideError};

pub const DEFAULT_CONFIG_PATH: &str = "tide-config.toml";
pub const DEFAULT_CSV_PATH: &str = "data/westernport_tides_2026.csv";

/// Application configuration loaded from tide-config.toml
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Tide table for the big-tides summary
    pub source: SourceConfig,
    /// Summary window, filters, and output
    pub report: ReportConfig,
    /// Remote fetch behaviour
    pub fetch: FetchConfig,
    /// Per-station next-turn summary
    pub next: NextConfig,
}

/// Where the big-tides tide table lives
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Human-readable description echoed into the output
    pub name: String,
    /// Unset means `DEFAULT_CSV_PATH` unless a PDF is configured
    pub csv_path: Option<PathBuf>,
    pub pdf_path: Option<PathBuf>,
    /// Used only when `pdf_path` is unset or missing on disk
    pub pdf_url: Option<String>,
    /// Year assumed for month headings that do not print one
    pub base_year: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    pub days_ahead: i64,
    /// Minimum daily high in metres; `0` disables
    pub min_high_m: f64,
    /// Minimum daily move in metres; `0` disables
    pub min_move_m: f64,
    pub threshold_mode: ThresholdMode,
    /// Keep only the biggest N days; `None` keeps all
    pub top_n: Option<usize>,
    /// Opaque zone label echoed into the output
    pub timezone: String,
    /// Fixed offset appended to reported timestamps, e.g. `+11:00`
    pub utc_offset: String,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    /// Extra request headers, e.g. a browser-like `User-Agent`
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NextConfig {
    pub behind_hours: i64,
    pub ahead_hours: i64,
    pub output_path: PathBuf,
    /// Western Port station
    pub wp: Option<StationSource>,
    /// Port Phillip Bay station
    pub ppb: Option<StationSource>,
}

/// How one station's observations are obtained
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StationSource {
    Csv {
        path: PathBuf,
    },
    Pdf {
        path: Option<PathBuf>,
        url: Option<String>,
    },
    /// Pre-labelled extremes from the WorldTides API; key from `WORLDTIDES_API_KEY`
    Worldtides {
        lat: f64,
        lon: f64,
        #[serde(default = "default_station_distance")]
        station_distance_km: u32,
    },
}

fn default_station_distance() -> u32 {
    10
}

impl StationSource {
    /// Short description for the `source_*` output fields.
    pub fn describe(&self) -> String {
        match self {
            StationSource::Csv { path } => path.display().to_string(),
            StationSource::Pdf { path, url } => match (path, url) {
                (Some(path), _) if path.exists() => path.display().to_string(),
                (_, Some(url)) => url.clone(),
                (Some(path), None) => path.display().to_string(),
                (None, None) => "unconfigured PDF".to_string(),
            },
            StationSource::Worldtides { lat, lon, .. } => {
                format!("WorldTides extremes near {lat},{lon}")
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source: SourceConfig::default(),
            report: ReportConfig::default(),
            fetch: FetchConfig::default(),
            next: NextConfig::default(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            name: "BoM tide tables – Western Port (Stony Point)".to_string(),
            csv_path: None,
            pdf_path: None,
            pdf_url: None,
            base_year: Local::now().year(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            days_ahead: 60,
            min_high_m: 0.0,
            min_move_m: 0.0,
            threshold_mode: ThresholdMode::AsPublished,
            top_n: Some(10),
            timezone: "Australia/Melbourne".to_string(),
            utc_offset: "+11:00".to_string(),
            output_path: PathBuf::from("docs/tides.json"),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            timeout_secs: 30,
            headers: BTreeMap::from([(
                "User-Agent".to_string(),
                "Mozilla/5.0 (compatible; tide-moves/0.1)".to_string(),
            )]),
        }
    }
}

impl Default for NextConfig {
    fn default() -> Self {
        NextConfig {
            behind_hours: 24,
            ahead_hours: 48,
            output_path: PathBuf::from("docs/tide-next.json"),
            wp: Some(StationSource::Csv {
                path: PathBuf::from("data/westernport_tides_2026_FULL.csv"),
            }),
            ppb: Some(StationSource::Csv {
                path: PathBuf::from("data/portphillip_tides_2026.csv"),
            }),
        }
    }
}

impl Config {
    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), "loaded configuration");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "invalid config file format, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                info!(path = %path.display(), "no config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Apply environment-style overrides from `lookup`.
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("LOCAL_CSV_PATH") {
            self.source.csv_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("LOCAL_PDF_PATH") {
            self.source.pdf_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("PDF_URL") {
            self.source.pdf_url = Some(v);
        }
        if let Some(v) = parsed(&get, "BASE_YEAR") {
            self.source.base_year = v;
        }
        if let Some(v) = parsed(&get, "DAYS_AHEAD") {
            self.report.days_ahead = v;
        }
        if let Some(v) = parsed(&get, "MIN_HIGH_M") {
            self.report.min_high_m = v;
        }
        if let Some(v) = parsed(&get, "MIN_MOVE_M") {
            self.report.min_move_m = v;
        }
        if let Some(v) = get("THRESHOLD_MODE") {
            match v.to_ascii_lowercase().as_str() {
                "published" | "aspublished" | "or" => self.report.threshold_mode = ThresholdMode::AsPublished,
                "strict" | "and" => self.report.threshold_mode = ThresholdMode::Strict,
                other => warn!(value = other, "ignoring unknown THRESHOLD_MODE"),
            }
        }
        if let Some(v) = parsed::<usize, _>(&get, "TOP_N") {
            self.report.top_n = (v > 0).then_some(v);
        }
        if let Some(v) = get("TZ_LABEL") {
            self.report.timezone = v;
        }
        if let Some(v) = get("UTC_OFFSET") {
            self.report.utc_offset = v;
        }
        if let Some(v) = get("OUTPUT_PATH") {
            self.report.output_path = PathBuf::from(v);
        }
        if let Some(v) = parsed(&get, "FETCH_TIMEOUT_SECS") {
            self.fetch.timeout_secs = v;
        }
        self
    }

    /// The big-tides source, following the precedence in the module docs.
    pub fn table_source(&self) -> SourceSpec {
        let csv = |path: &Path| SourceSpec {
            path: Some(path.to_path_buf()),
            url: None,
        };
        match (&self.source.csv_path, &self.source.pdf_path, &self.source.pdf_url) {
            (Some(path), None, None) => csv(path),
            (Some(path), _, _) if path.exists() => csv(path),
            (None, None, None) => csv(Path::new(DEFAULT_CSV_PATH)),
            (_, pdf, url) => SourceSpec {
                path: pdf.clone(),
                url: url.clone(),
            },
        }
    }

    /// Last date of the big-tides window starting at `today`.
    ///
    /// # Errors
    /// [`TideError::InvalidWindow`] for a negative `days_ahead` or one that runs
    /// past the calendar.
    pub fn window_end(&self, today: NaiveDate) -> Result<NaiveDate, TideError> {
        let days = self.report.days_ahead;
        if days < 0 {
            return Err(TideError::InvalidWindow(format!("days_ahead is negative ({days})")));
        }
        TimeDelta::try_days(days)
            .and_then(|delta| today.checked_add_signed(delta))
            .ok_or_else(|| TideError::InvalidWindow(format!("days_ahead {days} is out of range")))
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            high_m: self.report.min_high_m,
            move_m: self.report.min_move_m,
        }
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: Duration::from_secs(self.fetch.timeout_secs),
            headers: self.fetch.headers.clone(),
        }
    }

    pub fn turn_window(&self) -> TurnWindow {
        TurnWindow {
            behind_hours: self.next.behind_hours,
            ahead_hours: self.next.ahead_hours,
        }
    }
}

fn parsed<T, G>(get: &G, key: &str) -> Option<T>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    let raw = get(key)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable override");
            None
        }
    }
}

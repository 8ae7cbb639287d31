//! # Tide Table Tokenizer
//!
//! Turns one page of extracted text (or one grid of table cells) into an ordered
//! stream of [`PageToken`]s: month headings and day rows of (time, height) pairs.
//!
//! Extracted tide tables are noisy. Columns run together, layout artifacts stick
//! to numbers, and rows carry anywhere from two to four readings. The tokenizer is
//! therefore tolerant: anything it does not recognise is skipped, and nothing on a
//! page can make it fail.
//!
//! Order matters. Headings and rows are emitted in reading order so that the
//! calendar resolver can anchor each row to the heading above it.

use std::sync::LazyLock;

use regex::Regex;

use crate::normalize_hhmm;

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(january|february|march|april|may|june|july|august|september|october|november|december)(?:\s+(\d{4}))?\s*$",
    )
    .unwrap()
});

static DAY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{1,2}$").unwrap());

static TIME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{3,4}$").unwrap());

/// A month heading, with the year when the page states one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Heading {
    /// 1 = January … 12 = December
    pub month: u32,
    pub year: Option<i32>,
}

/// A candidate day row: day-of-month plus its readings.
#[derive(Clone, Debug, PartialEq)]
pub struct DayRow {
    pub day: u32,
    /// `(HHMM, height_m)`; the time is zero-padded but not yet validated
    pub pairs: Vec<(String, f64)>,
    /// Height tokens that could not be parsed even after sanitizing
    pub dropped: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PageToken {
    Heading(Heading),
    Row(DayRow),
}

/// Recognise a month heading line or cell.
pub fn parse_heading(text: &str) -> Option<Heading> {
    let caps = HEADING.captures(text)?;
    let name = caps.get(1)?.as_str().to_ascii_lowercase();
    let month = MONTHS.iter().position(|m| *m == name)? as u32 + 1;
    let year = caps.get(2).and_then(|y| y.as_str().parse().ok());
    Some(Heading { month, year })
}

/// Keep only digits and the first decimal point, then parse.
///
/// `"2.8O"` → `2.8`, `"1.2.3"` → `1.23`, `"m"` → `None`.
pub fn sanitize_height(token: &str) -> Option<f64> {
    let mut seen_point = false;
    let cleaned: String = token
        .chars()
        .filter(|c| {
            if c.is_ascii_digit() {
                true
            } else if *c == '.' && !seen_point {
                seen_point = true;
                true
            } else {
                false
            }
        })
        .collect();
    cleaned.parse().ok()
}

/// Parse a whitespace-token sequence as a day row.
///
/// The first token must be a 1–2 digit day in `[1, 31]`. The rest are scanned
/// pairwise: a `\d{3,4}` time token followed by a height token is one reading.
/// Tokens that fit neither role are stepped over one at a time.
pub fn parse_day_tokens<'a, I>(tokens: I) -> Option<DayRow>
where
    I: IntoIterator<Item = &'a str>,
{
    let tokens: Vec<&str> = tokens.into_iter().collect();
    let first = tokens.first()?;
    if !DAY.is_match(first) {
        return None;
    }
    let day: u32 = first.parse().ok()?;
    if !(1..=31).contains(&day) {
        return None;
    }

    let mut row = DayRow {
        day,
        pairs: Vec::new(),
        dropped: Vec::new(),
    };

    let mut i = 1;
    while i + 1 < tokens.len() {
        let (time, height) = (tokens[i], tokens[i + 1]);
        if TIME.is_match(time) && is_height_candidate(height) {
            match sanitize_height(height) {
                Some(h) => row.pairs.push((normalize_hhmm(time), h)),
                None => row.dropped.push(height.to_string()),
            }
            i += 2;
        } else {
            i += 1;
        }
    }

    Some(row)
}

/// A height slot holds something numeric-looking that is not another time.
fn is_height_candidate(token: &str) -> bool {
    !TIME.is_match(token) && token.chars().any(|c| c.is_ascii_digit() || c == '.')
}

/// Tokenize one page of text lines.
pub fn tokenize_lines<S: AsRef<str>>(lines: &[S]) -> Vec<PageToken> {
    let mut out = Vec::new();
    for line in lines {
        let line = line.as_ref();
        if let Some(heading) = parse_heading(line) {
            out.push(PageToken::Heading(heading));
        } else if let Some(row) = parse_day_tokens(line.split_whitespace()) {
            out.push(PageToken::Row(row));
        }
    }
    out
}

/// Tokenize one table grid (rows of cells).
///
/// A row containing a month-heading cell is a heading, whatever the other cells
/// hold (column captions often share the heading's row). Otherwise the row's
/// cells are flattened into whitespace tokens and parsed as a day row, so a cell
/// holding `"0630 2.80"` works as well as two separate cells.
pub fn tokenize_grid<S: AsRef<str>>(rows: &[Vec<S>]) -> Vec<PageToken> {
    let mut out = Vec::new();
    for row in rows {
        let cells: Vec<&str> = row
            .iter()
            .map(|c| c.as_ref().trim())
            .filter(|c| !c.is_empty())
            .collect();

        if let Some(heading) = cells.iter().find_map(|c| parse_heading(c)) {
            out.push(PageToken::Heading(heading));
            continue;
        }

        if let Some(day_row) = parse_day_tokens(cells.iter().flat_map(|c| c.split_whitespace())) {
            out.push(PageToken::Row(day_row));
        }
    }
    out
}

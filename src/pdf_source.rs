//! # PDF Tide Tables
//!
//! Published tide tables are typeset PDFs. Text extraction is handled by
//! `lopdf` and treated as a black box producing one block of text per page; this
//! module decides how to read that text.
//!
//! ## Extraction Strategies
//! Two readings of the same pages are tried, in order:
//! 1. [`Strategy::PageText`]: each text line is tokenized directly
//! 2. [`Strategy::TableGrid`]: each line is first split into table cells on tab
//!    or wide-space column gaps, then tokenized as a grid
//!
//! Day rows read the same either way, since grid cells are flattened back into
//! tokens. The grid reading only differs on month headings that share a line
//! with other columns (`"APRIL 2026\t\tTime  m"`), which page text cannot
//! recognise. It is a fallback for that layout, not a second table parser.
//!
//! Each strategy folds the pages through a fresh [`CalendarState`] into its own
//! [`EventStore`]. The strategy that resolves the most dates wins; ties go to
//! the earlier strategy. If every strategy resolves zero dates the document is
//! probably image-only, and [`TideError::NoDataParsed`] is returned.

use std::sync::LazyLock;

use lopdf::Document;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::calendar::CalendarState;
use crate::event_store::EventStore;
use crate::tide_data::{ParseReport, TideError};
use crate::tokenizer::{tokenize_grid, tokenize_lines, PageToken};

static CELL_GAP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\t+|\s{2,}").unwrap());

/// One way of turning page text into tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    PageText,
    /// Same rows as `PageText`; also finds headings sharing a line with columns
    TableGrid,
}

/// Strategies in preference order.
pub const STRATEGIES: [Strategy; 2] = [Strategy::PageText, Strategy::TableGrid];

impl Strategy {
    fn tokenize(self, lines: &[String]) -> Vec<PageToken> {
        match self {
            Strategy::PageText => tokenize_lines(lines),
            Strategy::TableGrid => tokenize_grid(&split_cells(lines)),
        }
    }
}

/// Split lines into cells on tabs or runs of two or more spaces.
pub fn split_cells(lines: &[String]) -> Vec<Vec<String>> {
    lines
        .iter()
        .map(|line| {
            CELL_GAP
                .split(line.trim())
                .filter(|cell| !cell.is_empty())
                .map(str::to_string)
                .collect()
        })
        .collect()
}

/// Result of running one strategy over a document.
#[derive(Debug)]
pub struct Extraction {
    pub strategy: Strategy,
    pub store: EventStore,
    pub report: ParseReport,
}

impl Extraction {
    pub fn date_count(&self) -> usize {
        self.store.date_count()
    }
}

/// Fold every page through one strategy.
pub fn run_strategy(strategy: Strategy, pages: &[Vec<String>], base_year: i32) -> Extraction {
    let mut store = EventStore::new();
    let mut report = ParseReport::default();

    let state = pages
        .iter()
        .enumerate()
        .fold(CalendarState::new(base_year), |state, (index, lines)| {
            let tokens = strategy.tokenize(lines);
            state.scan_page(index + 1, &tokens, &mut store, &mut report)
        });
    store.finalize();

    debug!(
        ?strategy,
        dates = store.date_count(),
        final_year = state.year,
        "extraction strategy finished"
    );
    Extraction {
        strategy,
        store,
        report,
    }
}

/// Run every strategy and keep the one that resolved the most dates.
///
/// # Errors
/// [`TideError::NoDataParsed`] when no strategy resolves a single date.
pub fn extract_pages(
    pages: &[Vec<String>],
    base_year: i32,
    label: &str,
) -> Result<Extraction, TideError> {
    let mut best: Option<Extraction> = None;
    for strategy in STRATEGIES {
        let candidate = run_strategy(strategy, pages, base_year);
        if best
            .as_ref()
            .map_or(true, |b| candidate.date_count() > b.date_count())
        {
            best = Some(candidate);
        }
    }

    match best {
        Some(extraction) if extraction.date_count() > 0 => {
            info!(
                source = label,
                strategy = ?extraction.strategy,
                dates = extraction.date_count(),
                "extracted PDF tide table"
            );
            Ok(extraction)
        }
        _ => Err(TideError::NoDataParsed(label.to_string())),
    }
}

/// Page text from a PDF, one `Vec` of lines per page.
///
/// Pages whose text cannot be extracted come back empty and are listed in the
/// returned report.
pub fn pdf_pages(bytes: &[u8]) -> Result<(Vec<Vec<String>>, ParseReport), TideError> {
    let doc = Document::load_mem(bytes)?;
    let mut report = ParseReport::default();

    let pages = doc
        .get_pages()
        .keys()
        .map(|&number| match doc.extract_text(&[number]) {
            Ok(text) => text.lines().map(str::to_string).collect(),
            Err(error) => {
                warn!(page = number, %error, "page text extraction failed");
                report.skip(format!("page {number}"), format!("text extraction failed: {error}"));
                Vec::new()
            }
        })
        .collect();

    Ok((pages, report))
}

/// Parse a PDF tide table into a finalized event store.
pub fn load_pdf(
    bytes: &[u8],
    base_year: i32,
    label: &str,
) -> Result<(EventStore, ParseReport), TideError> {
    let (pages, mut report) = pdf_pages(bytes)?;
    let extraction = extract_pages(&pages, base_year, label)?;

    report.accepted += extraction.report.accepted;
    report.duplicates += extraction.report.duplicates;
    report.skipped.extend(extraction.report.skipped);
    Ok((extraction.store, report))
}

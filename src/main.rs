//! # Tide Moves Application Entry Point
//!
//! This binary runs one batch summary and exits:
//! - `moves`: biggest low→high tidal moves over the coming window (`tides.json`)
//! - `next`: next high and low per station (`tide-next.json`)
//!
//! With `--stdout` it renders the summary to the terminal instead of writing JSON.


use std::env;
use std::io;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tide_moves_lib::config::{Config, DEFAULT_CONFIG_PATH};
use tide_moves_lib::renderer::{draw_ascii_days, draw_ascii_next};
use tide_moves_lib::report::write_json;
use tide_moves_lib::summary::{big_tides_report, next_turn_report, parse_table, WORLDTIDES_KEY_VAR};
use tide_moves_lib::tide_data::acquire;

#[derive(Parser, Debug)]
#[command(author, version, about = "Tide table summaries for static tide widgets", long_about = None)]
struct Cli {
    /// Configuration file (missing file means defaults)
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Print to the terminal instead of writing JSON
    #[arg(long)]
    stdout: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarise the biggest low-to-high moves over the coming days
    Moves,
    /// Find the next high and low tide for each station
    Next,
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let cli = Cli::parse();
    let config = Config::load_from_path(&cli.config).with_env(|key| env::var(key).ok());

    // Only the remote fetch suspends; everything else is plain computation
    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Command::Moves => run_moves(&rt, &config, cli.stdout),
        Command::Next => run_next(&rt, &config, cli.stdout),
    }
}

fn run_moves(rt: &tokio::runtime::Runtime, config: &Config, stdout: bool) -> anyhow::Result<()> {
    let today = Local::now().date_naive();
    let spec = config.table_source();

    let source = rt
        .block_on(acquire(&spec, &config.fetch_options()))
        .context("could not obtain a tide table")?;
    let (store, table) = parse_table(&source, config.source.base_year)
        .with_context(|| format!("could not parse {}", source.label))?;

    let report = big_tides_report(&store, table, config, today).context("could not build the summary window")?;

    // Development mode: ASCII output for testing
    if stdout {
        draw_ascii_days(&report.days);
        return Ok(());
    }

    write_json(&config.report.output_path, &report)
        .with_context(|| format!("writing {}", config.report.output_path.display()))?;
    info!(
        days = report.days.len(),
        path = %config.report.output_path.display(),
        "big tides summary written"
    );
    Ok(())
}

fn run_next(rt: &tokio::runtime::Runtime, config: &Config, stdout: bool) -> anyhow::Result<()> {
    let now = Local::now().fixed_offset();
    let api_key = env::var(WORLDTIDES_KEY_VAR).ok();

    let report = rt
        .block_on(next_turn_report(config, now, api_key.as_deref()))
        .context("could not compute next turns")?;

    if stdout {
        draw_ascii_next(&[("wp", report.wp.as_ref()), ("ppb", report.ppb.as_ref())]);
        return Ok(());
    }

    write_json(&config.next.output_path, &report)
        .with_context(|| format!("writing {}", config.next.output_path.display()))?;
    info!(path = %config.next.output_path.display(), "next turn summary written");
    Ok(())
}

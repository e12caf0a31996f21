use std::path::PathBuf;

use anyhow::{Context, Result};
use arrow::util::pretty::pretty_format_batches;
use clap::Parser;

use attendance_report::config::ReportConfig;
use attendance_report::data::export::count_table_batch;
use attendance_report::data::loader::load_files;
use attendance_report::pipeline::{run_report, Breakdown};

/// Print the per-date requirement breakdowns for participation files.
#[derive(Parser, Debug)]
#[command(name = "attendance-report", version, about = "Participation requirement report")]
struct Cli {
    /// Input files (.csv, .json, .parquet), e.g. one per reporting year
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// JSON report configuration (filters, requirements, normalization)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the breakdowns as JSON instead of tables
    #[arg(long)]
    json: bool,
}

fn print_breakdown(breakdown: &Breakdown) -> Result<()> {
    let table = breakdown.table.sorted_by_group();
    let batch = count_table_batch(&table)?;
    println!("{}", breakdown.column);
    println!("{}", pretty_format_batches(&[batch]).context("formatting table")?);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Cli::parse();
    let config = match &args.config {
        Some(path) => ReportConfig::from_path(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => ReportConfig::default(),
    };

    let raw = load_files(&args.files)?;
    let report = run_report(&raw, &config).context("running report")?;

    if report.filtered.is_empty() {
        log::warn!("No rows left after filtering");
    } else {
        let regions: Vec<String> = report
            .filtered
            .unique_values(&config.normalize.region_column)
            .into_iter()
            .map(|v| v.to_string())
            .collect();
        log::info!("Regions in report: {}", regions.join(", "));
    }

    if args.json {
        let json = serde_json::to_string_pretty(&report.breakdowns)?;
        println!("{json}");
    } else {
        for breakdown in &report.breakdowns {
            print_breakdown(breakdown)?;
        }
    }
    Ok(())
}

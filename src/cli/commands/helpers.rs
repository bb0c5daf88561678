//! Shared helpers for CLI commands.

use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{Config, Settings};
use crate::export::{Accumulator, ExportError, OutputPlan, Persister};
use crate::scrapers::RunReport;

use crate::cli::icons::{dim_arrow, error, success, warn};

/// Output overrides given on the command line.
#[derive(Debug, Clone, Default)]
pub struct OutputArgs {
    pub out_dir: Option<PathBuf>,
    pub stem: Option<String>,
}

/// Truncate a string for display, adding "..." if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

pub fn page_progress(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
            .unwrap()
            .progress_chars("█▓░"),
    );
    pb
}

/// Empty result table, seeded with the record columns when configured.
pub fn new_table(config: &Config) -> Accumulator {
    if config.output.seed_columns {
        Accumulator::seeded()
    } else {
        Accumulator::new()
    }
}

pub fn output_plan(
    settings: &Settings,
    config: &Config,
    args: OutputArgs,
    start: usize,
    end: usize,
) -> OutputPlan {
    OutputPlan {
        dir: args.out_dir.unwrap_or_else(|| settings.output_dir.clone()),
        stem: args.stem.unwrap_or_else(|| settings.output_stem.clone()),
        start,
        end,
        csv_bom: config.output.csv_bom,
    }
}

pub fn print_report(report: &RunReport) {
    println!(
        "{} {}/{} pages extracted, {} rows",
        if report.failed.is_empty() { success() } else { warn() },
        report.succeeded,
        report.attempted,
        report.rows
    );
    if report.part_prices > 0 {
        println!("  {} {} prices from part pages", dim_arrow(), report.part_prices);
    }
    for (url, reason) in &report.failed {
        println!("  {} {}: {}", error(), truncate(url, 80), reason);
    }
}

/// Persist the table. An empty table is reported, not treated as an error.
pub fn write_output(table: &Accumulator, plan: &OutputPlan) -> anyhow::Result<()> {
    match Persister::write(table, plan) {
        Ok(written) => {
            println!(
                "{} Saved {} rows x {} columns",
                success(),
                written.rows,
                written.columns
            );
            println!("  {} {}", dim_arrow(), written.csv.display());
            println!("  {} {}", dim_arrow(), written.xlsx.display());
            Ok(())
        }
        Err(ExportError::Empty) => {
            println!("{} No rows extracted; nothing written", warn());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod config_cmd;
mod extract;
mod helpers;
mod listing;
mod scrape;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::load_settings;
use crate::input::RowRange;
use crate::models::ExtractionMode;

#[derive(Parser)]
#[command(name = "partscout")]
#[command(about = "Bearing catalog scraper: product pages in, part tables out")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

fn parse_mode(value: &str) -> Result<ExtractionMode, String> {
    ExtractionMode::from_str(value)
        .ok_or_else(|| format!("unknown mode '{}' (expected auto, structured or context)", value))
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the product pages listed in a CSV or XLSX file
    Scrape {
        /// Input file with a column of product URLs
        input: PathBuf,
        /// URL column name (default: first header containing "url")
        #[arg(long)]
        column: Option<String>,
        /// First input row to process (0-based)
        #[arg(long, default_value = "0")]
        start: usize,
        /// Stop before this input row
        #[arg(long)]
        end: Option<usize>,
        /// Output directory (overrides config)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
        /// Output file stem (overrides config)
        #[arg(long)]
        stem: Option<String>,
        /// Extraction mode: auto, structured or context
        #[arg(long, value_parser = parse_mode)]
        mode: Option<ExtractionMode>,
        /// Show the browser window
        #[arg(long)]
        headed: bool,
        /// Start a fresh browser for every page
        #[arg(long)]
        session_per_url: bool,
        /// Look up every part's own page for its price
        #[arg(long)]
        part_prices: bool,
    },

    /// Run extraction on saved page snapshots
    Extract {
        /// Saved HTML files
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Page URL to record for a single file (default: the file path)
        #[arg(long)]
        url: Option<String>,
        /// Output directory (overrides config)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
        /// Output file stem (overrides config)
        #[arg(long)]
        stem: Option<String>,
        /// Extraction mode: auto, structured or context
        #[arg(long, value_parser = parse_mode)]
        mode: Option<ExtractionMode>,
    },

    /// Collect same-day products from saved category listing pages
    Listing {
        /// Directory of saved listing pages (.html/.htm)
        dir: PathBuf,
        /// Output CSV (default: <output dir>/same_day_products.csv)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Process at most this many files
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Print the path of the config file in use
    Path,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (settings, config) = load_settings(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Scrape {
            input,
            column,
            start,
            end,
            out_dir,
            stem,
            mode,
            headed,
            session_per_url,
            part_prices,
        } => {
            let args = scrape::ScrapeArgs {
                input,
                column,
                range: RowRange::new(start, end),
                output: helpers::OutputArgs { out_dir, stem },
                mode,
                headed,
                session_per_url,
                part_prices,
            };
            scrape::cmd_scrape(&settings, config, args).await
        }
        Commands::Extract {
            files,
            url,
            out_dir,
            stem,
            mode,
        } => {
            let output = helpers::OutputArgs { out_dir, stem };
            extract::cmd_extract(&settings, config, &files, url, output, mode).await
        }
        Commands::Listing { dir, out, limit } => {
            listing::cmd_listing(&settings, &config, &dir, out, limit).await
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => config_cmd::cmd_config_show(&config).await,
            ConfigCommands::Path => config_cmd::cmd_config_path(&config).await,
        },
    }
}

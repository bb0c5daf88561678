//! Scrape command: live browser run over an input URL list.

use std::path::PathBuf;

use console::style;

use crate::config::{Config, Settings, DEFAULT_PART_PARAM};
use crate::input::{read_urls, RowRange};
use crate::models::ExtractionMode;
use crate::scrapers::{BrowserSession, Pipeline, RunOptions};

use crate::cli::icons::{info, warn};
use super::helpers::{new_table, output_plan, page_progress, print_report, write_output, OutputArgs};

pub struct ScrapeArgs {
    pub input: PathBuf,
    pub column: Option<String>,
    pub range: RowRange,
    pub output: OutputArgs,
    pub mode: Option<ExtractionMode>,
    pub headed: bool,
    pub session_per_url: bool,
    pub part_prices: bool,
}

pub async fn cmd_scrape(settings: &Settings, mut config: Config, args: ScrapeArgs) -> anyhow::Result<()> {
    if args.headed {
        config.browser.headless = false;
    }
    if args.session_per_url {
        config.run.session_per_url = true;
    }
    if args.part_prices && config.run.part_price_param.is_none() {
        config.run.part_price_param = Some(DEFAULT_PART_PARAM.to_string());
    }
    if let Some(mode) = args.mode {
        config.run.mode = mode;
    }

    let column = args.column.as_deref().or(config.run.url_column.as_deref());
    let urls = read_urls(&args.input, column, &config.run.base_url, config.run.dedupe_urls)?;
    let (selected, start, end) = args.range.slice(&urls);
    if selected.is_empty() {
        println!(
            "{} No URLs to process in {} (rows {}..{} of {})",
            warn(),
            args.input.display(),
            start,
            end,
            urls.len()
        );
        return Ok(());
    }

    println!(
        "{} Scraping {} product pages (rows {}..{} of {}, mode {})",
        info(),
        style(selected.len()).cyan(),
        start,
        end,
        urls.len(),
        config.run.mode
    );

    let pipeline = Pipeline::from_config(&config)?;
    let options = RunOptions::from(&config.run);
    let mut session = BrowserSession::launch(config.browser.clone(), config.page.clone()).await?;

    let pb = page_progress(selected.len());
    let mut table = new_table(&config);
    let report = pipeline
        .run(&mut session, selected, &options, &mut table, Some(&pb))
        .await;
    pb.finish_and_clear();
    let report = report?;

    print_report(&report);
    let plan = output_plan(settings, &config, args.output, start, end);
    write_output(&table, &plan)
}

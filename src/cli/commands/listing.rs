//! Listing command: same-day products from saved listing pages.

use std::path::{Path, PathBuf};

use crate::config::{Config, Settings};
use crate::listing::{listing_files, write_listing, ListingCollector};

use crate::cli::icons::{success, warn};

const DEFAULT_LISTING_FILE: &str = "same_day_products.csv";

pub async fn cmd_listing(
    settings: &Settings,
    config: &Config,
    dir: &Path,
    out: Option<PathBuf>,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("Not a directory: {}", dir.display());
    }
    let files = listing_files(dir, limit)?;
    if files.is_empty() {
        println!("{} No HTML files found in {}", warn(), dir.display());
    }

    let collector = ListingCollector::new(&config.listing, &config.run.base_url);
    let items = collector.collect(&files);

    let out = out.unwrap_or_else(|| settings.output_dir.join(DEFAULT_LISTING_FILE));
    write_listing(&items, &out)?;
    println!(
        "{} Saved {} same-day products from {} files to {}",
        success(),
        items.len(),
        files.len(),
        out.display()
    );
    Ok(())
}

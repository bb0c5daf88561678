//! Extract command: the pipeline over saved page snapshots.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::{Config, Settings};
use crate::models::ExtractionMode;
use crate::scrapers::{Pipeline, RunOptions, SnapshotSource};

use crate::cli::icons::info;
use super::helpers::{new_table, output_plan, page_progress, print_report, write_output, OutputArgs};

pub async fn cmd_extract(
    settings: &Settings,
    mut config: Config,
    files: &[PathBuf],
    url: Option<String>,
    output: OutputArgs,
    mode: Option<ExtractionMode>,
) -> anyhow::Result<()> {
    if let Some(mode) = mode {
        config.run.mode = mode;
    }

    let (source, urls) = match url {
        Some(url) => {
            let [file] = files else {
                anyhow::bail!("--url applies to a single file, got {}", files.len());
            };
            let mut source = SnapshotSource::new();
            source.insert(url.clone(), file.clone());
            (source, vec![url])
        }
        None => SnapshotSource::from_files(files),
    };
    let mut source = source;

    println!("{} Extracting {} saved pages", info(), urls.len());

    let pipeline = Pipeline::from_config(&config)?;
    let options = RunOptions {
        retries: 0,
        retry_delay: Duration::ZERO,
        inter_page_delay: Duration::ZERO,
        session_per_url: false,
    };

    let pb = page_progress(urls.len());
    let mut table = new_table(&config);
    let report = pipeline
        .run(&mut source, &urls, &options, &mut table, Some(&pb))
        .await;
    pb.finish_and_clear();
    let report = report?;

    print_report(&report);
    let plan = output_plan(settings, &config, output, 0, urls.len());
    write_output(&table, &plan)
}

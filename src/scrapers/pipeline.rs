//! Page pipeline and run loop.
//!
//! [`Pipeline::extract_page`] turns one rendered snapshot into part records:
//! the part-number table first (merged with the spec table next to it), then
//! the text around part-number tokens when no table yields anything.
//! [`Pipeline::run`] drives a [`PageSource`] over a list of URLs and appends
//! every page to an [`Accumulator`].

use std::sync::LazyLock;
use std::time::Duration;

use indicatif::ProgressBar;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use crate::config::{Config, RunConfig};
use crate::error::Result;
use crate::export::Accumulator;
use crate::models::{ChainTrace, ExtractionMode, Field, PageExtraction, PartRecord};
use crate::utils::{visible_text, with_query_param};

use super::config::SiteProfile;
use super::extract::{
    json_ld_price, merge_by_row, option_values, product_specs, ContextExtractor, FieldMapping,
    Grid, PartNumberFilter, SpecLocators, TableLayout, CATALOG_IMAGE_COLUMN, DESCRIPTION_COLUMN,
    DRAWING_IMAGE_COLUMN, PRODUCT_IMAGE_COLUMN,
};
use super::locator::{LocatorChain, LocatorSpec};
use super::source::PageSource;

static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());
static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());

/// Compiled chains and extractors for one site profile.
pub struct Pipeline {
    ready: LocatorChain,
    part_table: LocatorChain,
    part_rows: LocatorChain,
    spec_table: LocatorChain,
    spec_rows: LocatorChain,
    cells: LocatorChain,
    any_rows: LocatorChain,
    dropdown: LocatorChain,
    product_name: LocatorChain,
    spec_labels: LocatorChain,
    spec_values: LocatorChain,
    attributes: Vec<(&'static str, LocatorChain)>,
    positional: Vec<Option<Field>>,
    mapping: FieldMapping,
    filter: PartNumberFilter,
    context: ContextExtractor,
    mode: ExtractionMode,
    part_param: Option<String>,
}

impl Pipeline {
    pub fn new(site: &SiteProfile, mapping: FieldMapping, run: &RunConfig) -> Result<Self> {
        let (positional, unknown) = site.positional_fields();
        for name in unknown {
            warn!("Unknown positional column '{}' will be skipped", name);
        }

        Ok(Self {
            ready: LocatorChain::from_specs("ready", &site.ready),
            part_table: LocatorChain::from_specs("part_table", &site.part_table),
            part_rows: LocatorChain::from_specs("part_rows", &site.part_rows),
            spec_table: LocatorChain::from_specs("spec_table", &site.spec_table),
            spec_rows: LocatorChain::from_specs("spec_rows", &site.spec_rows),
            cells: LocatorChain::from_specs("cells", &site.cells),
            any_rows: LocatorChain::from_specs("table_rows", &[LocatorSpec::tag("tr")]),
            dropdown: LocatorChain::from_specs("dropdown_options", &site.dropdown_options),
            product_name: LocatorChain::from_specs("product_name", &site.product_name),
            spec_labels: LocatorChain::from_specs("spec_labels", &site.spec_labels),
            spec_values: LocatorChain::from_specs("spec_values", &site.spec_values),
            attributes: vec![
                (
                    PRODUCT_IMAGE_COLUMN,
                    LocatorChain::from_specs("product_image", &site.product_image),
                ),
                (
                    DRAWING_IMAGE_COLUMN,
                    LocatorChain::from_specs("drawing_image", &site.drawing_image),
                ),
                (
                    CATALOG_IMAGE_COLUMN,
                    LocatorChain::from_specs("catalog_image", &site.catalog_image),
                ),
                (
                    DESCRIPTION_COLUMN,
                    LocatorChain::from_specs("description", &site.description),
                ),
            ],
            positional,
            mapping,
            filter: PartNumberFilter::new(&run.part_numbers),
            context: ContextExtractor::new(&run.context)?,
            mode: run.mode,
            part_param: run.part_price_param.clone(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.site, config.fields.clone(), &config.run)
    }

    /// Use `mode` instead of the configured one.
    pub fn with_mode(mut self, mode: ExtractionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Look up each part's own page, selected by query parameter `param`,
    /// for its price.
    pub fn with_part_prices(mut self, param: &str) -> Self {
        self.part_param = Some(param.to_string());
        self
    }

    /// Chain that resolves once a product page has rendered its part data.
    pub fn ready_chain(&self) -> &LocatorChain {
        &self.ready
    }

    /// Extract part records and product specs from one HTML snapshot.
    pub fn extract_page(&self, url: &str, html: &str) -> PageExtraction {
        let doc = Html::parse_document(html);
        let root = doc.root_element();
        let mut page = PageExtraction::new(url);

        if self.mode != ExtractionMode::Context {
            let records = self.structured(root, url, &mut page.trace);
            if !records.is_empty() {
                page.mode = Some(ExtractionMode::Structured);
                page.records = records;
            }
        }

        if page.records.is_empty() && self.mode != ExtractionMode::Structured {
            let records = self.from_context(root, url, &mut page.trace);
            if !records.is_empty() {
                page.mode = Some(ExtractionMode::Context);
                page.records = records;
            }
        }

        if self.context.json_ld_price()
            && page.records.iter().any(|r| r.get(Field::Price).is_none())
        {
            if let Some(price) = json_ld_price(html) {
                debug!("Using JSON-LD price {} on {}", price, url);
                for record in &mut page.records {
                    record.set_if_empty(Field::Price, price.as_str());
                }
            }
        }

        let locators = SpecLocators {
            name: &self.product_name,
            attributes: &self.attributes,
            labels: &self.spec_labels,
            values: &self.spec_values,
        };
        page.specs = product_specs(root, url, &locators, &mut page.trace);

        page.finalize();
        if page.records.is_empty() {
            warn!("No part records found on {}", url);
        } else {
            info!(
                "{} part records from {} ({})",
                page.records.len(),
                url,
                page.mode.map(|m| m.as_str()).unwrap_or("none")
            );
        }
        page
    }

    /// Records from the first part table that yields part numbers, with the
    /// spec table's rows merged in by position.
    fn structured(&self, root: ElementRef<'_>, url: &str, trace: &mut Vec<ChainTrace>) -> Vec<PartRecord> {
        let tables = self.part_table.locate(root);
        trace.push(tables.trace(self.part_table.name()));

        let part_layout = TableLayout {
            rows: &self.part_rows,
            cells: &self.cells,
            positional: &[],
        };

        for table in &tables.elements {
            let grid = Grid::read(*table, &part_layout, &self.mapping);
            trace.extend(grid.trace.iter().cloned());
            let mut records = grid.records(&self.mapping, &[], &self.filter, url);
            if !records.iter().any(|r| r.part_number.is_some()) {
                continue;
            }

            let spec_tables = self.spec_table.locate(root);
            trace.push(spec_tables.trace(self.spec_table.name()));
            if let Some(spec) = spec_tables.first().filter(|s| s.id() != table.id()) {
                let spec_layout = TableLayout {
                    rows: &self.spec_rows,
                    cells: &self.cells,
                    positional: &self.positional,
                };
                let spec_grid = Grid::read(spec, &spec_layout, &self.mapping);
                trace.extend(spec_grid.trace.iter().cloned());
                let specs = spec_grid.records(&self.mapping, &self.positional, &self.filter, url);
                merge_by_row(&mut records, &specs);
            }

            records.retain(|r| r.part_number.is_some());
            return records;
        }
        Vec::new()
    }

    /// Records from the text around each part-number token, with dimensions
    /// taken from any table row that holds the token.
    fn from_context(&self, root: ElementRef<'_>, url: &str, trace: &mut Vec<ChainTrace>) -> Vec<PartRecord> {
        let options = self.dropdown.locate(root);
        trace.push(options.trace(self.dropdown.name()));

        let body = root.select(&BODY).next().unwrap_or(root);
        let text = visible_text(body);

        let mut tokens = option_values(&options.elements, &self.filter);
        if tokens.is_empty() {
            tokens = self.filter.find_in(&text);
        }
        if tokens.is_empty() {
            debug!("No part-number tokens on {}", url);
            return Vec::new();
        }
        debug!("{} part-number tokens on {}", tokens.len(), url);

        let layout = TableLayout {
            rows: &self.any_rows,
            cells: &self.cells,
            positional: &[],
        };
        let grids: Vec<Grid> = root
            .select(&TABLE)
            .map(|table| Grid::read(table, &layout, &self.mapping))
            .filter(|grid| !grid.headers.is_empty())
            .collect();

        let mut records = self.context.extract(&text, &tokens, url);
        for record in &mut records {
            let Some(pn) = record.part_number.clone() else {
                continue;
            };
            for grid in &grids {
                if let Some(row) = grid.record_for(&pn, &self.mapping, &[], &self.filter, url) {
                    record.merge_missing(&row);
                }
            }
        }
        records
    }

    /// Visit `urls` in order, appending every page's rows to `table`.
    ///
    /// Page failures are retried, then logged and skipped; a fatal error
    /// (session start, configuration) stops the run. The source is closed
    /// on every path.
    pub async fn run<S: PageSource + ?Sized>(
        &self,
        source: &mut S,
        urls: &[String],
        options: &RunOptions,
        table: &mut Accumulator,
        progress: Option<&ProgressBar>,
    ) -> Result<RunReport> {
        let result = self.visit_all(source, urls, options, table, progress).await;
        source.close().await;
        result
    }

    async fn visit_all<S: PageSource + ?Sized>(
        &self,
        source: &mut S,
        urls: &[String],
        options: &RunOptions,
        table: &mut Accumulator,
        progress: Option<&ProgressBar>,
    ) -> Result<RunReport> {
        let mut report = RunReport::default();

        for (i, url) in urls.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(options.inter_page_delay).await;
                if options.session_per_url {
                    if let Err(e) = source.reset().await {
                        if e.is_fatal() {
                            return Err(e);
                        }
                        warn!("Session reset before {} failed: {}", url, e);
                    }
                }
            }

            if let Some(pb) = progress {
                pb.set_message(url.clone());
            }
            info!("Page {}/{}: {}", i + 1, urls.len(), url);
            report.attempted += 1;

            match self.fetch_with_retries(source, url, options).await {
                Ok(html) => {
                    let mut page = self.extract_page(url, &html);
                    report.part_prices += self
                        .fill_part_prices(source, &html, &mut page, options)
                        .await?;
                    let rows = table.append_page(&page);
                    report.succeeded += 1;
                    report.rows += rows;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Skipping {}: {}", url, e);
                    report.failed.push((url.clone(), e.to_string()));
                }
            }

            if let Some(pb) = progress {
                pb.inc(1);
            }
        }

        Ok(report)
    }

    /// Fetch `<page url>?<param>=<part number>` for every record whose price
    /// is missing or only the page-wide JSON-LD range, and take that page's
    /// JSON-LD price. Returns how many prices were set.
    async fn fill_part_prices<S: PageSource + ?Sized>(
        &self,
        source: &mut S,
        html: &str,
        page: &mut PageExtraction,
        options: &RunOptions,
    ) -> Result<usize> {
        let Some(param) = self.part_param.as_deref() else {
            return Ok(0);
        };
        let page_price = json_ld_price(html);
        let mut filled = 0;

        for record in &mut page.records {
            let Some(pn) = record.part_number.clone() else {
                continue;
            };
            if record.price.is_some() && record.price != page_price {
                continue;
            }

            let part_url = with_query_param(&page.url, param, &pn);
            tokio::time::sleep(options.inter_page_delay).await;
            match self.fetch_with_retries(source, &part_url, options).await {
                Ok(part_html) => match json_ld_price(&part_html) {
                    Some(price) => {
                        debug!("Price {} for {} from {}", price, pn, part_url);
                        record.price = Some(price);
                        filled += 1;
                    }
                    None => debug!("No JSON-LD price on {}", part_url),
                },
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!("No part price for {}: {}", pn, e),
            }
        }
        Ok(filled)
    }

    async fn fetch_with_retries<S: PageSource + ?Sized>(
        &self,
        source: &mut S,
        url: &str,
        options: &RunOptions,
    ) -> Result<String> {
        let mut attempt = 0;
        loop {
            match source.fetch(url, &self.ready).await {
                Ok(html) => return Ok(html),
                Err(e) if e.is_fatal() || attempt >= options.retries => return Err(e),
                Err(e) => {
                    attempt += 1;
                    warn!(
                        "Attempt {}/{} for {} failed: {}",
                        attempt,
                        options.retries + 1,
                        url,
                        e
                    );
                    tokio::time::sleep(options.retry_delay).await;
                }
            }
        }
    }
}

/// Run loop timing and retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Extra attempts per URL after the first failure.
    pub retries: u32,
    pub retry_delay: Duration,
    pub inter_page_delay: Duration,
    pub session_per_url: bool,
}

impl From<&RunConfig> for RunOptions {
    fn from(run: &RunConfig) -> Self {
        Self {
            retries: run.retries,
            retry_delay: Duration::from_millis(run.retry_delay_ms),
            inter_page_delay: Duration::from_millis(run.inter_page_delay_ms),
            session_per_url: run.session_per_url,
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from(&RunConfig::default())
    }
}

/// Outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub attempted: usize,
    pub succeeded: usize,
    /// URL and reason of every page skipped after its retries.
    pub failed: Vec<(String, String)>,
    pub rows: usize,
    /// Prices taken from per-part pages.
    pub part_prices: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::source::SnapshotSource;

    fn pipeline() -> Pipeline {
        Pipeline::from_config(&Config::default()).unwrap()
    }

    const TABLE_PAGE: &str = r#"
        <html><body>
          <h1>Deep groove ball bearing</h1>
          <table class="PartNumberColumn_tableBase__DK2Le">
            <thead><tr><th>Part Number</th><th>Unit Price</th><th>Days to Ship</th></tr></thead>
            <tbody>
              <tr class="PartNumberColumn_dataRow__DK2Le"><td>6200ZZ</td><td>51,000 VND</td><td>Same day</td></tr>
              <tr class="PartNumberColumn_dataRow__DK2Le"><td>6201ZZ</td><td>56,000 VND</td><td>4 days</td></tr>
            </tbody>
          </table>
          <table class="PartNumberSpecColumns_table__x1">
            <tbody>
              <tr class="PartNumberSpecColumns_dataRow__x1"><td>1 piece</td><td>-</td><td>10</td><td>30</td><td>9</td><td>5.1</td><td>2.39</td></tr>
              <tr class="PartNumberSpecColumns_dataRow__x1"><td>1 piece</td><td>-</td><td>12</td><td>32</td><td>10</td><td>6.8</td><td>3.05</td></tr>
            </tbody>
          </table>
        </body></html>
    "#;

    #[test]
    fn table_page_merges_spec_rows() {
        let page = pipeline().extract_page("https://x/p", TABLE_PAGE);
        assert_eq!(page.mode, Some(ExtractionMode::Structured));
        assert_eq!(page.records.len(), 2);

        let first = &page.records[0];
        assert_eq!(first.get(Field::PartNumber), Some("6200ZZ"));
        assert_eq!(first.get(Field::Price), Some("51,000 VND"));
        assert_eq!(first.get(Field::DaysToShip), Some("Same day"));
        assert_eq!(first.get(Field::MinimumOrderQty), Some("1 piece"));
        assert_eq!(first.get(Field::InnerDiaD), Some("10"));
        assert_eq!(first.get(Field::OuterDiaD), Some("30"));
        assert_eq!(first.get(Field::BasicLoadRatingCor), Some("2.39"));
        assert_eq!(page.records[1].get(Field::WidthB), Some("10"));
        assert_eq!(
            page.specs.first(),
            Some(&("product_name".to_string(), "Deep groove ball bearing".to_string()))
        );
    }

    #[test]
    fn structured_mode_does_not_fall_back() {
        let html = "<html><body><p>6200ZZ 51,000 VND same day</p></body></html>";
        let page = pipeline()
            .with_mode(ExtractionMode::Structured)
            .extract_page("https://x/p", html);
        assert!(page.records.is_empty());

        let page = pipeline().extract_page("https://x/p", html);
        assert_eq!(page.mode, Some(ExtractionMode::Context));
        assert_eq!(page.records[0].get(Field::Price), Some("51,000 VND"));
    }

    #[test]
    fn extraction_is_repeatable() {
        let p = pipeline();
        let a = p.extract_page("https://x/p", TABLE_PAGE);
        let b = p.extract_page("https://x/p", TABLE_PAGE);
        assert_eq!(a.records, b.records);
        assert_eq!(a.specs, b.specs);
    }

    #[tokio::test]
    async fn run_skips_pages_that_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.html");
        std::fs::write(&path, TABLE_PAGE).unwrap();

        let mut source = SnapshotSource::new();
        source.insert("https://x/p", &path);
        let urls = vec!["https://x/missing".to_string(), "https://x/p".to_string()];
        let options = RunOptions {
            retries: 1,
            retry_delay: Duration::ZERO,
            inter_page_delay: Duration::ZERO,
            session_per_url: true,
        };

        let mut table = Accumulator::seeded();
        let report = pipeline()
            .run(&mut source, &urls, &options, &mut table, None)
            .await
            .unwrap();

        assert_eq!(report.attempted, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "https://x/missing");
        assert_eq!(report.rows, 2);
        assert_eq!(table.len(), 2);
    }
}

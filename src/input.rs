//! URL lists from CSV or spreadsheet files.

use std::collections::HashSet;
use std::path::Path;

use calamine::{open_workbook_auto, Reader};
use tracing::{debug, warn};

use crate::error::{Result, ScrapeError};
use crate::utils::{clean_text, resolve_url};

/// A header row and the data rows under it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl InputTable {
    /// Read a CSV file, or the first sheet of an XLSX/XLS/ODS workbook.
    pub fn read(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Self::read_workbook(path),
            _ => Self::read_csv(path),
        }
    }

    fn read_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        let headers = reader
            .headers()?
            .iter()
            .map(|h| clean_text(h.trim_start_matches('\u{feff}')))
            .collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(|c| c.trim().to_string()).collect());
        }
        Ok(Self { headers, rows })
    }

    fn read_workbook(path: &Path) -> Result<Self> {
        let mut workbook = open_workbook_auto(path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ScrapeError::Input(format!("{} has no worksheets", path.display())))??;

        let mut lines = range
            .rows()
            .map(|row| row.iter().map(|c| c.to_string().trim().to_string()).collect::<Vec<_>>());
        let headers = lines
            .next()
            .map(|h| h.iter().map(|c| clean_text(c)).collect())
            .unwrap_or_default();
        Ok(Self {
            headers,
            rows: lines.collect(),
        })
    }

    /// Index of the URL column: `name` if given (exact, then
    /// case-insensitive), else the first header containing "url".
    pub fn url_column(&self, name: Option<&str>) -> Result<usize> {
        let found = match name {
            Some(name) => self
                .headers
                .iter()
                .position(|h| h == name)
                .or_else(|| self.headers.iter().position(|h| h.eq_ignore_ascii_case(name))),
            None => self
                .headers
                .iter()
                .position(|h| h.to_lowercase().contains("url")),
        };
        found.ok_or_else(|| {
            ScrapeError::Input(format!(
                "URL column {} not found; available columns: {}",
                name.map(|n| format!("'{}'", n)).unwrap_or_else(|| "(any containing 'url')".to_string()),
                self.headers.join(", ")
            ))
        })
    }

    /// Non-empty values of column `index`, resolved against `base_url`.
    /// With `dedupe`, only the first occurrence of a URL is kept.
    pub fn urls(&self, index: usize, base_url: &str, dedupe: bool) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for row in &self.rows {
            let Some(cell) = row.get(index).map(|c| c.trim()) else {
                continue;
            };
            if cell.is_empty() {
                continue;
            }
            let url = resolve_url(base_url, cell);
            if dedupe && !seen.insert(url.clone()) {
                debug!("Dropping duplicate URL {}", url);
                continue;
            }
            out.push(url);
        }
        out
    }
}

/// Read the URL list of an input file.
pub fn read_urls(path: &Path, column: Option<&str>, base_url: &str, dedupe: bool) -> Result<Vec<String>> {
    let table = InputTable::read(path)?;
    let index = table.url_column(column)?;
    let urls = table.urls(index, base_url, dedupe);
    debug!(
        "{} URLs in column '{}' of {}",
        urls.len(),
        table.headers[index],
        path.display()
    );
    Ok(urls)
}

/// Half-open slice `start..end` of the input list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowRange {
    pub start: usize,
    /// `None` runs to the end of the list.
    pub end: Option<usize>,
}

impl RowRange {
    pub fn new(start: usize, end: Option<usize>) -> Self {
        Self { start, end }
    }

    /// Bounds clamped to a list of `len` items. An empty or inverted range
    /// yields `(start, start)` style empty bounds.
    pub fn bounds(&self, len: usize) -> (usize, usize) {
        let end = self.end.unwrap_or(len).min(len);
        let start = self.start.min(end);
        (start, end)
    }

    /// The selected items, with the clamped bounds.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> (&'a [T], usize, usize) {
        if let Some(end) = self.end {
            if self.start >= end {
                warn!("Empty row range {}..{}; nothing to process", self.start, end);
            }
        }
        let (start, end) = self.bounds(items.len());
        (&items[start..end], start, end)
    }
}

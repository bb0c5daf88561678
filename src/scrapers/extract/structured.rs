//! Header-mapped table extraction.
//!
//! A located table is first read into a plain grid of cell texts (header row
//! plus data rows). Field assignment happens on the grid: by header keywords
//! when the table has a header row, by configured column positions when it
//! does not.

use std::sync::LazyLock;

use scraper::{ElementRef, Selector};
use tracing::debug;

use crate::models::{ChainTrace, Field, PartRecord};
use crate::scrapers::locator::LocatorChain;
use crate::utils::element_text;

use super::fields::{FieldMapping, ValueCheck};
use super::part_number::PartNumberFilter;

static THEAD_ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("thead tr").unwrap());
static ANY_ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());

/// How rows and cells are found inside a located table.
#[derive(Debug, Clone, Copy)]
pub struct TableLayout<'a> {
    pub rows: &'a LocatorChain,
    pub cells: &'a LocatorChain,
    /// Field per column for tables without a header row. `None` skips a column.
    pub positional: &'a [Option<Field>],
}

/// Cell texts of a table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub trace: Vec<ChainTrace>,
}

impl Grid {
    /// Read `table` into a grid.
    pub fn read(table: ElementRef<'_>, layout: &TableLayout<'_>, mapping: &FieldMapping) -> Self {
        let mut trace = Vec::new();
        let header_row = find_header_row(table, layout, mapping);
        let headers = header_row
            .map(|row| cell_texts(row, layout.cells))
            .unwrap_or_default();

        let located = layout.rows.locate(table);
        trace.push(located.trace(layout.rows.name()));
        let header_id = header_row.map(|r| r.id());

        let rows = located
            .elements
            .iter()
            .filter(|row| Some(row.id()) != header_id)
            .map(|row| cell_texts(*row, layout.cells))
            .filter(|cells| cells.iter().any(|c| !c.is_empty()))
            .collect::<Vec<_>>();

        debug!(headers = headers.len(), rows = rows.len(), "read table grid");
        Self {
            headers,
            rows,
            trace,
        }
    }

    /// Column-to-field assignment for this grid.
    fn columns(&self, mapping: &FieldMapping, positional: &[Option<Field>]) -> Vec<Option<(Field, ValueCheck)>> {
        if self.headers.is_empty() {
            positional
                .iter()
                .map(|f| f.map(|f| (f, mapping.check_for(f))))
                .collect()
        } else {
            self.headers
                .iter()
                .map(|h| mapping.field_for(h).map(|r| (r.field, r.check)))
                .collect()
        }
    }

    /// One record per data row, in row order. Records may lack a part
    /// number (specification rows are matched to part rows by position).
    pub fn records(
        &self,
        mapping: &FieldMapping,
        positional: &[Option<Field>],
        filter: &PartNumberFilter,
        page_url: &str,
    ) -> Vec<PartRecord> {
        let columns = self.columns(mapping, positional);
        self.rows
            .iter()
            .map(|cells| row_record(cells, &columns, filter, page_url))
            .collect()
    }

    /// The mapped record of the first row with a cell equal to `part_number`.
    pub fn record_for(
        &self,
        part_number: &str,
        mapping: &FieldMapping,
        positional: &[Option<Field>],
        filter: &PartNumberFilter,
        page_url: &str,
    ) -> Option<PartRecord> {
        let columns = self.columns(mapping, positional);
        self.rows
            .iter()
            .find(|cells| cells.iter().any(|c| c == part_number))
            .map(|cells| row_record(cells, &columns, filter, page_url))
    }
}

fn row_record(
    cells: &[String],
    columns: &[Option<(Field, ValueCheck)>],
    filter: &PartNumberFilter,
    page_url: &str,
) -> PartRecord {
    let mut record = PartRecord::new(page_url);
    for (cell, column) in cells.iter().zip(columns) {
        let Some((field, check)) = column else {
            continue;
        };
        if let Some(value) = check.accept(cell) {
            record.set_if_empty(*field, value);
        }
    }
    if record.part_number.is_none() && !columns.iter().flatten().any(|(f, _)| *f == Field::PartNumber) {
        if let Some(pn) = cells.iter().take(3).find(|c| filter.is_plausible(c)) {
            record.set_if_empty(Field::PartNumber, pn.as_str());
        }
    }
    record
}

fn cell_texts(row: ElementRef<'_>, cells: &LocatorChain) -> Vec<String> {
    cells.locate(row).elements.into_iter().map(element_text).collect()
}

/// `thead` row, else the first all-`th` row, else the first row that reads
/// like a header.
fn find_header_row<'a>(
    table: ElementRef<'a>,
    layout: &TableLayout<'_>,
    mapping: &FieldMapping,
) -> Option<ElementRef<'a>> {
    if let Some(row) = table.select(&THEAD_ROW).next() {
        return Some(row);
    }
    let first = table.select(&ANY_ROW).next()?;
    let cells: Vec<ElementRef<'_>> = layout.cells.locate(first).elements;
    if !cells.is_empty() && cells.iter().all(|c| c.value().name() == "th") {
        return Some(first);
    }
    if mapping.looks_like_header(&element_text(first)) {
        return Some(first);
    }
    None
}

/// Zip specification rows onto part rows by index, filling only empty fields.
pub fn merge_by_row(parts: &mut [PartRecord], specs: &[PartRecord]) {
    for (part, spec) in parts.iter_mut().zip(specs) {
        part.merge_missing(spec);
    }
}

//! Wide result table that tolerates per-page schema drift.
//!
//! Pages of the same catalog do not all expose the same attributes. The
//! accumulator keeps one value list per column and pads with empty strings
//! so that every column always holds exactly one value per row.

use std::collections::HashMap;

use tracing::debug;

use crate::models::{PageExtraction, PartRecord};

use super::ExportError;

#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    names: Vec<String>,
    index: HashMap<String, usize>,
    values: Vec<Vec<String>>,
    rows: usize,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the given columns, in order.
    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut acc = Self::new();
        for name in columns {
            acc.ensure_column(&name.into());
        }
        acc
    }

    /// Start with the part record columns in canonical order.
    pub fn seeded() -> Self {
        Self::with_columns(PartRecord::canonical_columns())
    }

    /// Build from raw columns without padding; the row count is the longest
    /// column, so the result may be inconsistent.
    #[cfg(test)]
    pub(crate) fn from_columns(columns: Vec<(String, Vec<String>)>) -> Self {
        let mut acc = Self::new();
        for (name, values) in columns {
            acc.rows = acc.rows.max(values.len());
            acc.index.insert(name.clone(), acc.names.len());
            acc.names.push(name);
            acc.values.push(values);
        }
        acc
    }

    fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(&i) = self.index.get(name) {
            return i;
        }
        let i = self.names.len();
        debug!(column = name, backfill = self.rows, "new column");
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), i);
        self.values.push(vec![String::new(); self.rows]);
        i
    }

    /// Append one row of `(column, value)` pairs.
    ///
    /// Unknown columns are created and back-filled for earlier rows; known
    /// columns missing from `row` get an empty value. When a column appears
    /// twice in `row`, the first value is used.
    pub fn append_row(&mut self, row: &[(String, String)]) {
        let mut cells: Vec<Option<&str>> = vec![None; self.names.len()];
        for (name, value) in row {
            let i = self.ensure_column(name);
            if i >= cells.len() {
                cells.resize(i + 1, None);
            }
            if cells[i].is_none() {
                cells[i] = Some(value.as_str());
            }
        }
        for (i, column) in self.values.iter_mut().enumerate() {
            column.push(cells.get(i).copied().flatten().unwrap_or_default().to_string());
        }
        self.rows += 1;
    }

    /// Append rows in order.
    pub fn append_rows<'r, I>(&mut self, rows: I)
    where
        I: IntoIterator<Item = &'r [(String, String)]>,
    {
        for row in rows {
            self.append_row(row);
        }
    }

    /// Append every record of a page, each followed by the page's specs.
    /// Returns the number of rows added.
    pub fn append_page(&mut self, page: &PageExtraction) -> usize {
        for record in &page.records {
            let mut row = record.columns();
            row.extend(page.specs.iter().cloned());
            self.append_row(&row);
        }
        page.records.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Option<&[String]> {
        self.index.get(name).map(|&i| self.values[i].as_slice())
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Every column holds exactly one value per row.
    pub fn check_consistent(&self) -> Result<(), ExportError> {
        let columns: Vec<(String, usize)> = self
            .names
            .iter()
            .zip(&self.values)
            .filter(|(_, values)| values.len() != self.rows)
            .map(|(name, values)| (name.clone(), values.len()))
            .collect();
        if columns.is_empty() {
            Ok(())
        } else {
            Err(ExportError::Inconsistent {
                rows: self.rows,
                columns,
            })
        }
    }

    /// Row `i` as cell values in column order.
    pub fn row(&self, i: usize) -> Vec<&str> {
        self.values
            .iter()
            .map(|column| column.get(i).map(String::as_str).unwrap_or_default())
            .collect()
    }

    /// Rows in order, as cell values in column order.
    pub fn rows(&self) -> impl Iterator<Item = Vec<&str>> + '_ {
        (0..self.rows).map(move |i| self.row(i))
    }
}

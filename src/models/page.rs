//! Per-page extraction results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::part::PartRecord;

/// How the records of a page were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// Structured tables first, text context when no table rows were found.
    #[default]
    Auto,
    /// Header-mapped tables only.
    Structured,
    /// Regex over the text surrounding each part number.
    Context,
}

impl ExtractionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Structured => "structured",
            Self::Context => "context",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "structured" | "table" => Some(Self::Structured),
            "context" | "text" => Some(Self::Context),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one locator chain did on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTrace {
    pub chain: String,
    /// Label of the strategy that matched, if any.
    pub matched: Option<String>,
    pub elements: usize,
    /// One line per strategy attempted, in order.
    pub attempts: Vec<String>,
}

/// Everything extracted from a single page snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageExtraction {
    pub url: String,
    /// Mode that produced `records`.
    pub mode: Option<ExtractionMode>,
    pub records: Vec<PartRecord>,
    /// Product-level attributes shared by every record of the page.
    pub specs: Vec<(String, String)>,
    pub trace: Vec<ChainTrace>,
}

impl PageExtraction {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Drop records without a part number or with nothing else found, and
    /// keep one record per part number: the first, with its empty fields
    /// filled from later duplicates.
    pub fn finalize(&mut self) {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut kept: Vec<PartRecord> = Vec::with_capacity(self.records.len());
        for record in std::mem::take(&mut self.records) {
            let Some(pn) = record.part_number.clone() else {
                continue;
            };
            if record.is_blank() {
                continue;
            }
            match index.get(&pn) {
                Some(&i) => kept[i].merge_missing(&record),
                None => {
                    index.insert(pn, kept.len());
                    kept.push(record);
                }
            }
        }
        self.records = kept;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Field;

    fn record(pn: &str, price: Option<&str>) -> PartRecord {
        let mut r = PartRecord::new("https://example.com/p");
        r.set_if_empty(Field::PartNumber, pn);
        if let Some(p) = price {
            r.set_if_empty(Field::Price, p);
        }
        r
    }

    #[test]
    fn finalize_keeps_first_occurrence() {
        let mut page = PageExtraction::new("https://example.com/p");
        page.records = vec![
            record("6200ZZ", Some("150,000 VND")),
            record("6201ZZ", Some("160,000 VND")),
            record("6200ZZ", Some("999 VND")),
        ];
        page.finalize();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].price.as_deref(), Some("150,000 VND"));
    }

    #[test]
    fn later_duplicates_only_fill_empty_fields() {
        let mut page = PageExtraction::new("https://example.com/p");
        let mut late = record("6200ZZ", Some("999 VND"));
        late.set_if_empty(Field::DaysToShip, "Same day");
        page.records = vec![record("6200ZZ", Some("150,000 VND")), late];
        page.finalize();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].price.as_deref(), Some("150,000 VND"));
        assert_eq!(page.records[0].days_to_ship.as_deref(), Some("Same day"));
    }

    #[test]
    fn finalize_drops_blank_and_unnamed_records() {
        let mut page = PageExtraction::new("u");
        let mut unnamed = PartRecord::new("u");
        unnamed.set_if_empty(Field::Price, "1 VND");
        page.records = vec![record("6200ZZ", None), unnamed, record("6202ZZ", Some("2 VND"))];
        page.finalize();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].part_number.as_deref(), Some("6202ZZ"));
    }

    #[test]
    fn mode_parses_aliases() {
        assert_eq!(ExtractionMode::from_str("table"), Some(ExtractionMode::Structured));
        assert_eq!(ExtractionMode::from_str("Context"), Some(ExtractionMode::Context));
        assert_eq!(ExtractionMode::from_str("xpath"), None);
    }
}

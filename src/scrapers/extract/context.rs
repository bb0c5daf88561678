//! Text-context extraction.
//!
//! Some page variants render prices and lead times outside any table. For
//! those, each part number is looked up in the page text and the fields are
//! read with regexes from a character window around its first occurrence.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrapeError};
use crate::models::{Field, PartRecord};
use crate::utils::char_window;

static JSON_LD_PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)"lowPrice"\s*:\s*"?(\d+(?:\.\d+)?)"?.*?"highPrice"\s*:\s*"?(\d+(?:\.\d+)?)"?.*?"priceCurrency"\s*:\s*"([^"]+)""#,
    )
    .unwrap()
});

/// Context-mode settings (`[run.context]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Characters of text taken on each side of the part number.
    #[serde(default = "default_window")]
    pub window: usize,
    #[serde(default = "default_price_pattern")]
    pub price_pattern: String,
    /// Phrase that marks same-day shipping (case-insensitive).
    #[serde(default = "default_same_day")]
    pub same_day: String,
    #[serde(default = "default_lead_time_pattern")]
    pub lead_time_pattern: String,
    #[serde(default = "default_quantity_pattern")]
    pub quantity_pattern: String,
    /// Fill missing prices from the page's structured-data price range.
    #[serde(default = "default_true")]
    pub json_ld_price: bool,
}

fn default_window() -> usize {
    500
}

fn default_price_pattern() -> String {
    r"\d{1,3}(?:[.,]\d{3})*(?:\.\d+)?\s*(?:VND|₫|USD|\$|¥|円|€)".to_string()
}

fn default_same_day() -> String {
    "same day".to_string()
}

fn default_lead_time_pattern() -> String {
    r"(?i)\d+\s*day".to_string()
}

fn default_quantity_pattern() -> String {
    r"(?i)\d+\s*(?:pieces?|pcs)\b".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            price_pattern: default_price_pattern(),
            same_day: default_same_day(),
            lead_time_pattern: default_lead_time_pattern(),
            quantity_pattern: default_quantity_pattern(),
            json_ld_price: default_true(),
        }
    }
}

/// Compiled context extractor.
#[derive(Debug, Clone)]
pub struct ContextExtractor {
    window: usize,
    price: Regex,
    same_day: String,
    lead_time: Regex,
    quantity: Regex,
    json_ld_price: bool,
}

fn compile(name: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| ScrapeError::Config(format!("invalid {} pattern: {}", name, e)))
}

impl ContextExtractor {
    pub fn new(config: &ContextConfig) -> Result<Self> {
        Ok(Self {
            window: config.window,
            price: compile("price", &config.price_pattern)?,
            same_day: config.same_day.to_lowercase(),
            lead_time: compile("lead time", &config.lead_time_pattern)?,
            quantity: compile("quantity", &config.quantity_pattern)?,
            json_ld_price: config.json_ld_price,
        })
    }

    pub fn json_ld_price(&self) -> bool {
        self.json_ld_price
    }

    /// One record per token found in `text`. Tokens absent from the text
    /// produce no record.
    pub fn extract(&self, text: &str, tokens: &[String], page_url: &str) -> Vec<PartRecord> {
        tokens
            .iter()
            .filter_map(|token| {
                let start = text.find(token.as_str())?;
                let window = char_window(text, start, start + token.len(), self.window);
                let mut record = PartRecord::new(page_url);
                record.set_if_empty(Field::PartNumber, token.as_str());
                self.fill_from_window(window, &mut record);
                Some(record)
            })
            .collect()
    }

    /// Read price, lead time and quantity from a text window.
    pub fn fill_from_window(&self, window: &str, record: &mut PartRecord) {
        if let Some(m) = self.price.find(window) {
            record.set_if_empty(Field::Price, m.as_str());
        }

        let lower = window.to_lowercase();
        if !self.same_day.is_empty() && lower.contains(&self.same_day) {
            record.set_if_empty(Field::DaysToShip, self.same_day.as_str());
        } else if let Some(m) = self.lead_time.find(window) {
            record.set_if_empty(Field::DaysToShip, m.as_str().to_lowercase());
        }

        if let Some(m) = self.quantity.find(window) {
            record.set_if_empty(Field::MinimumOrderQty, m.as_str().to_lowercase());
        }
    }
}

/// Price range from the page's structured data, e.g. `150000 VND` or
/// `150000-180000 VND`.
pub fn json_ld_price(source: &str) -> Option<String> {
    let caps = JSON_LD_PRICE.captures(source)?;
    let low = caps.get(1)?.as_str();
    let high = caps.get(2)?.as_str();
    let currency = caps.get(3)?.as_str();
    if low == high {
        Some(format!("{} {}", low, currency))
    } else {
        Some(format!("{}-{} {}", low, high, currency))
    }
}

//! Part-number plausibility filter and candidate discovery.

use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::utils::clean_text;

static PART_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9][A-Z0-9\-_./]*$").unwrap());

/// Configurable part-number recognition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartNumberConfig {
    /// Regexes used to find part numbers in free text.
    #[serde(default = "default_patterns")]
    pub patterns: Vec<String>,
    /// Words that disqualify a candidate (case-insensitive substring).
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    #[serde(default = "default_min_len")]
    pub min_len: usize,
    #[serde(default = "default_max_len")]
    pub max_len: usize,
}

fn default_patterns() -> Vec<String> {
    vec![
        r"\b[A-Z0-9][A-Z0-9\-]*ZZ\b".to_string(),
        r"\b[A-Z]-[A-Z]\d{4}[A-Z]{2}\b".to_string(),
        r"\b\d{4}[-_]?[A-Z]{2,3}\b".to_string(),
        r"\b[A-Z0-9]{3,}-[A-Z0-9]{4,}\b".to_string(),
    ]
}

fn default_exclude() -> Vec<String> {
    ["misumi", "bearing", "part", "number", "price", "vnd", "usd", "piece", "days"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_min_len() -> usize {
    3
}

fn default_max_len() -> usize {
    40
}

impl Default for PartNumberConfig {
    fn default() -> Self {
        Self {
            patterns: default_patterns(),
            exclude: default_exclude(),
            min_len: default_min_len(),
            max_len: default_max_len(),
        }
    }
}

/// Compiled form of [`PartNumberConfig`].
#[derive(Debug, Clone)]
pub struct PartNumberFilter {
    patterns: Vec<Regex>,
    exclude: Vec<String>,
    min_len: usize,
    max_len: usize,
}

impl PartNumberFilter {
    /// Compile the configuration. Invalid patterns are logged and skipped.
    pub fn new(config: &PartNumberConfig) -> Self {
        let patterns = config
            .patterns
            .iter()
            .filter_map(|p| match Regex::new(p) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!("Ignoring invalid part-number pattern {:?}: {}", p, e);
                    None
                }
            })
            .collect();
        Self {
            patterns,
            exclude: config.exclude.iter().map(|w| w.to_lowercase()).collect(),
            min_len: config.min_len,
            max_len: config.max_len,
        }
    }

    /// Whether `candidate` looks like a part number.
    pub fn is_plausible(&self, candidate: &str) -> bool {
        let c = candidate.trim();
        let len = c.chars().count();
        if len < self.min_len || len > self.max_len {
            return false;
        }
        if !c.chars().any(|ch| ch.is_ascii_alphabetic()) || !c.chars().any(|ch| ch.is_ascii_digit()) {
            return false;
        }
        if !PART_SHAPE.is_match(c) {
            return false;
        }
        let lower = c.to_lowercase();
        !self.exclude.iter().any(|w| !w.is_empty() && lower.contains(w.as_str()))
    }

    /// Plausible part numbers in `text`, unique, in order of first appearance.
    pub fn find_in(&self, text: &str) -> Vec<String> {
        let mut hits: Vec<(usize, String)> = Vec::new();
        for re in &self.patterns {
            for m in re.find_iter(text) {
                hits.push((m.start(), m.as_str().to_string()));
            }
        }
        hits.sort_by_key(|(pos, _)| *pos);

        let mut out: Vec<String> = Vec::new();
        for (_, hit) in hits {
            if self.is_plausible(&hit) && !out.contains(&hit) {
                out.push(hit);
            }
        }
        out
    }
}

/// Part numbers from located dropdown options, unique, in option order.
///
/// Options carry the part number in `title`; the visible text is the fallback.
pub fn option_values(options: &[ElementRef<'_>], filter: &PartNumberFilter) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for option in options {
        let value = option
            .value()
            .attr("title")
            .map(clean_text)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| clean_text(&option.text().collect::<String>()));
        if filter.is_plausible(&value) && !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::locator::{LocatorChain, LocatorSpec};
    use scraper::Html;

    fn filter() -> PartNumberFilter {
        PartNumberFilter::new(&PartNumberConfig::default())
    }

    #[test]
    fn plausible_part_numbers() {
        let f = filter();
        assert!(f.is_plausible("6200ZZ"));
        assert!(f.is_plausible("B-E6200ZZ"));
        assert!(f.is_plausible("6001-2RS"));
        assert!(!f.is_plausible("ZZ"));
        assert!(!f.is_plausible("6200"));
        assert!(!f.is_plausible("150,000VND"));
        assert!(!f.is_plausible("MISUMI-1234"));
        assert!(!f.is_plausible("abc123"));
    }

    #[test]
    fn find_in_text_is_ordered_and_unique() {
        let text = "Bearing 6201ZZ ships today. 6200ZZ costs less. 6201ZZ again. ZZ alone.";
        assert_eq!(filter().find_in(text), vec!["6201ZZ", "6200ZZ"]);
    }

    #[test]
    fn invalid_patterns_are_skipped() {
        let config = PartNumberConfig {
            patterns: vec!["([".to_string(), r"\b\d{4}ZZ\b".to_string()],
            ..Default::default()
        };
        let f = PartNumberFilter::new(&config);
        assert_eq!(f.find_in("x 6300ZZ y"), vec!["6300ZZ"]);
    }

    #[test]
    fn dropdown_prefers_title_attribute() {
        let doc = Html::parse_document(
            r#"<ul>
                <li class="opt" title="6200ZZ">6200ZZ (10 x 30)</li>
                <li class="opt">6201ZZ</li>
                <li class="opt">Select part number</li>
            </ul>"#,
        );
        let chain = LocatorChain::from_specs("options", &[LocatorSpec::class("opt")]);
        assert_eq!(
            option_values(&chain.locate_in(&doc).elements, &filter()),
            vec!["6200ZZ", "6201ZZ"]
        );
    }
}

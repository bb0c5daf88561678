//! Header keyword rules and value sanity checks.

use serde::{Deserialize, Serialize};

use crate::models::Field;

/// Currency markers accepted by the currency check.
pub const CURRENCY_MARKERS: &[&str] = &["vnd", "₫", "usd", "$", "¥", "円", "€"];

/// Sanity check a cell value must pass before it populates a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueCheck {
    /// Any non-empty text.
    #[default]
    Text,
    /// Digits with optional `.`/`,` separators.
    Numeric,
    /// Numeric, or a number tagged with a currency marker.
    NumericOrCurrency,
}

impl ValueCheck {
    /// Returns the accepted form of `raw`, or `None` if it fails the check.
    ///
    /// Numeric values with a trailing parenthetical (`29.4 (14.7)`) are
    /// accepted as the part before the parenthesis.
    pub fn accept(&self, raw: &str) -> Option<String> {
        let value = raw.trim();
        if value.is_empty() || is_placeholder(value) {
            return None;
        }
        match self {
            ValueCheck::Text => Some(value.to_string()),
            ValueCheck::Numeric => numeric_form(value),
            ValueCheck::NumericOrCurrency => {
                if is_currency(value) {
                    Some(value.to_string())
                } else {
                    numeric_form(value)
                }
            }
        }
    }
}

fn numeric_form(value: &str) -> Option<String> {
    if is_numeric(value) {
        return Some(value.to_string());
    }
    let head = value.split('(').next().unwrap_or_default().trim();
    if head.len() < value.len() && is_numeric(head) {
        return Some(head.to_string());
    }
    None
}

/// Digits after stripping `.` and `,` separators.
pub fn is_numeric(value: &str) -> bool {
    let digits: String = value.trim().chars().filter(|c| *c != '.' && *c != ',').collect();
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// Contains a digit and a known currency marker.
pub fn is_currency(value: &str) -> bool {
    let lower = value.to_lowercase();
    lower.chars().any(|c| c.is_ascii_digit()) && CURRENCY_MARKERS.iter().any(|m| lower.contains(m))
}

fn is_placeholder(value: &str) -> bool {
    matches!(value, "-" | "–" | "—" | "N/A" | "n/a")
}

/// True if `keyword` occurs in `haystack` starting at a word boundary.
///
/// Keeps short keywords like `cr` from matching inside `description`.
pub fn contains_word_start(haystack: &str, keyword: &str) -> bool {
    if keyword.is_empty() {
        return false;
    }
    haystack.match_indices(keyword).any(|(i, _)| {
        haystack[..i]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric())
    })
}

/// Maps table headers to a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub field: Field,
    /// Alternatives; every keyword of one group must appear in the header.
    pub keywords: Vec<Vec<String>>,
    #[serde(default)]
    pub check: ValueCheck,
}

impl FieldRule {
    pub fn new(field: Field, check: ValueCheck, groups: &[&[&str]]) -> Self {
        Self {
            field,
            keywords: groups
                .iter()
                .map(|g| g.iter().map(|k| k.to_string()).collect())
                .collect(),
            check,
        }
    }

    pub fn matches(&self, header: &str) -> bool {
        let header = header.to_lowercase();
        self.keywords.iter().any(|group| {
            !group.is_empty()
                && group
                    .iter()
                    .all(|kw| contains_word_start(&header, &kw.to_lowercase()))
        })
    }
}

/// Ordered header rules. The first matching rule decides a column's field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub rules: Vec<FieldRule>,
}

impl Default for FieldMapping {
    fn default() -> Self {
        use Field::*;
        use ValueCheck::*;
        Self {
            rules: vec![
                FieldRule::new(PartNumber, Text, &[&["part", "number"], &["part", "no"], &["model"]]),
                FieldRule::new(Price, NumericOrCurrency, &[&["price"], &["unit", "price"]]),
                FieldRule::new(DaysToShip, Text, &[&["days", "ship"], &["lead", "time"], &["shipping"]]),
                FieldRule::new(
                    MinimumOrderQty,
                    Text,
                    &[&["minimum"], &["min", "qty"], &["order", "qty"], &["moq"]],
                ),
                FieldRule::new(InnerDiaD, Numeric, &[&["inner", "dia"], &["bore"]]),
                FieldRule::new(OuterDiaD, Numeric, &[&["outer", "dia"]]),
                FieldRule::new(WidthB, Numeric, &[&["width"]]),
                FieldRule::new(BasicLoadRatingCr, Numeric, &[&["dynamic"], &["cr"]]),
                FieldRule::new(BasicLoadRatingCor, Numeric, &[&["static"], &["cor"], &["c0r"]]),
                FieldRule::new(Weight, Numeric, &[&["weight"], &["mass"]]),
            ],
        }
    }
}

impl FieldMapping {
    /// Field for a header, by first matching rule.
    pub fn field_for(&self, header: &str) -> Option<&FieldRule> {
        self.rules.iter().find(|r| r.matches(header))
    }

    pub fn rule(&self, field: Field) -> Option<&FieldRule> {
        self.rules.iter().find(|r| r.field == field)
    }

    /// Check to apply for a field, whether or not a header rule exists for it.
    pub fn check_for(&self, field: Field) -> ValueCheck {
        self.rule(field).map(|r| r.check).unwrap_or_default()
    }

    /// Whether the text looks like a header row (mentions any keyword).
    pub fn looks_like_header(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.rules.iter().any(|r| {
            r.keywords
                .iter()
                .any(|g| !g.is_empty() && g.iter().all(|kw| contains_word_start(&lower, &kw.to_lowercase())))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_check_strips_separators() {
        assert!(is_numeric("10"));
        assert!(is_numeric("1,080"));
        assert!(is_numeric("4.5"));
        assert!(!is_numeric("10 mm"));
        assert!(!is_numeric(".,"));
        assert_eq!(ValueCheck::Numeric.accept(" 30 "), Some("30".to_string()));
        assert_eq!(ValueCheck::Numeric.accept("abc"), None);
    }

    #[test]
    fn numeric_check_drops_parenthetical() {
        assert_eq!(ValueCheck::Numeric.accept("29.4 (14.7)"), Some("29.4".to_string()));
        assert_eq!(ValueCheck::Numeric.accept("(14.7)"), None);
    }

    #[test]
    fn currency_values_pass_price_check() {
        assert_eq!(
            ValueCheck::NumericOrCurrency.accept("150,000 VND"),
            Some("150,000 VND".to_string())
        );
        assert_eq!(
            ValueCheck::NumericOrCurrency.accept("150,000"),
            Some("150,000".to_string())
        );
        assert_eq!(ValueCheck::NumericOrCurrency.accept("Quote"), None);
    }

    #[test]
    fn placeholders_are_rejected() {
        assert_eq!(ValueCheck::Text.accept("-"), None);
        assert_eq!(ValueCheck::Text.accept("N/A"), None);
        assert_eq!(ValueCheck::Text.accept("same day"), Some("same day".to_string()));
    }

    #[test]
    fn default_mapping_resolves_catalog_headers() {
        let mapping = FieldMapping::default();
        let field = |h: &str| mapping.field_for(h).map(|r| r.field);
        assert_eq!(field("Part Number"), Some(Field::PartNumber));
        assert_eq!(field("Unit Price (Excl. VAT)"), Some(Field::Price));
        assert_eq!(field("Days to Ship"), Some(Field::DaysToShip));
        assert_eq!(field("Minimum Order Qty"), Some(Field::MinimumOrderQty));
        assert_eq!(field("Inner Dia. d(mm)"), Some(Field::InnerDiaD));
        assert_eq!(field("Outer Dia. D(mm)"), Some(Field::OuterDiaD));
        assert_eq!(field("Width B(mm)"), Some(Field::WidthB));
        assert_eq!(field("Basic Load Rating Cr(Dynamic)(N)"), Some(Field::BasicLoadRatingCr));
        assert_eq!(field("Basic Load Rating Cor(Static)(N)"), Some(Field::BasicLoadRatingCor));
        assert_eq!(field("Weight (g)"), Some(Field::Weight));
        assert_eq!(field("Description"), None);
    }

    #[test]
    fn short_keywords_need_a_word_start() {
        assert!(contains_word_start("load rating cr", "cr"));
        assert!(!contains_word_start("description", "cr"));
        assert!(contains_word_start("(cr)", "cr"));
    }

    #[test]
    fn header_detection_uses_keywords() {
        let mapping = FieldMapping::default();
        assert!(mapping.looks_like_header("Part Number Price Days to Ship"));
        assert!(!mapping.looks_like_header("6200ZZ 150,000 VND"));
    }
}

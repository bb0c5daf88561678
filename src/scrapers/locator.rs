//! Ordered locator chains.
//!
//! Catalog markup changes between site releases (hashed CSS-module class
//! names, restructured wrappers), so every element the scraper needs is found
//! through a chain of strategies tried in order. The first strategy that
//! yields elements wins; every attempt is recorded so a miss can be diagnosed
//! from the log instead of guessed at.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::ChainTrace;
use crate::utils::{clean_text, element_text};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocateError {
    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },
    #[error("unsupported path {path:?}: {reason}")]
    Unsupported { path: String, reason: String },
    #[error("empty locator value")]
    EmptyValue,
}

/// A single way of finding elements below a scope element.
pub trait LocateStrategy: std::fmt::Debug {
    /// Short human-readable description, e.g. `class=Table_base`.
    fn label(&self) -> String;

    /// Find matching descendants of `scope`.
    ///
    /// An empty vector is a miss, not an error. Errors are reserved for
    /// strategies that cannot run at all (bad selector, unsupported path).
    fn attempt<'a>(&self, scope: ElementRef<'a>) -> Result<Vec<ElementRef<'a>>, LocateError>;
}

/// Selector compiled once; a compile failure is reported on every attempt.
#[derive(Debug)]
struct Compiled {
    source: String,
    selector: Result<Selector, LocateError>,
}

impl Compiled {
    fn new(source: String) -> Self {
        let selector = if source.trim().is_empty() {
            Err(LocateError::EmptyValue)
        } else {
            Selector::parse(&source).map_err(|e| LocateError::InvalidSelector {
                selector: source.clone(),
                reason: e.to_string(),
            })
        };
        Self { source, selector }
    }

    fn failed(source: String, err: LocateError) -> Self {
        Self {
            source,
            selector: Err(err),
        }
    }

    fn select<'a>(&self, scope: ElementRef<'a>) -> Result<Vec<ElementRef<'a>>, LocateError> {
        let selector = self.selector.as_ref().map_err(Clone::clone)?;
        Ok(scope.select(selector).collect())
    }
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Element with the given `id` attribute.
#[derive(Debug)]
pub struct ById {
    id: String,
    compiled: Compiled,
}

impl ById {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let compiled = if id.trim().is_empty() {
            Compiled::failed(id.clone(), LocateError::EmptyValue)
        } else {
            Compiled::new(format!("[id=\"{}\"]", quote(id.trim())))
        };
        Self { id, compiled }
    }
}

impl LocateStrategy for ById {
    fn label(&self) -> String {
        format!("id={}", self.id)
    }

    fn attempt<'a>(&self, scope: ElementRef<'a>) -> Result<Vec<ElementRef<'a>>, LocateError> {
        self.compiled.select(scope)
    }
}

/// Elements carrying an exact class token.
#[derive(Debug)]
pub struct ByClass {
    class: String,
    compiled: Compiled,
}

impl ByClass {
    pub fn new(class: impl Into<String>) -> Self {
        let class = class.into();
        let compiled = if class.trim().is_empty() {
            Compiled::failed(class.clone(), LocateError::EmptyValue)
        } else {
            Compiled::new(format!("[class~=\"{}\"]", quote(class.trim())))
        };
        Self { class, compiled }
    }
}

impl LocateStrategy for ByClass {
    fn label(&self) -> String {
        format!("class={}", self.class)
    }

    fn attempt<'a>(&self, scope: ElementRef<'a>) -> Result<Vec<ElementRef<'a>>, LocateError> {
        self.compiled.select(scope)
    }
}

/// Elements whose class attribute contains a fragment.
///
/// Survives the hash suffix of CSS-module class names changing between
/// deployments (`Table_base__DK2Le` vs `Table_base__X9a1Q`).
#[derive(Debug)]
pub struct ByClassContains {
    fragment: String,
    compiled: Compiled,
}

impl ByClassContains {
    pub fn new(fragment: impl Into<String>) -> Self {
        let fragment = fragment.into();
        let compiled = if fragment.trim().is_empty() {
            Compiled::failed(fragment.clone(), LocateError::EmptyValue)
        } else {
            Compiled::new(format!("[class*=\"{}\"]", quote(fragment.trim())))
        };
        Self { fragment, compiled }
    }
}

impl LocateStrategy for ByClassContains {
    fn label(&self) -> String {
        format!("class*={}", self.fragment)
    }

    fn attempt<'a>(&self, scope: ElementRef<'a>) -> Result<Vec<ElementRef<'a>>, LocateError> {
        self.compiled.select(scope)
    }
}

/// Arbitrary CSS selector.
#[derive(Debug)]
pub struct ByCss {
    compiled: Compiled,
}

impl ByCss {
    pub fn new(css: impl Into<String>) -> Self {
        Self {
            compiled: Compiled::new(css.into()),
        }
    }
}

impl LocateStrategy for ByCss {
    fn label(&self) -> String {
        format!("css={}", self.compiled.source)
    }

    fn attempt<'a>(&self, scope: ElementRef<'a>) -> Result<Vec<ElementRef<'a>>, LocateError> {
        self.compiled.select(scope)
    }
}

/// Structural path from an anchor element, written as a simple XPath
/// (`//*[@id="list"]/div/div[2]/table`) or directly as a CSS child path.
#[derive(Debug)]
pub struct ByPath {
    path: String,
    compiled: Compiled,
}

impl ByPath {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let compiled = if path.trim_start().starts_with('/') {
            match xpath_to_css(path.trim()) {
                Ok(css) => Compiled::new(css),
                Err(e) => Compiled::failed(path.clone(), e),
            }
        } else {
            Compiled::new(path.clone())
        };
        Self { path, compiled }
    }
}

impl LocateStrategy for ByPath {
    fn label(&self) -> String {
        format!("path={}", self.path)
    }

    fn attempt<'a>(&self, scope: ElementRef<'a>) -> Result<Vec<ElementRef<'a>>, LocateError> {
        self.compiled.select(scope)
    }
}

/// All descendants with a tag name, compared case-insensitively.
#[derive(Debug)]
pub struct ByTag {
    tag: String,
}

impl ByTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().trim().to_ascii_lowercase(),
        }
    }
}

impl LocateStrategy for ByTag {
    fn label(&self) -> String {
        format!("tag={}", self.tag)
    }

    fn attempt<'a>(&self, scope: ElementRef<'a>) -> Result<Vec<ElementRef<'a>>, LocateError> {
        if self.tag.is_empty() {
            return Err(LocateError::EmptyValue);
        }
        Ok(scope
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name().eq_ignore_ascii_case(&self.tag))
            .collect())
    }
}

/// Translate the XPath subset used in catalog scraping into CSS.
///
/// Supported: `/` and `//` axes, tag names or `*`, positional predicates
/// `[n]` and attribute equality predicates `[@attr="v"]`.
pub fn xpath_to_css(path: &str) -> Result<String, LocateError> {
    let unsupported = |reason: &str| LocateError::Unsupported {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    let mut css = String::new();
    let mut rest = path;
    while !rest.is_empty() {
        let descendant = rest.starts_with("//");
        rest = rest
            .strip_prefix("//")
            .or_else(|| rest.strip_prefix('/'))
            .ok_or_else(|| unsupported("expected '/'"))?;

        let end = step_end(rest);
        let step = &rest[..end];
        rest = &rest[end..];
        if step.is_empty() {
            return Err(unsupported("empty step"));
        }

        let (tag, predicates) = match step.find('[') {
            Some(i) => (&step[..i], &step[i..]),
            None => (step, ""),
        };
        if tag != "*" && !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(unsupported("only element names and * are supported"));
        }

        let mut selector = if tag == "*" { String::new() } else { tag.to_string() };
        for predicate in predicates.split_inclusive(']') {
            let inner = predicate
                .strip_prefix('[')
                .and_then(|p| p.strip_suffix(']'))
                .ok_or_else(|| unsupported("malformed predicate"))?;
            if let Ok(n) = inner.parse::<usize>() {
                if tag == "*" {
                    selector.push_str(&format!(":nth-child({n})"));
                } else {
                    selector.push_str(&format!(":nth-of-type({n})"));
                }
            } else if let Some(attr) = inner.strip_prefix('@') {
                let (name, value) = attr
                    .split_once('=')
                    .ok_or_else(|| unsupported("attribute predicate without value"))?;
                let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
                selector.push_str(&format!("[{}=\"{}\"]", name.trim(), quote(value)));
            } else {
                return Err(unsupported("only [n] and [@attr=value] predicates are supported"));
            }
        }
        if selector.is_empty() {
            selector.push('*');
        }

        if !css.is_empty() {
            css.push_str(if descendant { " " } else { " > " });
        } else if !descendant && selector != "html" {
            // Absolute single-slash paths start at the document root.
            css.push_str(":root > ");
        }
        css.push_str(&selector);
    }

    if css.is_empty() {
        return Err(unsupported("empty path"));
    }
    Ok(css)
}

/// Index of the next `/` outside of a predicate.
fn step_end(s: &str) -> usize {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match (c, quote) {
            ('"' | '\'', None) => quote = Some(c),
            (q, Some(open)) if q == open => quote = None,
            ('[', None) => depth += 1,
            (']', None) => depth = depth.saturating_sub(1),
            ('/', None) if depth == 0 => return i,
            _ => {}
        }
    }
    s.len()
}

/// Kind of a configured locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorKind {
    Id,
    Class,
    ClassContains,
    Css,
    Path,
    Tag,
}

/// A locator as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorSpec {
    pub by: LocatorKind,
    pub value: String,
    /// Attribute holding the value (`src`, `href`); the element text otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<String>,
}

impl LocatorSpec {
    pub fn new(by: LocatorKind, value: impl Into<String>) -> Self {
        Self {
            by,
            value: value.into(),
            attr: None,
        }
    }

    /// Read `attr` from the matched element instead of its text.
    pub fn with_attr(mut self, attr: &str) -> Self {
        self.attr = Some(attr.to_string());
        self
    }

    pub fn id(value: &str) -> Self {
        Self::new(LocatorKind::Id, value)
    }

    pub fn class(value: &str) -> Self {
        Self::new(LocatorKind::Class, value)
    }

    pub fn class_contains(value: &str) -> Self {
        Self::new(LocatorKind::ClassContains, value)
    }

    pub fn css(value: &str) -> Self {
        Self::new(LocatorKind::Css, value)
    }

    pub fn path(value: &str) -> Self {
        Self::new(LocatorKind::Path, value)
    }

    pub fn tag(value: &str) -> Self {
        Self::new(LocatorKind::Tag, value)
    }

    pub fn build(&self) -> Box<dyn LocateStrategy> {
        let value = self.value.clone();
        match self.by {
            LocatorKind::Id => Box::new(ById::new(value)),
            LocatorKind::Class => Box::new(ByClass::new(value)),
            LocatorKind::ClassContains => Box::new(ByClassContains::new(value)),
            LocatorKind::Css => Box::new(ByCss::new(value)),
            LocatorKind::Path => Box::new(ByPath::new(value)),
            LocatorKind::Tag => Box::new(ByTag::new(value)),
        }
    }
}

/// Result of one strategy attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Found(usize),
    Empty,
    Failed(LocateError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub strategy: String,
    pub outcome: AttemptOutcome,
}

impl std::fmt::Display for Attempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.outcome {
            AttemptOutcome::Found(n) => write!(f, "{}: {} found", self.strategy, n),
            AttemptOutcome::Empty => write!(f, "{}: no match", self.strategy),
            AttemptOutcome::Failed(e) => write!(f, "{}: failed ({})", self.strategy, e),
        }
    }
}

/// Elements located by a chain, with the attempts that led there.
#[derive(Debug)]
pub struct Located<'a> {
    pub elements: Vec<ElementRef<'a>>,
    /// Index of the winning strategy.
    pub matched: Option<usize>,
    pub attempts: Vec<Attempt>,
}

impl<'a> Located<'a> {
    pub fn is_found(&self) -> bool {
        !self.elements.is_empty()
    }

    pub fn first(&self) -> Option<ElementRef<'a>> {
        self.elements.first().copied()
    }

    pub fn matched_label(&self) -> Option<&str> {
        self.matched
            .and_then(|i| self.attempts.get(i))
            .map(|a| a.strategy.as_str())
    }

    pub fn trace(&self, chain: &str) -> ChainTrace {
        ChainTrace {
            chain: chain.to_string(),
            matched: self.matched_label().map(str::to_string),
            elements: self.elements.len(),
            attempts: self.attempts.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Named, ordered list of strategies.
#[derive(Debug)]
pub struct LocatorChain {
    name: String,
    strategies: Vec<Box<dyn LocateStrategy>>,
    /// Attribute to read per strategy, parallel to `strategies`.
    attrs: Vec<Option<String>>,
}

impl LocatorChain {
    pub fn new(name: impl Into<String>, strategies: Vec<Box<dyn LocateStrategy>>) -> Self {
        let attrs = vec![None; strategies.len()];
        Self {
            name: name.into(),
            strategies,
            attrs,
        }
    }

    pub fn from_specs(name: impl Into<String>, specs: &[LocatorSpec]) -> Self {
        Self {
            name: name.into(),
            strategies: specs.iter().map(LocatorSpec::build).collect(),
            attrs: specs.iter().map(|s| s.attr.clone()).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Try each strategy below `scope` until one yields elements.
    ///
    /// Never fails: strategy errors are recorded and the next one is tried.
    pub fn locate<'a>(&self, scope: ElementRef<'a>) -> Located<'a> {
        let mut attempts = Vec::with_capacity(self.strategies.len());
        for (i, strategy) in self.strategies.iter().enumerate() {
            let label = strategy.label();
            let outcome = match strategy.attempt(scope) {
                Ok(elements) if !elements.is_empty() => {
                    debug!(chain = %self.name, strategy = %label, count = elements.len(), "locator matched");
                    attempts.push(Attempt {
                        strategy: label,
                        outcome: AttemptOutcome::Found(elements.len()),
                    });
                    return Located {
                        elements,
                        matched: Some(i),
                        attempts,
                    };
                }
                Ok(_) => AttemptOutcome::Empty,
                Err(e) => AttemptOutcome::Failed(e),
            };
            debug!(chain = %self.name, strategy = %label, ?outcome, "locator attempt missed");
            attempts.push(Attempt {
                strategy: label,
                outcome,
            });
        }
        Located {
            elements: Vec::new(),
            matched: None,
            attempts,
        }
    }

    /// Locate from the document root.
    pub fn locate_in<'a>(&self, doc: &'a Html) -> Located<'a> {
        self.locate(doc.root_element())
    }

    /// Value of the first located element: the winning strategy's attribute
    /// when it names one, else the element text. Blank values are `None`.
    pub fn value_of(&self, located: &Located<'_>) -> Option<String> {
        let el = located.first()?;
        let attr = located
            .matched
            .and_then(|i| self.attrs.get(i))
            .and_then(|a| a.as_deref());
        let value = match attr {
            Some(name) => el.value().attr(name).map(clean_text)?,
            None => element_text(el),
        };
        (!value.is_empty()).then_some(value)
    }

    /// Whether the winning strategy reads an attribute.
    pub fn reads_attr(&self, located: &Located<'_>) -> bool {
        located
            .matched
            .and_then(|i| self.attrs.get(i))
            .is_some_and(Option::is_some)
    }

    /// Whether any strategy matches in the document.
    pub fn resolves(&self, doc: &Html) -> bool {
        self.locate_in(doc).is_found()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div id="partNumberListTable">
            <div>
              <div class="header">x</div>
              <div class="wrapper">
                <table class="PartNumberColumn_tableBase__AB12c"><tr><td>6200ZZ</td></tr></table>
              </div>
            </div>
          </div>
          <table class="other"><tr><td>misc</td></tr></table>
        </body></html>
    "#;

    #[test]
    fn first_matching_strategy_wins() {
        let doc = Html::parse_document(PAGE);
        let chain = LocatorChain::from_specs(
            "table",
            &[
                LocatorSpec::class("PartNumberColumn_tableBase__DK2Le"),
                LocatorSpec::class_contains("PartNumberColumn_tableBase"),
                LocatorSpec::tag("table"),
            ],
        );
        let located = chain.locate_in(&doc);
        assert_eq!(located.matched, Some(1));
        assert_eq!(located.elements.len(), 1);
        assert_eq!(located.attempts[0].outcome, AttemptOutcome::Empty);
        assert_eq!(located.attempts[1].outcome, AttemptOutcome::Found(1));
        assert_eq!(located.attempts.len(), 2);
    }

    #[test]
    fn invalid_selector_is_recorded_and_skipped() {
        let doc = Html::parse_document(PAGE);
        let chain = LocatorChain::from_specs(
            "table",
            &[LocatorSpec::css("table[[["), LocatorSpec::tag("table")],
        );
        let located = chain.locate_in(&doc);
        assert!(matches!(
            located.attempts[0].outcome,
            AttemptOutcome::Failed(LocateError::InvalidSelector { .. })
        ));
        assert_eq!(located.elements.len(), 2);
        assert_eq!(located.matched_label(), Some("tag=table"));
    }

    #[test]
    fn exhausted_chain_returns_empty() {
        let doc = Html::parse_document(PAGE);
        let chain = LocatorChain::from_specs(
            "dropdown",
            &[LocatorSpec::id("codeList"), LocatorSpec::class("dropdown")],
        );
        let located = chain.locate_in(&doc);
        assert!(!located.is_found());
        assert_eq!(located.matched, None);
        assert_eq!(located.attempts.len(), 2);
        let trace = located.trace("dropdown");
        assert_eq!(trace.attempts, vec!["id=codeList: no match", "class=dropdown: no match"]);
    }

    #[test]
    fn structural_xpath_is_translated() {
        assert_eq!(
            xpath_to_css(r#"//*[@id="partNumberListTable"]/div/div[2]/table"#).unwrap(),
            r#"[id="partNumberListTable"] > div > div:nth-of-type(2) > table"#
        );
        assert_eq!(xpath_to_css("/html/body/table").unwrap(), "html > body > table");

        let doc = Html::parse_document(PAGE);
        let chain = LocatorChain::from_specs(
            "table",
            &[LocatorSpec::path(r#"//*[@id="partNumberListTable"]/div/div[2]/table"#)],
        );
        assert_eq!(chain.locate_in(&doc).elements.len(), 1);
    }

    #[test]
    fn unsupported_xpath_fails_the_attempt() {
        assert!(matches!(
            xpath_to_css("//table[contains(@class, 'x')]"),
            Err(LocateError::Unsupported { .. })
        ));
        let doc = Html::parse_document(PAGE);
        let chain =
            LocatorChain::from_specs("t", &[LocatorSpec::path("//div[last()]"), LocatorSpec::id("partNumberListTable")]);
        let located = chain.locate_in(&doc);
        assert_eq!(located.matched, Some(1));
    }

    #[test]
    fn locate_is_scoped_to_descendants() {
        let doc = Html::parse_document(PAGE);
        let table = LocatorChain::from_specs("t", &[LocatorSpec::class("other")])
            .locate_in(&doc)
            .first()
            .unwrap();
        let cells = LocatorChain::from_specs("cells", &[LocatorSpec::tag("td")]).locate(table);
        assert_eq!(cells.elements.len(), 1);
        assert_eq!(cells.elements[0].text().collect::<String>(), "misc");
    }

    #[test]
    fn attribute_is_read_from_the_winning_strategy() {
        let doc = Html::parse_document(
            r#"<div id="actionsPanel"><div><div><img src="/img/6200.jpg" alt="6200"></div></div></div>
               <p class="caption">Bearing photo</p>"#,
        );
        let image = LocatorChain::from_specs(
            "product_image",
            &[
                LocatorSpec::path(r#"//*[@id="actionsPanel"]/div[1]/div/img"#).with_attr("src"),
                LocatorSpec::class("caption"),
            ],
        );
        let located = image.locate_in(&doc);
        assert!(image.reads_attr(&located));
        assert_eq!(image.value_of(&located).as_deref(), Some("/img/6200.jpg"));

        let caption = LocatorChain::from_specs(
            "caption",
            &[LocatorSpec::id("missing").with_attr("src"), LocatorSpec::class("caption")],
        );
        let located = caption.locate_in(&doc);
        assert!(!caption.reads_attr(&located));
        assert_eq!(caption.value_of(&located).as_deref(), Some("Bearing photo"));

        let missing_attr =
            LocatorChain::from_specs("alt", &[LocatorSpec::css("img").with_attr("title")]);
        assert_eq!(missing_attr.value_of(&missing_attr.locate_in(&doc)), None);
    }

    #[test]
    fn empty_values_fail_instead_of_matching_everything() {
        let doc = Html::parse_document(PAGE);
        let chain = LocatorChain::from_specs("t", &[LocatorSpec::class(""), LocatorSpec::tag(" ")]);
        let located = chain.locate_in(&doc);
        assert!(located
            .attempts
            .iter()
            .all(|a| a.outcome == AttemptOutcome::Failed(LocateError::EmptyValue)));
    }
}

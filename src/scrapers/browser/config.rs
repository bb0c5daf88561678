//! Browser session and page-load configuration types.

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::LazyLock;

use crate::utils::visible_text;

static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Browser session options, fixed when the session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserEngineConfig {
    /// Browser engine type.
    #[serde(default)]
    pub engine: BrowserEngineType,

    /// Run in headless mode (default: true).
    #[serde(default = "default_headless")]
    pub headless: bool,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Page locale (navigator.language and Intl), e.g. "en-US".
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Accept-Language header value.
    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    /// IANA timezone override, e.g. "Asia/Ho_Chi_Minh".
    #[serde(default)]
    pub timezone: Option<String>,

    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    #[serde(default)]
    pub proxy: Option<String>,

    /// Navigation timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,

    /// Explicit Chrome/Chromium executable.
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to existing browser instead of launching one.
    #[serde(default)]
    pub remote_url: Option<String>,
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            engine: BrowserEngineType::default(),
            headless: default_headless(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            user_agent: default_user_agent(),
            locale: default_locale(),
            accept_language: default_accept_language(),
            timezone: None,
            proxy: None,
            timeout: default_timeout(),
            chrome_args: Vec::new(),
            chrome_path: None,
            remote_url: None,
        }
    }
}

pub fn default_headless() -> bool {
    true
}

fn default_window_width() -> u32 {
    1920
}

fn default_window_height() -> u32 {
    1080
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_locale() -> String {
    "en-US".to_string()
}

fn default_accept_language() -> String {
    "en-US,en;q=0.9".to_string()
}

pub fn default_timeout() -> u64 {
    30
}

/// Browser engine types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BrowserEngineType {
    /// Chromium with stealth patches (default).
    #[default]
    Stealth,

    /// No stealth patches (for debugging).
    Standard,
}

/// Page loading behaviour (`[page]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLoadConfig {
    /// Fixed wait after the document is ready, for client-side rendering.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Scroll to the bottom and back to trigger lazy-loaded content.
    #[serde(default = "default_scroll")]
    pub scroll: bool,

    #[serde(default = "default_scroll_pause_ms")]
    pub scroll_pause_ms: u64,

    /// Upper bound on waiting for the page's ready locators.
    #[serde(default = "default_locate_timeout_secs")]
    pub locate_timeout_secs: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Visible text that marks an error or block page (case-insensitive).
    /// Such a load fails and is retried.
    #[serde(default = "default_error_markers")]
    pub error_markers: Vec<String>,

    /// A page with less visible text than this failed to render.
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,
}

impl PageLoadConfig {
    /// Why `html` looks like an error page rather than a product page.
    pub fn page_problem(&self, html: &str) -> Option<String> {
        let doc = Html::parse_document(html);
        let root = doc.root_element();
        let body = root.select(&BODY).next().unwrap_or(root);
        let text = visible_text(body);

        let lower = text.to_lowercase();
        if let Some(marker) = self
            .error_markers
            .iter()
            .find(|m| !m.is_empty() && lower.contains(&m.to_lowercase()))
        {
            return Some(format!("error page ({})", marker));
        }

        let chars = text.chars().filter(|c| !c.is_whitespace()).count();
        if chars < self.min_text_chars {
            return Some(format!("page has only {} characters of text", chars));
        }
        None
    }
}

impl Default for PageLoadConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            scroll: default_scroll(),
            scroll_pause_ms: default_scroll_pause_ms(),
            locate_timeout_secs: default_locate_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            error_markers: default_error_markers(),
            min_text_chars: default_min_text_chars(),
        }
    }
}

fn default_settle_delay_ms() -> u64 {
    5000
}

fn default_scroll() -> bool {
    true
}

fn default_scroll_pause_ms() -> u64 {
    2000
}

fn default_locate_timeout_secs() -> u64 {
    10
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_error_markers() -> Vec<String> {
    [
        "Access Denied",
        "Request blocked",
        "404 Not Found",
        "Page not found",
        "Internal Server Error",
        "Service Unavailable",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_min_text_chars() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT: &str = r#"<html><body>
        <h1>Deep Groove Ball Bearings</h1>
        <p>Part number 6200ZZ, inner diameter 10 mm, outer diameter 30 mm, width 9 mm.
           Price 150,000 VND. Ships same day.</p>
        <script>var status = "404 Not Found";</script>
        </body></html>"#;

    #[test]
    fn product_page_passes() {
        assert_eq!(PageLoadConfig::default().page_problem(PRODUCT), None);
    }

    #[test]
    fn error_markers_fail_the_load() {
        let html = format!(
            "<html><body><h1>500 - Internal server error</h1><p>{}</p></body></html>",
            "Please try again later. ".repeat(10)
        );
        let problem = PageLoadConfig::default().page_problem(&html).unwrap();
        assert!(problem.contains("Internal Server Error"), "{}", problem);
    }

    #[test]
    fn near_empty_page_fails_the_load() {
        let problem = PageLoadConfig::default()
            .page_problem("<html><body><div id=\"app\"></div></body></html>")
            .unwrap();
        assert_eq!(problem, "page has only 0 characters of text");

        let lenient = PageLoadConfig {
            min_text_chars: 0,
            ..Default::default()
        };
        assert_eq!(lenient.page_problem("<html><body></body></html>"), None);
    }
}

//! Scrape pipeline error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The browser session could not be started. Fatal for the run.
    #[error("Session initialization failed: {0}")]
    SessionInit(String),
    #[error("Failed to load {url}: {reason}")]
    Navigation { url: String, reason: String },
    /// The page loaded but shows an error or block page instead of content.
    #[error("Unusable page at {url}: {reason}")]
    ErrorPage { url: String, reason: String },
    #[error("Timed out after {secs}s waiting for {what}")]
    Timeout { what: String, secs: u64 },
    #[error("Browser error: {0}")]
    Browser(String),
    #[error("Input error: {0}")]
    Input(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),
}

impl ScrapeError {
    /// Whether the run must stop instead of skipping the current page.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScrapeError::SessionInit(_) | ScrapeError::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

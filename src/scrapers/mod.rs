//! Page loading and extraction.
//!
//! - `browser`: Chromium session and page loader
//! - `source`: the page source seam (live browser or saved snapshots)
//! - `locator`: ordered fallback locator chains
//! - `extract`: field extraction from located elements and page text
//! - `pipeline`: per-page extraction and the run loop

pub mod browser;
pub mod config;
pub mod extract;
pub mod locator;
pub mod pipeline;
pub mod source;

pub use browser::{BrowserEngineConfig, BrowserEngineType, BrowserSession, PageLoadConfig};
pub use config::{ListingProfile, SiteProfile};
pub use locator::{LocatorChain, LocatorSpec};
pub use pipeline::{Pipeline, RunOptions, RunReport};
pub use source::{PageSource, SnapshotSource};

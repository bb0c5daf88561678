//! partscout - bearing catalog scraper.
//!
//! Loads product pages in a browser session, locates the part-number and
//! specification tables through ordered fallback locator chains, extracts
//! one record per part, and writes the merged table to CSV and XLSX.

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod input;
pub mod listing;
pub mod models;
pub mod scrapers;
pub mod utils;

pub use error::{Result, ScrapeError};

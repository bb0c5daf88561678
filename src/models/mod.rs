//! Data models for scraped bearing parts.

mod page;
mod part;

pub use page::{ChainTrace, ExtractionMode, PageExtraction};
pub use part::{Field, PartRecord, PAGE_URL_COLUMN};

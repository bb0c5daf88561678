//! Shared utility functions.
//!
//! - `text`: whitespace normalization and rendered-text extraction
//! - `url`: URL resolution and query helpers

mod text;
mod url;

pub use text::{char_window, clean_text, element_text, visible_text};
pub use url::{resolve_url, with_query_param};

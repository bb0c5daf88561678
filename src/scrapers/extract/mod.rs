//! Field extraction from located page elements.
//!
//! - `structured`: header-mapped (or positional) table rows
//! - `context`: regexes over a text window around each part number
//! - `specs`: product-level label/value attributes
//! - `fields`: header keyword rules and value checks
//! - `part_number`: part-number recognition

pub mod context;
pub mod fields;
pub mod part_number;
pub mod specs;
pub mod structured;

pub use context::{json_ld_price, ContextConfig, ContextExtractor};
pub use fields::{FieldMapping, FieldRule, ValueCheck};
pub use part_number::{option_values, PartNumberConfig, PartNumberFilter};
pub use specs::{
    product_specs, SpecLocators, CATALOG_IMAGE_COLUMN, DESCRIPTION_COLUMN, DRAWING_IMAGE_COLUMN,
    PRODUCT_IMAGE_COLUMN, PRODUCT_NAME_COLUMN,
};
pub use structured::{merge_by_row, Grid, TableLayout};

//! Part records extracted from bearing product pages.
//!
//! A record is a fixed set of optional text fields keyed by part number.
//! Values are kept as text exactly as the page shows them; numeric fields
//! are only sanity-checked, never converted.

use serde::{Deserialize, Serialize};

/// A data field of a part record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    PartNumber,
    Price,
    DaysToShip,
    MinimumOrderQty,
    InnerDiaD,
    OuterDiaD,
    WidthB,
    BasicLoadRatingCr,
    BasicLoadRatingCor,
    Weight,
}

impl Field {
    /// All fields in canonical output order.
    pub const ALL: [Field; 10] = [
        Field::PartNumber,
        Field::Price,
        Field::DaysToShip,
        Field::MinimumOrderQty,
        Field::InnerDiaD,
        Field::OuterDiaD,
        Field::WidthB,
        Field::BasicLoadRatingCr,
        Field::BasicLoadRatingCor,
        Field::Weight,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            Self::PartNumber => "part_number",
            Self::Price => "price",
            Self::DaysToShip => "days_to_ship",
            Self::MinimumOrderQty => "minimum_order_qty",
            Self::InnerDiaD => "inner_dia_d",
            Self::OuterDiaD => "outer_dia_d",
            Self::WidthB => "width_b",
            Self::BasicLoadRatingCr => "basic_load_rating_cr",
            Self::BasicLoadRatingCor => "basic_load_rating_cor",
            Self::Weight => "weight",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let key = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL.into_iter().find(|f| f.column() == key)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

/// Column name for the page the record came from.
pub const PAGE_URL_COLUMN: &str = "page_url";

/// One bearing part as found on a product page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartRecord {
    pub part_number: Option<String>,
    pub price: Option<String>,
    pub days_to_ship: Option<String>,
    pub minimum_order_qty: Option<String>,
    pub inner_dia_d: Option<String>,
    pub outer_dia_d: Option<String>,
    pub width_b: Option<String>,
    pub basic_load_rating_cr: Option<String>,
    pub basic_load_rating_cor: Option<String>,
    pub weight: Option<String>,
    /// Page the record was extracted from.
    pub page_url: String,
}

impl PartRecord {
    pub fn new(page_url: impl Into<String>) -> Self {
        Self {
            page_url: page_url.into(),
            ..Default::default()
        }
    }

    fn slot(&self, field: Field) -> &Option<String> {
        match field {
            Field::PartNumber => &self.part_number,
            Field::Price => &self.price,
            Field::DaysToShip => &self.days_to_ship,
            Field::MinimumOrderQty => &self.minimum_order_qty,
            Field::InnerDiaD => &self.inner_dia_d,
            Field::OuterDiaD => &self.outer_dia_d,
            Field::WidthB => &self.width_b,
            Field::BasicLoadRatingCr => &self.basic_load_rating_cr,
            Field::BasicLoadRatingCor => &self.basic_load_rating_cor,
            Field::Weight => &self.weight,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::PartNumber => &mut self.part_number,
            Field::Price => &mut self.price,
            Field::DaysToShip => &mut self.days_to_ship,
            Field::MinimumOrderQty => &mut self.minimum_order_qty,
            Field::InnerDiaD => &mut self.inner_dia_d,
            Field::OuterDiaD => &mut self.outer_dia_d,
            Field::WidthB => &mut self.width_b,
            Field::BasicLoadRatingCr => &mut self.basic_load_rating_cr,
            Field::BasicLoadRatingCor => &mut self.basic_load_rating_cor,
            Field::Weight => &mut self.weight,
        }
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.slot(field).as_deref()
    }

    /// Set a field unless it already holds a value. Returns true if set.
    ///
    /// Blank values are ignored so a later candidate can still fill the field.
    pub fn set_if_empty(&mut self, field: Field, value: impl Into<String>) -> bool {
        let value = value.into();
        let value = value.trim();
        if value.is_empty() {
            return false;
        }
        let slot = self.slot_mut(field);
        if slot.is_some() {
            return false;
        }
        *slot = Some(value.to_string());
        true
    }

    /// Fill every empty field of `self` from `other`.
    pub fn merge_missing(&mut self, other: &PartRecord) {
        for field in Field::ALL {
            if let Some(value) = other.get(field) {
                self.set_if_empty(field, value);
            }
        }
    }

    /// True when nothing beyond the part number and provenance was found.
    pub fn is_blank(&self) -> bool {
        Field::ALL
            .iter()
            .filter(|f| **f != Field::PartNumber)
            .all(|f| self.get(*f).is_none())
    }

    /// Populated fields as ordered `(column, value)` pairs, plus `page_url`.
    pub fn columns(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = Field::ALL
            .iter()
            .filter_map(|f| self.get(*f).map(|v| (f.column().to_string(), v.to_string())))
            .collect();
        out.push((PAGE_URL_COLUMN.to_string(), self.page_url.clone()));
        out
    }

    /// Canonical column order for output tables.
    pub fn canonical_columns() -> Vec<String> {
        Field::ALL
            .iter()
            .map(|f| f.column().to_string())
            .chain(std::iter::once(PAGE_URL_COLUMN.to_string()))
            .collect()
    }
}

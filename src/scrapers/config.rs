//! Site markup profile.
//!
//! Every selector the pipeline uses lives here as an ordered locator chain,
//! so a new site release means editing the config file instead of code.
//! Defaults describe the current catalog markup, newest class names first.

use serde::{Deserialize, Serialize};

use crate::models::Field;

use super::locator::LocatorSpec;

/// Locator chains for product pages (`[site]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteProfile {
    /// Any match means the product page has rendered its part data.
    #[serde(default = "default_ready")]
    pub ready: Vec<LocatorSpec>,
    #[serde(default = "default_part_table")]
    pub part_table: Vec<LocatorSpec>,
    #[serde(default = "default_part_rows")]
    pub part_rows: Vec<LocatorSpec>,
    /// Specification table shown next to the part-number table.
    #[serde(default = "default_spec_table")]
    pub spec_table: Vec<LocatorSpec>,
    #[serde(default = "default_spec_rows")]
    pub spec_rows: Vec<LocatorSpec>,
    #[serde(default = "default_cells")]
    pub cells: Vec<LocatorSpec>,
    /// Options of the part-number dropdown.
    #[serde(default = "default_dropdown_options")]
    pub dropdown_options: Vec<LocatorSpec>,
    #[serde(default = "default_product_name")]
    pub product_name: Vec<LocatorSpec>,
    #[serde(default = "default_spec_labels")]
    pub spec_labels: Vec<LocatorSpec>,
    #[serde(default = "default_spec_values")]
    pub spec_values: Vec<LocatorSpec>,
    /// Main product photo; strategies read `src`.
    #[serde(default = "default_product_image")]
    pub product_image: Vec<LocatorSpec>,
    #[serde(default = "default_drawing_image")]
    pub drawing_image: Vec<LocatorSpec>,
    /// Catalog page image, present once the catalog tab has rendered.
    #[serde(default = "default_catalog_image")]
    pub catalog_image: Vec<LocatorSpec>,
    #[serde(default = "default_description")]
    pub description: Vec<LocatorSpec>,
    /// Field per column for header-less spec rows; "" skips a column.
    #[serde(default = "default_positional_columns")]
    pub positional_columns: Vec<String>,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            ready: default_ready(),
            part_table: default_part_table(),
            part_rows: default_part_rows(),
            spec_table: default_spec_table(),
            spec_rows: default_spec_rows(),
            cells: default_cells(),
            dropdown_options: default_dropdown_options(),
            product_name: default_product_name(),
            spec_labels: default_spec_labels(),
            spec_values: default_spec_values(),
            product_image: default_product_image(),
            drawing_image: default_drawing_image(),
            catalog_image: default_catalog_image(),
            description: default_description(),
            positional_columns: default_positional_columns(),
        }
    }
}

impl SiteProfile {
    /// Resolved positional columns. Unknown names are reported back.
    pub fn positional_fields(&self) -> (Vec<Option<Field>>, Vec<String>) {
        let mut unknown = Vec::new();
        let fields = self
            .positional_columns
            .iter()
            .map(|name| {
                if name.trim().is_empty() {
                    return None;
                }
                let field = Field::from_str(name);
                if field.is_none() {
                    unknown.push(name.clone());
                }
                field
            })
            .collect();
        (fields, unknown)
    }
}

fn default_ready() -> Vec<LocatorSpec> {
    vec![
        LocatorSpec::class_contains("PartNumberColumn_table"),
        LocatorSpec::class_contains("PartNumberAsideColumns_table"),
        LocatorSpec::id("partNumberListTable"),
        LocatorSpec::class_contains("PartNumberDropDownList_partNumberOption"),
    ]
}

fn default_part_table() -> Vec<LocatorSpec> {
    vec![
        LocatorSpec::class("PartNumberColumn_tableBase__DK2Le"),
        LocatorSpec::class("PartNumberAsideColumns_table__6fKVE"),
        LocatorSpec::path(r#"//*[@id="partNumberListTable"]/div/div[2]/table"#),
        LocatorSpec::class_contains("PartNumberColumn_table"),
        LocatorSpec::css("table[class*='table']"),
        LocatorSpec::tag("table"),
    ]
}

fn default_part_rows() -> Vec<LocatorSpec> {
    vec![
        LocatorSpec::css("tbody tr.PartNumberColumn_dataRow__DK2Le"),
        LocatorSpec::css("tbody tr.PartNumberAsideColumns_dataRow__OUw8N"),
        LocatorSpec::css("tr[class*='dataRow']"),
        LocatorSpec::css("tbody tr"),
        LocatorSpec::tag("tr"),
    ]
}

fn default_spec_table() -> Vec<LocatorSpec> {
    vec![
        LocatorSpec::class_contains("PartNumberSpecColumns_table"),
        LocatorSpec::class_contains("SpecColumns_table"),
    ]
}

fn default_spec_rows() -> Vec<LocatorSpec> {
    vec![
        LocatorSpec::class_contains("PartNumberSpecColumns_dataRow"),
        LocatorSpec::css("tbody tr"),
        LocatorSpec::tag("tr"),
    ]
}

fn default_cells() -> Vec<LocatorSpec> {
    vec![
        LocatorSpec::css("td, th"),
        LocatorSpec::class_contains("Cells_data"),
    ]
}

fn default_dropdown_options() -> Vec<LocatorSpec> {
    vec![
        LocatorSpec::class("PartNumberDropDownList_partNumberOption__KnDz0"),
        LocatorSpec::class_contains("partNumberOption"),
        LocatorSpec::css("#codeList option"),
    ]
}

fn default_product_name() -> Vec<LocatorSpec> {
    vec![
        LocatorSpec::path(r#"//*[@id="heading-description"]/div"#),
        LocatorSpec::css("h1"),
    ]
}

fn default_spec_labels() -> Vec<LocatorSpec> {
    vec![
        LocatorSpec::class("SpecTable_specLabel__5D8Cy"),
        LocatorSpec::class_contains("specLabel"),
    ]
}

fn default_spec_values() -> Vec<LocatorSpec> {
    vec![
        LocatorSpec::class("SpecTable_specValue__5D8Cy"),
        LocatorSpec::class_contains("specValue"),
    ]
}

fn default_product_image() -> Vec<LocatorSpec> {
    vec![
        LocatorSpec::path(r#"//*[@id="actionsPanel"]/div[1]/div/img"#).with_attr("src"),
        LocatorSpec::css("#actionsPanel img").with_attr("src"),
        LocatorSpec::css("[class*='mainImage'] img").with_attr("src"),
    ]
}

fn default_drawing_image() -> Vec<LocatorSpec> {
    vec![
        LocatorSpec::path(
            "/html/body/div[1]/div[2]/div/div/div/div[3]/div[2]/div[3]/div[2]/div/div[1]/div/div[4]/img[1]",
        )
        .with_attr("src"),
        LocatorSpec::css("[class*='dimensionalDrawing'] img").with_attr("src"),
        LocatorSpec::css("img[alt*='Dimensional']").with_attr("src"),
    ]
}

fn default_catalog_image() -> Vec<LocatorSpec> {
    vec![
        LocatorSpec::css("div.catalogContainer.CatalogViewer_container__wzYZ8 img").with_attr("src"),
        LocatorSpec::css("[class*='CatalogViewer_container'] img").with_attr("src"),
    ]
}

fn default_description() -> Vec<LocatorSpec> {
    vec![
        LocatorSpec::class("style_simple_detail__Tzjyy"),
        LocatorSpec::class_contains("simple_detail"),
    ]
}

fn default_positional_columns() -> Vec<String> {
    [
        "minimum_order_qty",
        "",
        "inner_dia_d",
        "outer_dia_d",
        "width_b",
        "basic_load_rating_cr",
        "basic_load_rating_cor",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Locator chains for category listing pages (`[listing]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingProfile {
    /// Links to product series pages.
    #[serde(default = "default_listing_links")]
    pub links: Vec<LocatorSpec>,
    /// Lead-time badge, searched in the link's ancestors.
    #[serde(default = "default_listing_lead_time")]
    pub lead_time: Vec<LocatorSpec>,
    /// Tooltip holding the full product name.
    #[serde(default = "default_listing_name")]
    pub name: Vec<LocatorSpec>,
    #[serde(default = "default_same_day")]
    pub same_day: String,
    /// How many ancestors of a link to search for its lead time.
    #[serde(default = "default_max_ancestors")]
    pub max_ancestors: usize,
}

impl Default for ListingProfile {
    fn default() -> Self {
        Self {
            links: default_listing_links(),
            lead_time: default_listing_lead_time(),
            name: default_listing_name(),
            same_day: default_same_day(),
            max_ancestors: default_max_ancestors(),
        }
    }
}

fn default_listing_links() -> Vec<LocatorSpec> {
    vec![
        LocatorSpec::css("a.PhotoItem_seriesNameLink__9PQQh"),
        LocatorSpec::css("a[class*='seriesNameLink']"),
    ]
}

fn default_listing_lead_time() -> Vec<LocatorSpec> {
    vec![
        LocatorSpec::class("PriceLeadTime_leadTime__airE7"),
        LocatorSpec::class_contains("leadTime"),
    ]
}

fn default_listing_name() -> Vec<LocatorSpec> {
    vec![
        LocatorSpec::class("PhotoItem_tooltips__Zif27"),
        LocatorSpec::class_contains("tooltips"),
    ]
}

fn default_same_day() -> String {
    "same day".to_string()
}

fn default_max_ancestors() -> usize {
    6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_columns_resolve_to_fields() {
        let profile = SiteProfile::default();
        let (fields, unknown) = profile.positional_fields();
        assert!(unknown.is_empty());
        assert_eq!(fields[0], Some(Field::MinimumOrderQty));
        assert_eq!(fields[1], None);
        assert_eq!(fields[6], Some(Field::BasicLoadRatingCor));
    }

    #[test]
    fn unknown_positional_columns_are_reported() {
        let profile = SiteProfile {
            positional_columns: vec!["width_b".into(), "speed".into()],
            ..Default::default()
        };
        let (fields, unknown) = profile.positional_fields();
        assert_eq!(fields, vec![Some(Field::WidthB), None]);
        assert_eq!(unknown, vec!["speed"]);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let profile: SiteProfile = toml::from_str(
            r#"
            part_table = [{ by = "css", value = "table.parts" }]
            "#,
        )
        .unwrap();
        assert_eq!(profile.part_table, vec![LocatorSpec::css("table.parts")]);
        assert_eq!(profile.cells, default_cells());
    }
}

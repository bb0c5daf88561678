//! Product-level attributes shared by every part on a page.

use scraper::ElementRef;

use crate::models::ChainTrace;
use crate::scrapers::locator::LocatorChain;
use crate::utils::{element_text, resolve_url};

/// Column name used for the product name.
pub const PRODUCT_NAME_COLUMN: &str = "product_name";
pub const PRODUCT_IMAGE_COLUMN: &str = "product_image_url";
pub const DRAWING_IMAGE_COLUMN: &str = "dimensional_drawing";
pub const CATALOG_IMAGE_COLUMN: &str = "catalog_image";
pub const DESCRIPTION_COLUMN: &str = "description";

/// Chains for the product name, single-valued attributes (images,
/// description) and the label/value spec table.
#[derive(Debug, Clone, Copy)]
pub struct SpecLocators<'a> {
    pub name: &'a LocatorChain,
    /// Output column and chain, in column order.
    pub attributes: &'a [(&'static str, LocatorChain)],
    pub labels: &'a LocatorChain,
    pub values: &'a LocatorChain,
}

/// Label/value pairs: product name first, then the attributes that were
/// found, then the spec table. Attribute values read from `src`/`href` are
/// resolved against `page_url`. Labels are zipped with values by position;
/// a label without a value gets an empty string and blank labels are
/// dropped. Repeated labels keep their first value.
pub fn product_specs(
    scope: ElementRef<'_>,
    page_url: &str,
    locators: &SpecLocators<'_>,
    trace: &mut Vec<ChainTrace>,
) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();

    let name = locators.name.locate(scope);
    trace.push(name.trace(locators.name.name()));
    if let Some(el) = name.first() {
        let text = element_text(el);
        if !text.is_empty() {
            out.push((PRODUCT_NAME_COLUMN.to_string(), text));
        }
    }

    for (column, chain) in locators.attributes {
        let located = chain.locate(scope);
        trace.push(located.trace(chain.name()));
        let Some(value) = chain.value_of(&located) else {
            continue;
        };
        let value = if chain.reads_attr(&located) {
            resolve_url(page_url, &value)
        } else {
            value
        };
        out.push((column.to_string(), value));
    }

    let labels = locators.labels.locate(scope);
    trace.push(labels.trace(locators.labels.name()));
    if !labels.is_found() {
        return out;
    }
    let values = locators.values.locate(scope);
    trace.push(values.trace(locators.values.name()));

    for (i, label) in labels.elements.iter().enumerate() {
        let label = element_text(*label);
        if label.is_empty() || out.iter().any(|(k, _)| *k == label) {
            continue;
        }
        let value = values
            .elements
            .get(i)
            .map(|v| element_text(*v))
            .unwrap_or_default();
        out.push((label, value));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::locator::LocatorSpec;
    use scraper::Html;

    struct Chains {
        name: LocatorChain,
        attributes: Vec<(&'static str, LocatorChain)>,
        labels: LocatorChain,
        values: LocatorChain,
    }

    impl Chains {
        fn locators(&self) -> SpecLocators<'_> {
            SpecLocators {
                name: &self.name,
                attributes: &self.attributes,
                labels: &self.labels,
                values: &self.values,
            }
        }
    }

    fn chains() -> Chains {
        Chains {
            name: LocatorChain::from_specs("product_name", &[LocatorSpec::path("//*[@id=\"heading-description\"]/div"), LocatorSpec::tag("h1")]),
            attributes: vec![
                (
                    PRODUCT_IMAGE_COLUMN,
                    LocatorChain::from_specs("product_image", &[LocatorSpec::css("#actionsPanel img").with_attr("src")]),
                ),
                (
                    DESCRIPTION_COLUMN,
                    LocatorChain::from_specs("description", &[LocatorSpec::class_contains("simple_detail")]),
                ),
            ],
            labels: LocatorChain::from_specs("spec_labels", &[LocatorSpec::class_contains("specLabel")]),
            values: LocatorChain::from_specs("spec_values", &[LocatorSpec::class_contains("specValue")]),
        }
    }

    #[test]
    fn pairs_labels_with_values() {
        let doc = Html::parse_document(
            r#"<h1>Deep Groove Ball Bearings</h1>
               <table>
                 <tr><th class="SpecTable_specLabel__5D8Cy">Material</th><td class="SpecTable_specValue__5D8Cy">Steel</td></tr>
                 <tr><th class="SpecTable_specLabel__5D8Cy">Seal</th><td class="SpecTable_specValue__5D8Cy">Shielded</td></tr>
                 <tr><th class="SpecTable_specLabel__5D8Cy">Weight</th></tr>
               </table>"#,
        );
        let c = chains();
        let mut trace = Vec::new();
        let specs = product_specs(doc.root_element(), "https://x.test/p", &c.locators(), &mut trace);
        assert_eq!(
            specs,
            vec![
                ("product_name".to_string(), "Deep Groove Ball Bearings".to_string()),
                ("Material".to_string(), "Steel".to_string()),
                ("Seal".to_string(), "Shielded".to_string()),
                ("Weight".to_string(), String::new()),
            ]
        );
        assert_eq!(trace.len(), 5);
        assert_eq!(trace[0].matched.as_deref(), Some("tag=h1"));
    }

    #[test]
    fn no_spec_table_gives_only_name() {
        let doc = Html::parse_document("<div id=\"heading-description\"><div>Bearing 6200</div></div>");
        let c = chains();
        let mut trace = Vec::new();
        let specs = product_specs(doc.root_element(), "https://x.test/p", &c.locators(), &mut trace);
        assert_eq!(specs, vec![("product_name".to_string(), "Bearing 6200".to_string())]);
        assert_eq!(trace.len(), 4);
    }

    #[test]
    fn image_sources_are_resolved_against_the_page() {
        let doc = Html::parse_document(
            r#"<h1>Bearing 6200</h1>
               <div id="actionsPanel"><div><div><img src="/images/6200.jpg"></div></div></div>
               <div class="style_simple_detail__Tzjyy">  Shielded deep groove
                 ball bearing </div>"#,
        );
        let c = chains();
        let mut trace = Vec::new();
        let specs = product_specs(
            doc.root_element(),
            "https://vn.misumi-ec.com/vona2/detail/110300114710/",
            &c.locators(),
            &mut trace,
        );
        assert_eq!(
            specs,
            vec![
                ("product_name".to_string(), "Bearing 6200".to_string()),
                (
                    "product_image_url".to_string(),
                    "https://vn.misumi-ec.com/images/6200.jpg".to_string()
                ),
                ("description".to_string(), "Shielded deep groove ball bearing".to_string()),
            ]
        );
    }
}

//! Same-day product collector for saved category listing pages.
//!
//! Each series link on a listing page sits in a card that also shows the
//! lead time. Cards whose lead time reads "same day" are collected as
//! `(name, url)` rows, the URL list that `scrape` takes as input.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use scraper::{ElementRef, Html};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::scrapers::{ListingProfile, LocatorChain};
use crate::utils::{clean_text, element_text, resolve_url};

/// Output column headers.
pub const LISTING_HEADERS: [&str; 2] = ["Name", "Product URL"];

/// One same-day product.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListingItem {
    pub name: String,
    pub url: String,
}

/// Compiled listing profile.
pub struct ListingCollector {
    links: LocatorChain,
    lead_time: LocatorChain,
    name: LocatorChain,
    same_day: String,
    max_ancestors: usize,
    base_url: String,
}

impl ListingCollector {
    pub fn new(profile: &ListingProfile, base_url: &str) -> Self {
        Self {
            links: LocatorChain::from_specs("listing_links", &profile.links),
            lead_time: LocatorChain::from_specs("listing_lead_time", &profile.lead_time),
            name: LocatorChain::from_specs("listing_name", &profile.name),
            same_day: profile.same_day.to_lowercase(),
            max_ancestors: profile.max_ancestors,
            base_url: base_url.to_string(),
        }
    }

    /// Same-day items on one listing page, in document order.
    pub fn parse(&self, html: &str) -> Vec<ListingItem> {
        let doc = Html::parse_document(html);
        let links = self.links.locate_in(&doc);
        debug!("{} series links", links.elements.len());

        let mut items = Vec::new();
        for link in &links.elements {
            let container = self.card_of(*link).or_else(|| link.parent().and_then(ElementRef::wrap));
            let Some(container) = container else {
                continue;
            };

            let lead = self
                .lead_time
                .locate(container)
                .first()
                .map(labelled_text)
                .unwrap_or_default();
            if !lead.to_lowercase().contains(&self.same_day) {
                continue;
            }

            let name = self
                .name
                .locate(container)
                .first()
                .map(labelled_text)
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| labelled_text(*link));
            let url = link
                .value()
                .attr("href")
                .map(|href| resolve_url(&self.base_url, href))
                .unwrap_or_default();

            if name.is_empty() && url.is_empty() {
                continue;
            }
            items.push(ListingItem { name, url });
        }
        items
    }

    /// Nearest element, starting at the link itself, that contains a lead
    /// time badge.
    fn card_of<'a>(&self, link: ElementRef<'a>) -> Option<ElementRef<'a>> {
        std::iter::once(link)
            .chain(link.ancestors().filter_map(ElementRef::wrap))
            .take(self.max_ancestors)
            .find(|el| self.lead_time.locate(*el).is_found())
    }

    /// Items from every file, de-duplicated on `(name, url)` across files.
    /// Unreadable files are logged and skipped.
    pub fn collect(&self, files: &[PathBuf]) -> Vec<ListingItem> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for (i, path) in files.iter().enumerate() {
            info!("Processing {}/{}: {}", i + 1, files.len(), path.display());
            let bytes = match std::fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            let html = String::from_utf8_lossy(&bytes);
            for item in self.parse(&html) {
                if seen.insert(item.clone()) {
                    out.push(item);
                }
            }
        }
        out
    }
}

/// Text of an element, or its `title` when it has no text.
fn labelled_text(el: ElementRef<'_>) -> String {
    let text = element_text(el);
    if !text.is_empty() {
        return text;
    }
    el.value().attr("title").map(clean_text).unwrap_or_default()
}

/// `.html`/`.htm` files in `dir`, sorted by name, at most `limit`.
pub fn listing_files(dir: &Path, limit: Option<usize>) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    if let Some(limit) = limit {
        files.truncate(limit);
    }
    Ok(files)
}

/// Write items as CSV (UTF-8 with BOM). The header row is written even
/// when there are no items.
pub fn write_listing(items: &[ListingItem], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(path)?;
    file.write_all(b"\xEF\xBB\xBF")?;
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(LISTING_HEADERS)?;
    for item in items {
        writer.write_record([item.name.as_str(), item.url.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
          <div class="PhotoItem_item">
            <div class="PhotoItem_name">
              <a class="PhotoItem_seriesNameLink__9PQQh" href="/vona2/detail/A1/">Bearing A</a>
              <span class="PhotoItem_tooltips__Zif27">Deep Groove Ball Bearing A</span>
            </div>
            <div class="PriceLeadTime_leadTime__airE7">Same day</div>
          </div>
          <div class="PhotoItem_item">
            <a class="PhotoItem_seriesNameLink__9PQQh" href="/vona2/detail/B2/">Bearing B</a>
            <div class="PriceLeadTime_leadTime__airE7">5 days</div>
          </div>
          <div class="PhotoItem_item">
            <a class="PhotoItem_seriesNameLink__9PQQh" href="https://other.test/C3">Bearing C</a>
            <div class="PriceLeadTime_leadTime__airE7">Ships same day</div>
          </div>
        </body></html>
    "#;

    fn collector() -> ListingCollector {
        ListingCollector::new(&ListingProfile::default(), "https://vn.misumi-ec.com")
    }

    #[test]
    fn keeps_only_same_day_cards() {
        let items = collector().parse(LISTING);
        assert_eq!(
            items,
            vec![
                ListingItem {
                    name: "Deep Groove Ball Bearing A".to_string(),
                    url: "https://vn.misumi-ec.com/vona2/detail/A1/".to_string(),
                },
                ListingItem {
                    name: "Bearing C".to_string(),
                    url: "https://other.test/C3".to_string(),
                },
            ]
        );
    }

    #[test]
    fn collects_sorted_files_and_dedupes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.html"), LISTING).unwrap();
        std::fs::write(dir.path().join("a.htm"), LISTING).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let files = listing_files(dir.path(), None).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.htm"));
        assert_eq!(listing_files(dir.path(), Some(1)).unwrap().len(), 1);

        let items = collector().collect(&files);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn empty_listing_still_has_headers() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("same_day.csv");
        write_listing(&[], &out).unwrap();
        let text = std::fs::read_to_string(&out).unwrap();
        assert_eq!(text.trim_start_matches('\u{feff}'), "Name,Product URL\n");
    }
}

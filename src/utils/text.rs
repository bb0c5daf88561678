//! Text helpers for scraped HTML.

use scraper::{ElementRef, Node};

/// Collapse runs of whitespace (including non-breaking spaces) to one space.
pub fn clean_text(s: &str) -> String {
    s.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text content of an element, whitespace-normalized.
pub fn element_text(el: ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<Vec<_>>().join(" "))
}

/// Rendered-ish text of an element: text nodes outside `script`, `style`,
/// `noscript` and `template`, one normalized line per text node.
pub fn visible_text(el: ElementRef<'_>) -> String {
    let mut lines = Vec::new();
    for node in el.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().filter_map(ElementRef::wrap).any(|a| {
            matches!(a.value().name(), "script" | "style" | "noscript" | "template")
        });
        if hidden {
            continue;
        }
        let line = clean_text(text);
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines.join("\n")
}

/// Up to `radius` characters either side of the byte range `start..end`.
///
/// Works in characters, so multi-byte text (`₫`, Vietnamese) never splits.
pub fn char_window(text: &str, start: usize, end: usize, radius: usize) -> &str {
    let from = text[..start]
        .char_indices()
        .rev()
        .take(radius)
        .last()
        .map_or(start, |(i, _)| i);
    let to = text[end..]
        .char_indices()
        .nth(radius)
        .map_or(text.len(), |(i, _)| end + i);
    &text[from..to]
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  6200ZZ \n\t (10\u{a0}mm) "), "6200ZZ (10 mm)");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn visible_text_skips_scripts() {
        let doc = Html::parse_document(
            r#"<body><p>Price <b>150,000 VND</b></p><script>var x = "6999ZZ";</script><style>p{}</style></body>"#,
        );
        let text = visible_text(doc.root_element());
        assert_eq!(text, "Price\n150,000 VND");
    }

    #[test]
    fn window_is_char_based() {
        let text = "₫₫₫ 6200ZZ ₫₫₫";
        let start = text.find("6200ZZ").unwrap();
        let end = start + "6200ZZ".len();
        assert_eq!(char_window(text, start, end, 2), "₫ 6200ZZ ₫");
        assert_eq!(char_window(text, start, end, 100), text);
    }
}

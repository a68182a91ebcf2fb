//! Link recovery from rich-text (HTML) clipboard payloads.

use std::collections::HashSet;

use scraper::{Html, Selector};

/// Absolute `http(s)` anchor targets in document order, first occurrence only.
pub(crate) fn extract_hrefs(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let link_sel = Selector::parse("a[href]").expect("anchor selector");

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for el in doc.select(&link_sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if !is_web_link(href) {
            continue;
        }
        if seen.insert(href.to_string()) {
            links.push(href.to_string());
        }
    }

    links
}

/// The document's text nodes joined by spaces (script and style excluded).
pub(crate) fn visible_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let body_sel = Selector::parse("body").expect("body selector");

    let root = doc.select(&body_sel).next().unwrap_or(doc.root_element());
    root.descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let parent_is_code = node
                .parent()
                .and_then(|p| p.value().as_element().map(|e| e.name()))
                .is_some_and(|name| name == "script" || name == "style");
            (!parent_is_code).then(|| text.to_string())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_web_link(href: &str) -> bool {
    let lower = href.get(..8).unwrap_or(href).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

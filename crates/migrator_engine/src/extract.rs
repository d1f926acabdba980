use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Plain-text rendition of an HTML fragment.
///
/// - every `<p>` becomes one line of space-joined text, paragraphs separated by
///   a blank line
/// - without paragraphs, all text in the fragment is space-joined
/// - non-breaking spaces become ordinary spaces.
pub fn extract_plain_text(html: &str) -> String {
    let doc = Html::parse_fragment(html);
    let paragraph_sel = Selector::parse("p").ok();

    let paragraphs: Vec<String> = paragraph_sel
        .as_ref()
        .map(|sel| doc.select(sel).map(joined_text).collect())
        .unwrap_or_default();

    let text = if paragraphs.is_empty() {
        joined_text(doc.root_element())
    } else {
        paragraphs.join("\n\n")
    };
    text.replace('\u{a0}', " ")
}

/// Text pieces of `element`, each trimmed, empties dropped, joined by one space.
fn joined_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remote image URLs referenced by `<img src>` in document order.
///
/// Only `http`/`https` sources are returned; embedded `data:` images and
/// scheme-less references have nothing to download.
pub fn collect_image_sources(html: &str) -> Vec<String> {
    let doc = Html::parse_fragment(html);
    let Ok(img_sel) = Selector::parse("img[src]") else {
        return Vec::new();
    };
    doc.select(&img_sel)
        .filter_map(|img| img.value().attr("src"))
        .map(str::trim)
        .filter(|src| !src.is_empty() && !src.to_ascii_lowercase().starts_with("data:"))
        .filter(|src| {
            Url::parse(src)
                .map(|url| matches!(url.scheme(), "http" | "https"))
                .unwrap_or(false)
        })
        .map(ToOwned::to_owned)
        .collect()
}

use unicode_normalization::UnicodeNormalization;

/// URL-safe identifier: decomposed, ASCII only, lowercase, words joined by `-`.
///
/// Total over any input; the result only contains `[a-z0-9-]` and never starts
/// or ends with a hyphen. Empty input yields an empty slug.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_separator = false;
    for c in text.nfkd().filter(char::is_ascii) {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_ascii_whitespace() || c == '\x0b' || c == '_' || c == '-' {
            pending_separator = true;
        }
        // Any other ASCII punctuation is dropped without separating words.
    }
    slug
}

/// Slug variant for heading anchors: a leading run of digits is dropped so
/// numbered headings do not produce numeral-prefixed anchors.
pub fn slugify_heading(text: &str) -> String {
    let slug = slugify(text);
    slug.trim_start_matches(|c: char| c.is_ascii_digit())
        .trim_start_matches('-')
        .to_string()
}

use sha2::{Digest, Sha256};
use url::{ParseError, Url};

use crate::slug::slugify;

/// Folder name for a row's media: `slugify(title)`, or `untitled-row-{index}`
/// when the title is missing or slugifies to nothing.
pub fn storage_folder_name(title: Option<&str>, index: usize) -> String {
    let slug = title.map(slugify).unwrap_or_default();
    if slug.is_empty() {
        format!("untitled-row-{index}")
    } else {
        slug
    }
}

/// Path component of a URL reference, as written in a document.
///
/// Absolute URLs are parsed; scheme-less references keep everything before the
/// query or fragment. Returns `None` for unparseable references.
pub fn reference_path(reference: &str) -> Option<String> {
    let trimmed = reference.trim();
    match Url::parse(trimmed) {
        Ok(url) => Some(url.path().to_string()),
        Err(ParseError::RelativeUrlWithoutBase) if trimmed.starts_with("//") => {
            // Protocol-relative: the host is not part of the path.
            let base = Url::parse("http://localhost/").ok()?;
            base.join(trimmed).ok().map(|url| url.path().to_string())
        }
        Err(ParseError::RelativeUrlWithoutBase) => {
            let end = trimmed.find(['?', '#']).unwrap_or(trimmed.len());
            Some(trimmed[..end].to_string())
        }
        Err(_) => None,
    }
}

/// Final path segment of an image reference, used as the local filename.
///
/// `data:` URIs and other opaque references have no filename.
pub fn media_filename(reference: &str) -> Option<String> {
    let trimmed = reference.trim();
    if let Ok(url) = Url::parse(trimmed) {
        if url.cannot_be_a_base() {
            return None;
        }
    }
    let path = reference_path(trimmed)?;
    let name = path.rsplit('/').next().unwrap_or_default();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Deterministic stand-in name for URLs without a usable final segment.
pub fn fallback_media_filename(url: &str) -> String {
    format!("media-{}.jpg", short_hash(url))
}

fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}

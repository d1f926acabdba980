use encoding_rs::WINDOWS_1252;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("text could not be normalized: {0}")]
    Failed(String),
}

/// Text-to-text cleanup applied to every field. Callers fall back to the input
/// when normalization fails.
pub trait TextNormalizer: Send + Sync {
    fn normalize(&self, text: &str) -> Result<String, NormalizeError>;
}

/// Repairs UTF-8 text that was decoded as Windows-1252, then composes to NFC.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnicodeCleanup;

impl TextNormalizer for UnicodeCleanup {
    fn normalize(&self, text: &str) -> Result<String, NormalizeError> {
        let repaired = repair_mojibake(text).unwrap_or_else(|| text.to_string());
        Ok(repaired.nfc().collect())
    }
}

/// Characters that show up when UTF-8 multi-byte sequences are read as Windows-1252.
const MOJIBAKE_MARKERS: &[char] = &['Ã', 'Â', 'â', '€', '™', 'œ', '�', 'Å', 'Ä'];

fn marker_count(text: &str) -> usize {
    text.chars().filter(|c| MOJIBAKE_MARKERS.contains(c)).count()
}

/// Undo one round of UTF-8-as-Windows-1252 decoding when that clearly helps.
fn repair_mojibake(text: &str) -> Option<String> {
    let before = marker_count(text);
    if before == 0 {
        return None;
    }
    let (bytes, _, unmappable) = WINDOWS_1252.encode(text);
    if unmappable {
        return None;
    }
    let candidate = std::str::from_utf8(&bytes).ok()?;
    if marker_count(candidate) < before {
        Some(candidate.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{TextNormalizer, UnicodeCleanup};

    #[test]
    fn repairs_double_encoded_punctuation() {
        let fixed = UnicodeCleanup.normalize("It\u{e2}\u{20ac}\u{2122}s caf\u{c3}\u{a9} time").unwrap();
        assert_eq!(fixed, "It\u{2019}s caf\u{e9} time");
    }

    #[test]
    fn composes_decomposed_accents() {
        let fixed = UnicodeCleanup.normalize("cafe\u{301}").unwrap();
        assert_eq!(fixed, "caf\u{e9}");
    }

    #[test]
    fn leaves_clean_text_alone() {
        let text = "Plain text with Ärger and € prices";
        assert_eq!(UnicodeCleanup.normalize(text).unwrap(), text);
    }
}

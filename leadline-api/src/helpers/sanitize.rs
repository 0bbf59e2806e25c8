use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Makes a string safe for a file name component.
///
/// Diacritics are dropped ("Lefèvre" -> "Lefevre"), whitespace and separators
/// become a single `-`, any other non-alphanumeric character is removed, and
/// the result is cut to `max_len` characters. Returns `None` when nothing
/// usable is left.
pub fn file_component(raw: &str, max_len: usize) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut pending_dash = false;

    for c in raw.nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else if c.is_whitespace() || matches!(c, '-' | '_' | '.' | '/' | '\\') {
            pending_dash = true;
        }
    }

    let truncated: String = out.chars().take(max_len).collect();
    let truncated = truncated.trim_end_matches('-').to_string();
    if truncated.is_empty() {
        None
    } else {
        Some(truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_diacritics() {
        assert_eq!(
            file_component("Boulangerie Lefèvre", 40).as_deref(),
            Some("Boulangerie-Lefevre")
        );
        assert_eq!(file_component("Zoé Ñúñez", 40).as_deref(), Some("Zoe-Nunez"));
    }

    #[test]
    fn test_drops_punctuation_and_collapses_separators() {
        assert_eq!(
            file_component("  Acme & Sons, Inc. -- (EU) ", 40).as_deref(),
            Some("Acme-Sons-Inc-EU")
        );
        assert_eq!(file_component("+33 (0)6 12", 40).as_deref(), Some("33-06-12"));
    }

    #[test]
    fn test_truncates_without_trailing_dash() {
        assert_eq!(file_component("Appointment taken", 12).as_deref(), Some("Appointment"));
        assert_eq!(file_component("abcdefgh", 3).as_deref(), Some("abc"));
    }

    #[test]
    fn test_empty_results() {
        assert_eq!(file_component("", 10), None);
        assert_eq!(file_component("!!! ???", 10), None);
        assert_eq!(file_component("北京", 10), None);
    }
}

//! Body preview extraction.

/// Maximum preview length, in characters.
pub const PREVIEW_MAX_CHARS: usize = 300;

/// First 300 characters of the body with newlines collapsed to spaces.
///
/// Counted in characters, not bytes, so multi-byte content never splits.
/// No ellipsis is added.
pub fn extract_preview(body: &str) -> String {
    body.chars()
        .take(PREVIEW_MAX_CHARS)
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_body_passes_through() {
        assert_eq!(extract_preview("Hello world"), "Hello world");
    }

    #[test]
    fn newlines_become_spaces() {
        assert_eq!(extract_preview("line one\nline two\nline three"), "line one line two line three");
    }

    #[test]
    fn long_body_truncates_to_300_chars() {
        let body = "x".repeat(1000);
        let preview = extract_preview(&body);
        assert_eq!(preview.chars().count(), 300);
        assert_eq!(preview, "x".repeat(300));
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        let body = "é".repeat(400);
        let preview = extract_preview(&body);
        assert_eq!(preview.chars().count(), 300);
    }

    #[test]
    fn newline_at_boundary_still_replaced() {
        let mut body = "y".repeat(299);
        body.push('\n');
        body.push_str("trailing");
        let preview = extract_preview(&body);
        assert_eq!(preview.len(), 300);
        assert!(preview.ends_with(' '));
    }

    #[test]
    fn empty_body_yields_empty_preview() {
        assert_eq!(extract_preview(""), "");
    }
}

//! RFC822-style header block parsing.

use std::collections::HashMap;

/// Parse a raw header block into a map of lowercased field name to the
/// values seen for that field, in order of appearance.
///
/// Folded continuation lines (leading space or tab) are joined to the
/// preceding value with a single space. Lines without a colon, and
/// continuations with no preceding field, are ignored — malformed input
/// degrades to partial results, it never errors.
pub fn parse_headers(raw: &str) -> HashMap<String, Vec<String>> {
    let mut fields: HashMap<String, Vec<String>> = HashMap::new();
    // Name of the last field seen, for folding continuations onto.
    let mut current: Option<String> = None;

    for line in raw.lines() {
        if line.is_empty() {
            current = None;
            continue;
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(name) = &current
                && let Some(values) = fields.get_mut(name)
                && let Some(last) = values.last_mut()
            {
                last.push(' ');
                last.push_str(line.trim());
            }
            continue;
        }
        match line.split_once(':') {
            Some((name, value)) => {
                let name = name.trim().to_ascii_lowercase();
                fields
                    .entry(name.clone())
                    .or_default()
                    .push(value.trim().to_string());
                current = Some(name);
            }
            None => current = None,
        }
    }

    fields
}

/// First value for a field, if present.
pub fn first_value<'a>(fields: &'a HashMap<String, Vec<String>>, name: &str) -> Option<&'a str> {
    fields.get(name).and_then(|v| v.first()).map(String::as_str)
}

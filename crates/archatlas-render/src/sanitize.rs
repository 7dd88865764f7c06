//! Diagram identifier sanitization

/// Map any string to a valid Mermaid node id: every character outside
/// `[A-Za-z0-9_]` becomes `_`. No truncation.
pub fn sanitize_id(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

//! Utility helpers shared across the chat engine.

/// Truncate a string to a maximum length, adding an ellipsis if truncated
#[must_use]
pub fn truncate_with_ellipsis(s: &str, max_len: usize, ellipsis: &str) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let truncate_at = max_len.saturating_sub(ellipsis.len());
        let mut end = truncate_at;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}{}", &s[..end], ellipsis)
    }
}

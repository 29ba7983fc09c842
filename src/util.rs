// src/util.rs — Small string helpers for prompts and log lines

/// Longest prefix of `s` within `max_len` bytes that ends on a char boundary.
pub fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let end = (0..=max_len)
        .rev()
        .find(|&i| s.is_char_boundary(i))
        .unwrap_or(0);
    &s[..end]
}

/// One-line preview of oracle text for log fields. Whitespace runs collapse
/// to a single space; cut previews end in `...`.
pub fn preview(s: &str, max_len: usize) -> String {
    let flat = s.split_whitespace().collect::<Vec<_>>().join(" ");
    let cut = truncate_str(&flat, max_len);
    if cut.len() < flat.len() {
        format!("{}...", cut)
    } else {
        flat
    }
}

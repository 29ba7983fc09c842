// src/core/tokens.rs — Local usage estimation

/// Rough token estimate (4 chars ~= 1 token).
/// Uses character count instead of byte length to avoid overestimating
/// for multi-byte characters (CJK, emoji, etc.).
pub fn estimate_tokens(text: &str) -> u32 {
    (text.chars().count() as f32 / 4.0).ceil() as u32
}

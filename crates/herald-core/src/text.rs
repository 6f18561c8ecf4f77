//! Text helpers.

/// Truncate `s` to at most `max_bytes` bytes without splitting a UTF-8
/// character. Message bodies are full of emoji, so byte slicing is unsafe.
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Mask all but the last four characters of a recipient identifier for logs.
pub fn mask_recipient(recipient: &str) -> String {
    let count = recipient.chars().count();
    if count <= 4 {
        return recipient.to_owned();
    }
    let visible: String = recipient.chars().skip(count - 4).collect();
    format!("{}{visible}", "*".repeat(count - 4))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! Small string helpers shared by the stream decoder, the client and the views

/// Glyph used to mask secret input
pub const MASK_CHAR: char = '•';

/// Truncate a string to at most `max_bytes` bytes, ensuring the cut lands on a
/// valid UTF-8 char boundary. Returns the longest prefix that fits.
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

/// Like [`truncate_str`], but marks the cut with an ellipsis
pub fn ellipsize(s: &str, max_bytes: usize) -> String {
    let cut = truncate_str(s, max_bytes);
    if cut.len() == s.len() {
        s.to_string()
    } else {
        format!("{}…", cut)
    }
}

/// Break `text` into rows of at most `max_width` display columns. Rows may
/// split anywhere, including inside words; a character wider than the row
/// still gets a row of its own.
pub fn wrap_anywhere(text: &str, max_width: usize) -> Vec<String> {
    use unicode_width::UnicodeWidthChar;

    let max_width = max_width.max(1);
    let mut rows = Vec::new();
    let mut row = String::new();
    let mut row_width = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if row_width + w > max_width && !row.is_empty() {
            rows.push(std::mem::take(&mut row));
            row_width = 0;
        }
        row.push(c);
        row_width += w;
    }
    if !row.is_empty() || rows.is_empty() {
        rows.push(row);
    }
    rows
}

/// Masked rendition of a secret with `len` characters
pub fn mask(len: usize) -> String {
    std::iter::repeat_n(MASK_CHAR, len).collect()
}

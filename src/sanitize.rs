//! Whitespace normalization for text runs.
//!
//! Sanitization is total: every input string has a defined output.

/// Collapse inline whitespace the way inline HTML text is rendered.
///
/// Runs of whitespace become a single space. A single leading or trailing
/// space survives so adjacent inline runs keep their word separation. Runs
/// that contain nothing but whitespace collapse to the empty string.
pub fn sanitize_inline(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut prev_space = false;
    let mut has_content = false;
    for ch in text.chars() {
        if ch.is_ascii_whitespace() {
            if !prev_space {
                result.push(' ');
                prev_space = true;
            }
        } else {
            result.push(ch);
            prev_space = false;
            has_content = true;
        }
    }
    if !has_content {
        result.clear();
    }
    result
}

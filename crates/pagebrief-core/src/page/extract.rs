/// Minimum share of the length budget a sentence end must fall into for the
/// truncation to cut there instead of at the hard limit.
const SENTENCE_CUT_THRESHOLD: f64 = 0.8;

/// Convert HTML content to readable plain text
pub fn extract_text(html: &str) -> String {
    let text = html2text::from_read(html.as_bytes(), 80).unwrap_or_else(|_| html.to_string());
    collapse_whitespace(&text)
}

/// Collapse runs of whitespace and newlines into single spaces
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for chunk in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(chunk);
    }
    out
}

fn truncate_chars(input: &str, max_chars: usize) -> &str {
    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => &input[..idx],
        None => input,
    }
}

/// Truncate text to at most `max_chars` characters, preferring to end on a
/// sentence boundary when one falls close enough to the limit.
pub fn truncate_text(text: &str, max_chars: usize) -> &str {
    let truncated = truncate_chars(text, max_chars);
    if truncated.len() == text.len() {
        return text;
    }

    let last_sentence_end = truncated
        .rfind(['.', '!', '?'])
        .unwrap_or(0);

    let threshold = (truncated.len() as f64 * SENTENCE_CUT_THRESHOLD) as usize;
    if last_sentence_end > 0 && last_sentence_end >= threshold {
        // Terminators are ASCII, so the +1 stays on a char boundary.
        &truncated[..last_sentence_end + 1]
    } else {
        truncated
    }
}

//! Text utilities: token estimation, UTF-8-safe truncation, and markdown
//! flattening for the quote/voice-sample formatter (§4.6).

/// Rough token estimate: ~0.25 tokens per character, floored at 1 for any
/// non-empty string. Good enough for quota accounting (§4.4.1) without
/// depending on a real tokenizer.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    ((text.chars().count() as f64) * 0.25).ceil().max(1.0) as usize
}

/// Truncate `text` to at most `budget` estimated tokens, preferring a
/// sentence boundary, falling back to a word boundary, falling back to a
/// raw (but UTF-8-safe) char boundary.
pub fn truncate_to_token_budget(text: &str, budget: usize) -> String {
    if estimate_tokens(text) <= budget {
        return text.to_string();
    }
    let max_chars = ((budget as f64) / 0.25).floor() as usize;
    let truncated = safe_truncate(text, max_chars);

    if let Some(idx) = last_sentence_boundary(&truncated) {
        if idx > 0 {
            return truncated[..idx].to_string();
        }
    }
    if let Some(idx) = truncated.rfind(char::is_whitespace) {
        if idx > 0 {
            return truncated[..idx].trim_end().to_string();
        }
    }
    truncated
}

fn last_sentence_boundary(text: &str) -> Option<usize> {
    text.char_indices()
        .filter(|(_, c)| matches!(c, '.' | '!' | '?'))
        .map(|(i, c)| i + c.len_utf8())
        .last()
}

/// Truncate to at most `max_chars` characters without splitting a UTF-8
/// code point.
pub fn safe_truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Remove markdown bold/italic/code/link syntax and collapse whitespace —
/// used by `formatAsQuote` (§4.6) to flatten quote and voice-sample bodies.
pub fn flatten_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' | '_' | '`' => {
                i += 1;
            }
            '[' => {
                // [label](url) -> label
                if let Some(close) = chars[i..].iter().position(|&c| c == ']') {
                    let label_start = i + 1;
                    let label_end = i + close;
                    if chars.get(label_end + 1) == Some(&'(') {
                        if let Some(paren_close) =
                            chars[label_end + 1..].iter().position(|&c| c == ')')
                        {
                            out.extend(&chars[label_start..label_end]);
                            i = label_end + 1 + paren_close + 1;
                            continue;
                        }
                    }
                    out.push('[');
                    i += 1;
                } else {
                    out.push('[');
                    i += 1;
                }
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_tokens_is_proportional_to_length() {
        assert_eq!(estimate_tokens(""), 0);
        assert!(estimate_tokens("a") >= 1);
        assert!(estimate_tokens("a".repeat(100).as_str()) > estimate_tokens("a"));
    }

    #[test]
    fn truncate_respects_budget_and_utf8_boundaries() {
        let text = "héllo wörld. ".repeat(20);
        let truncated = truncate_to_token_budget(&text, 10);
        assert!(estimate_tokens(&truncated) <= 12); // allow small slack from boundary snapping
        assert!(String::from_utf8(truncated.into_bytes()).is_ok());
    }

    #[test]
    fn truncate_is_noop_under_budget() {
        let text = "short text";
        assert_eq!(truncate_to_token_budget(text, 1000), text);
    }

    #[test]
    fn flatten_markdown_strips_emphasis_and_links() {
        let input = "**bold** and _italic_ and `code` and [a link](http://x)";
        let flat = flatten_markdown(input);
        assert_eq!(flat, "bold and italic and code and a link");
    }

    #[test]
    fn flatten_markdown_collapses_whitespace() {
        assert_eq!(flatten_markdown("a   b\n\nc"), "a b c");
    }
}

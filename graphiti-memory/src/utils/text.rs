//! Text processing utilities shared by search and logging.

use regex::Regex;
use std::sync::OnceLock;

static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

fn whitespace_re() -> &'static Regex {
    WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("static regex is valid"))
}

/// Collapse runs of whitespace (spaces, tabs, newlines) into a single space
/// and trim the ends. Whitespace-only input yields an empty string.
pub fn normalize_whitespace(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    whitespace_re().replace_all(s, " ").trim().to_string()
}

/// Truncate `s` to at most `max_len` characters, appending `"..."` when
/// truncation occurred. Counts Unicode scalar values rather than bytes, so
/// multi-byte content (emoji, CJK) is never split mid-character.
///
/// `max_len == 0` yields an empty string; `max_len <= 3` yields up to
/// `max_len` dots.
pub fn truncate_with_ellipsis(s: &str, max_len: usize) -> String {
    if max_len == 0 {
        return String::new();
    }
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return ".".repeat(max_len);
    }

    let keep = max_len - 3;
    let end = s
        .char_indices()
        .nth(keep)
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    format!("{}...", &s[..end])
}

/// Extract the first JSON object or array from a possibly markdown-wrapped
/// LLM response.
///
/// Tries a ```` ```json ```` fence, then a bare ```` ``` ```` fence, then the
/// outermost `{...}` or `[...]` span. Returns `None` when nothing JSON-like
/// is present.
pub fn extract_json_from_response(s: &str) -> Option<&str> {
    if let Some(body) = fenced_block_body(s, "```json") {
        return Some(body);
    }
    if let Some(body) = fenced_block_body(s, "```") {
        return Some(body);
    }

    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (s.find(open), s.rfind(close)) {
            if end > start {
                return Some(&s[start..=end]);
            }
        }
    }

    None
}

/// Content of the first fenced code block opened by `fence`, trimmed.
fn fenced_block_body<'a>(s: &'a str, fence: &str) -> Option<&'a str> {
    let open = s.find(fence)? + fence.len();
    let first_line_end = s[open..].find('\n')?;
    let body_start = open + first_line_end + 1;
    let body_len = s[body_start..].find("```")?;
    let body = s[body_start..body_start + body_len].trim();
    if body.is_empty() {
        None
    } else {
        Some(body)
    }
}

/// Escape Lucene query syntax so user text is safe inside a full-text
/// index query.
///
/// Escapes `+ - ! ( ) { } [ ] ^ " ~ * ? : \ /` plus the two-character
/// operators `&&` and `||`.
pub fn lucene_sanitize(s: &str) -> String {
    const SPECIAL: &[char] = &[
        '+', '-', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\', '/',
    ];

    let mut out = String::with_capacity(s.len() * 2);
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '&' if chars.peek() == Some(&'&') => {
                chars.next();
                out.push_str("\\&&");
            }
            '|' if chars.peek() == Some(&'|') => {
                chars.next();
                out.push_str("\\||");
            }
            c if SPECIAL.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

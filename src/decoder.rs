//! Tolerant decoding of JSON-shaped LLM output.
//!
//! Models are asked for strict JSON but routinely wrap it in prose or
//! Markdown fences, use single quotes, leave trailing commas, or emit
//! JavaScript literals. Rejecting such output would drop a commit from the
//! pipeline, so this module applies a fixed pipeline of idempotent textual
//! transforms, attempting a strict parse after each stage, and only fails
//! once a final salvage pass over the largest balanced object also parses to
//! nothing.
//!
//! Every transform walks the text with a string-literal-aware scanner so that
//! content which intentionally contains the rewritten patterns (a summary
//! mentioning `//` or `NaN`, say) is never corrupted.

use crate::errors::{ChronicleError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decode arbitrary text into a JSON value, tolerating common LLM noise.
pub fn decode(raw: &str) -> Result<Value> {
    let mut last_transform = "strict";
    let mut text = raw.trim().to_string();

    if let Ok(value) = serde_json::from_str::<Value>(&text) {
        return Ok(value);
    }

    // Ordering is load-bearing: each stage assumes the rewrites before it.
    let stages: &[(&'static str, fn(&str) -> String)] = &[
        ("extract", extract_enclosed),
        ("strip-comments", strip_comments),
        ("bare-tokens", replace_bare_tokens),
        ("trailing-commas", remove_trailing_commas),
        ("single-quotes", convert_single_quotes),
        ("quote-keys", quote_unquoted_keys),
    ];

    for (name, transform) in stages {
        last_transform = name;
        text = transform(&text);
        if let Ok(value) = serde_json::from_str::<Value>(&text) {
            return Ok(value);
        }
    }

    // Salvage pass: largest balanced {...} or [...] substring.
    last_transform = "salvage";
    if let Some(candidate) = largest_balanced(&text) {
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            return Ok(value);
        }
    }

    Err(ChronicleError::Parse {
        input_len: raw.len(),
        last_transform,
    })
}

/// Decode and deserialize into a typed response shape.
///
/// A parse failure is a [`ChronicleError::Parse`]; a shape mismatch after a
/// successful parse is a validation failure.
pub fn decode_as<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let value = decode(raw)?;
    serde_json::from_value(value)
        .map_err(|e| ChronicleError::validation("response", e.to_string()))
}

/// Minimal scanner state shared by all transforms.
///
/// Tracks whether the cursor sits inside a single- or double-quoted string
/// literal and handles backslash escapes. Single quotes count as strings even
/// before the `single-quotes` stage rewrites them, so earlier stages do not
/// rewrite content inside them.
#[derive(Default, Clone, Copy)]
struct ScanState {
    in_double: bool,
    in_single: bool,
    escaped: bool,
}

impl ScanState {
    fn in_string(self) -> bool {
        self.in_double || self.in_single
    }

    /// Advance over one character, returning the state that applied *before*
    /// the character was consumed.
    fn step(&mut self, c: char) -> ScanState {
        let before = *self;
        if self.escaped {
            self.escaped = false;
        } else {
            match c {
                '\\' if self.in_string() => self.escaped = true,
                '"' if !self.in_single => self.in_double = !self.in_double,
                '\'' if !self.in_double => self.in_single = !self.in_single,
                _ => {}
            }
        }
        before
    }
}

/// Strip surrounding prose and Markdown fences by extracting from the first
/// `{` or `[` to its matched closing delimiter.
fn extract_enclosed(text: &str) -> String {
    let Some(start) = text.find(['{', '[']) else {
        return text.to_string();
    };

    let mut state = ScanState::default();
    let mut depth = 0usize;
    for (i, c) in text[start..].char_indices() {
        let before = state.step(c);
        if before.in_string() {
            continue;
        }
        match c {
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return text[start..start + i + c.len_utf8()].to_string();
                }
            }
            _ => {}
        }
    }
    // Unbalanced; keep the tail and let later stages or salvage try.
    text[start..].to_string()
}

/// Remove `//` line comments and `/* */` block comments outside strings.
fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut state = ScanState::default();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if !state.in_string() && c == '/' && i + 1 < chars.len() {
            match chars[i + 1] {
                '/' => {
                    while i < chars.len() && chars[i] != '\n' {
                        i += 1;
                    }
                    continue;
                }
                '*' => {
                    i += 2;
                    while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == '/') {
                        i += 1;
                    }
                    i = (i + 2).min(chars.len());
                    continue;
                }
                _ => {}
            }
        }
        state.step(c);
        out.push(c);
        i += 1;
    }
    out
}

/// Replace the bare tokens `undefined` and `NaN` with `null` and `Infinity`
/// with a large finite sentinel, outside strings only.
fn replace_bare_tokens(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut state = ScanState::default();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if !state.in_string() && (c.is_ascii_alphabetic() || c == '_') {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            match word.as_str() {
                "undefined" | "NaN" => out.push_str("null"),
                "Infinity" => out.push_str("1e308"),
                _ => out.push_str(&word),
            }
            continue;
        }
        state.step(c);
        out.push(c);
        i += 1;
    }
    out
}

/// Drop commas that directly precede a closing `}` or `]`.
fn remove_trailing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut state = ScanState::default();
    let chars: Vec<char> = text.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        let before = state.step(c);
        if c == ',' && !before.in_string() {
            let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if matches!(next, Some('}' | ']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Rewrite single-quoted string literals as double-quoted ones, escaping any
/// embedded double quotes.
fn convert_single_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut state = ScanState::default();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' && !state.in_double && !state.escaped {
            out.push('"');
            i += 1;
            while i < chars.len() {
                match chars[i] {
                    '\\' if i + 1 < chars.len() => {
                        // \' needs no escape inside double quotes
                        if chars[i + 1] == '\'' {
                            out.push('\'');
                        } else {
                            out.push('\\');
                            out.push(chars[i + 1]);
                        }
                        i += 2;
                    }
                    '\'' => {
                        i += 1;
                        break;
                    }
                    '"' => {
                        out.push_str("\\\"");
                        i += 1;
                    }
                    other => {
                        out.push(other);
                        i += 1;
                    }
                }
            }
            out.push('"');
            continue;
        }
        state.step(c);
        out.push(c);
        i += 1;
    }
    out
}

/// Quote bare object keys matching the identifier pattern.
fn quote_unquoted_keys(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut state = ScanState::default();
    let chars: Vec<char> = text.chars().collect();
    let mut prev_significant = ' ';
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if !state.in_string()
            && (c.is_ascii_alphabetic() || c == '_' || c == '$')
            && matches!(prev_significant, '{' | ',')
        {
            let start = i;
            while i < chars.len()
                && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '$')
            {
                i += 1;
            }
            let mut j = i;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            let word: String = chars[start..i].iter().collect();
            if chars.get(j) == Some(&':') {
                out.push('"');
                out.push_str(&word);
                out.push('"');
                prev_significant = '"';
            } else {
                out.push_str(&word);
                if let Some(last) = word.chars().last() {
                    prev_significant = last;
                }
            }
            continue;
        }
        let before = state.step(c);
        if !c.is_whitespace() && !before.in_string() {
            prev_significant = c;
        }
        out.push(c);
        i += 1;
    }
    out
}

/// Largest balanced `{...}` or `[...]` substring, if any.
fn largest_balanced(text: &str) -> Option<&str> {
    let mut best: Option<(usize, usize)> = None;
    let open_positions: Vec<usize> = text
        .char_indices()
        .filter(|(_, c)| *c == '{' || *c == '[')
        .map(|(i, _)| i)
        .collect();

    for &start in &open_positions {
        if let Some(end) = matched_close(text, start) {
            let len = end - start;
            if best.is_none_or(|(s, e)| len > e - s) {
                best = Some((start, end));
            }
        }
    }
    best.map(|(s, e)| &text[s..e])
}

/// Byte offset one past the delimiter matching the opener at `start`.
fn matched_close(text: &str, start: usize) -> Option<usize> {
    let mut state = ScanState::default();
    let mut depth = 0usize;
    for (i, c) in text[start..].char_indices() {
        let before = state.step(c);
        if before.in_string() {
            continue;
        }
        match c {
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strict_json_passes_through() {
        let value = decode(r#"{"changes":[],"trivial":true}"#).expect("decode");
        assert_eq!(value, json!({"changes": [], "trivial": true}));
    }

    #[test]
    fn test_fenced_json_with_prose() {
        let raw = "Here is the analysis you asked for:\n```json\n{\"trivial\": false}\n```\nLet me know!";
        let value = decode(raw).expect("decode");
        assert_eq!(value, json!({"trivial": false}));
    }

    #[test]
    fn test_comments_removed() {
        let raw = "{\n  // the main change\n  \"summary\": \"add x\" /* inline */\n}";
        let value = decode(raw).expect("decode");
        assert_eq!(value, json!({"summary": "add x"}));
    }

    #[test]
    fn test_comment_markers_inside_strings_survive() {
        let raw = r#"{"summary": "see https://example.com // not a comment"}"#;
        let value = decode(raw).expect("decode");
        assert_eq!(
            value["summary"],
            "see https://example.com // not a comment"
        );
    }

    #[test]
    fn test_bare_tokens() {
        let value = decode(r#"{"a": undefined, "b": NaN, "c": Infinity, "d": -Infinity}"#)
            .expect("decode");
        assert_eq!(value["a"], Value::Null);
        assert_eq!(value["b"], Value::Null);
        assert_eq!(value["c"], json!(1e308));
        assert_eq!(value["d"], json!(-1e308));
    }

    #[test]
    fn test_bare_token_words_inside_strings_survive() {
        let value = decode(r#"{"summary": "handle NaN in parser"}"#).expect("decode");
        assert_eq!(value["summary"], "handle NaN in parser");
    }

    #[test]
    fn test_trailing_commas() {
        let value = decode(r#"{"list": [1, 2, 3,], "x": 1,}"#).expect("decode");
        assert_eq!(value["list"], json!([1, 2, 3]));
    }

    #[test]
    fn test_single_quotes_and_unquoted_keys() {
        // The fenced shape from a chatty model, all noise classes at once
        let raw = "```json\n{'changes':[{summary:'x', category:'Fixed'},],}\n```";
        let value = decode(raw).expect("decode");
        assert_eq!(
            value,
            json!({"changes": [{"summary": "x", "category": "Fixed"}]})
        );
    }

    #[test]
    fn test_single_quoted_string_with_embedded_double_quote() {
        let value = decode(r#"{'summary': 'rename "old" to new'}"#).expect("decode");
        assert_eq!(value["summary"], r#"rename "old" to new"#);
    }

    #[test]
    fn test_salvage_extracts_largest_balanced_object() {
        // The first opener never closes, so only salvage can recover the
        // balanced object further in.
        let raw = "stuff { broken [ juicy { \"ok\": true } tail";
        let value = decode(raw).expect("decode");
        assert_eq!(value, json!({"ok": true}));
    }

    #[test]
    fn test_failure_reports_length_and_transform() {
        let err = decode("no json here at all").expect_err("should fail");
        match err {
            ChronicleError::Parse {
                input_len,
                last_transform,
            } => {
                assert_eq!(input_len, 19);
                assert_eq!(last_transform, "salvage");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_total_over_weird_inputs() {
        // Never panics, whatever comes in
        for raw in ["", "{", "}", "]['", "\u{0}\u{1}{", "'''", "\\\\\\", "{{{{[[[["] {
            let _ = decode(raw);
        }
    }

    #[test]
    fn test_decode_as_typed() {
        use crate::types::CommitAnalysisResponse;
        let raw = "```json\n{'changes':[{summary:'x', category:'Fixed'},], trivial: false}\n```";
        let parsed: CommitAnalysisResponse = decode_as(raw).expect("decode_as");
        assert_eq!(parsed.changes.len(), 1);
        assert_eq!(parsed.changes[0].category, "Fixed");
    }
}

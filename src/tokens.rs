//! Control token extraction
//!
//! Game script text carries escape sequences that the message window
//! interprets instead of drawing: `\c[2]` switches colour, `\i[64]` draws an
//! icon, `\>` and `\<` toggle instant display, `\{` and `\}` change the font
//! size. The grammar is a backslash, exactly one character and an optional
//! bracketed argument:
//!
//! ```text
//! \s*(\\.(?:\[[^\]]+\])?)\s*
//! ```
//!
//! Whitespace around a token is part of the match span so that restoring a
//! token after translation also restores the spacing the author wrote.

use regex::Regex;
use std::sync::LazyLock;

pub(crate) static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*(\\.(?:\[[^\]]+\])?)\s*").expect("control token regex should compile")
});

/// A control token located in a string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlToken {
    /// Byte offset where the match (including leading whitespace) starts
    pub start: usize,
    /// Byte offset where the match (including trailing whitespace) ends
    pub end: usize,
    /// Byte offset of the token proper
    pub token_start: usize,
    /// Byte offset just past the token proper
    pub token_end: usize,
    /// The token literal, e.g. `\c[2]`
    pub text: String,
    /// The whole match, surrounding whitespace included
    pub matched: String,
}

/// Find all control tokens in `text`, ordered by position
///
/// Matches never overlap. Text without tokens yields an empty vector.
///
/// # Example
/// ```ignore
/// let tokens = extract_tokens("Hi \\c[2]Bob\\c[0]!");
/// assert_eq!(tokens.len(), 2);
/// assert_eq!(tokens[0].text, "\\c[2]");
/// assert_eq!(tokens[0].matched, " \\c[2]");
/// ```
pub fn extract_tokens(text: &str) -> Vec<ControlToken> {
    TOKEN_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let token = caps.get(1)?;
            Some(ControlToken {
                start: whole.start(),
                end: whole.end(),
                token_start: token.start(),
                token_end: token.end(),
                text: token.as_str().to_string(),
                matched: whole.as_str().to_string(),
            })
        })
        .collect()
}

/// The ordered token literals of `text`, without surrounding whitespace
pub fn token_texts(text: &str) -> Vec<String> {
    extract_tokens(text).into_iter().map(|t| t.text).collect()
}

/// Remove every token proper from `text`
///
/// The whitespace the token match consumed around the token is kept, since
/// it is rendered.
pub fn strip_tokens(text: &str) -> String {
    let mut clean = String::with_capacity(text.len());
    let mut offset = 0;
    for caps in TOKEN_RE.captures_iter(text) {
        if let Some(token) = caps.get(1) {
            clean.push_str(&text[offset..token.start()]);
            offset = token.end();
        }
    }
    clean.push_str(&text[offset..]);
    clean
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_tokens() {
        assert!(extract_tokens("Just some prose.").is_empty());
        assert!(extract_tokens("").is_empty());
    }

    #[test]
    fn test_token_with_argument() {
        let tokens = extract_tokens("Take \\i[64] this");
        assert_eq!(tokens.len(), 1);
        let token = &tokens[0];
        assert_eq!(token.text, "\\i[64]");
        assert_eq!(token.matched, " \\i[64] ");
        assert_eq!(token.start, 4);
        assert_eq!(token.token_start, 5);
        assert_eq!(token.token_end, 11);
        assert_eq!(token.end, 12);
    }

    #[test]
    fn test_adjacent_tokens_do_not_overlap() {
        let tokens = extract_tokens("\\>\\i[5]\\}John\\{\\<");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["\\>", "\\i[5]", "\\}", "\\{", "\\<"]);
        for pair in tokens.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
    }

    #[test]
    fn test_whitespace_is_consumed_once() {
        let tokens = extract_tokens("a \\c[1] \\c[2] b");
        assert_eq!(tokens[0].matched, " \\c[1] ");
        assert_eq!(tokens[1].matched, "\\c[2] ");
    }

    #[test]
    fn test_token_texts() {
        assert_eq!(
            token_texts("\\c[2]Red\\c[0] and \\V[12]"),
            vec!["\\c[2]", "\\c[0]", "\\V[12]"]
        );
    }

    #[test]
    fn test_strip_tokens_keeps_spacing() {
        assert_eq!(strip_tokens("Hi \\c[2]Bob\\c[0]!"), "Hi Bob!");
        assert_eq!(strip_tokens("a \\. b"), "a  b");
        assert_eq!(strip_tokens("plain"), "plain");
    }

    #[test]
    fn test_unicode_offsets() {
        let text = "Привет \\c[3]мир";
        let tokens = extract_tokens(text);
        assert_eq!(tokens.len(), 1);
        assert_eq!(&text[tokens[0].token_start..tokens[0].token_end], "\\c[3]");
    }
}

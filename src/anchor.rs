/// Marker system for protecting control tokens during machine translation
///
/// Markers are numbered stand-ins that replace control tokens before the text is sent to the
/// machine translation system. The translator only ever sees prose plus markers, so it cannot
/// translate, split or reorder the control syntax itself.
///
/// Format: `\k[{index}]` where index is the 1-based position of the token in the source text.
/// Examples: `\k[1]`, `\k[2]`, `\k[3]`, etc.
///
/// Translators like to pad or split the marker (`\ k [2]`, `\k[ 2 ]`), so markers are located
/// in translated text with a tolerant pattern that also swallows surrounding whitespace.
use crate::tokens::{ControlToken, extract_tokens};
use regex::Regex;
use std::sync::LazyLock;

pub(crate) static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*\\\s*k\s*\[\s*(\d+)\s*\]\s*").expect("marker regex should compile")
});

/// A marker standing in for one control token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorToken {
    /// 1-based index of the control token in the source text
    pub index: usize,
    /// The marker string sent to the translator
    pub token: String,
    /// The control token this marker replaces
    pub control: ControlToken,
}

impl AnchorToken {
    /// Create a marker for the given control token
    pub fn new(index: usize, control: ControlToken) -> Self {
        AnchorToken {
            index,
            token: marker_for(index),
            control,
        }
    }

    /// The text that replaces this marker when it is restored
    ///
    /// This is the whole original match, so the spacing around the token is restored along
    /// with the token.
    pub fn restoration(&self) -> &str {
        &self.control.matched
    }
}

/// The marker string for a 1-based index
pub fn marker_for(index: usize) -> String {
    format!("\\k[{}]", index)
}

/// Text prepared for the translator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedText {
    /// The source text with every control token replaced by its marker
    pub text: String,
    /// The markers in source order (`anchors[i].index == i + 1`)
    pub anchors: Vec<AnchorToken>,
}

/// Replace control tokens with numbered markers
///
/// Tokens are numbered in order of appearance and replaced right to left so the byte offsets
/// of earlier tokens stay valid. Only the token proper is replaced; its surrounding whitespace
/// stays in the text the translator sees.
///
/// # Example
/// ```ignore
/// let protected = replace_tokens_with_anchors("Hello \\c[2]Bob\\c[0]!");
/// assert_eq!(protected.text, "Hello \\k[1]Bob\\k[2]!");
/// ```
pub fn replace_tokens_with_anchors(text: &str) -> ProtectedText {
    let anchors: Vec<AnchorToken> = extract_tokens(text)
        .into_iter()
        .enumerate()
        .map(|(i, control)| AnchorToken::new(i + 1, control))
        .collect();

    let mut result = text.to_string();
    for anchor in anchors.iter().rev() {
        result.replace_range(
            anchor.control.token_start..anchor.control.token_end,
            &anchor.token,
        );
    }

    ProtectedText {
        text: result,
        anchors,
    }
}

/// A marker found in translated text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedAnchor {
    /// The index parsed from the marker
    pub index: usize,
    /// Byte offset of the match, surrounding whitespace included
    pub position: usize,
    /// Byte length of the match
    pub length: usize,
}

/// Locate every marker in `text`, ordered by position
///
/// Markers whose index does not fit in `usize` are skipped.
pub fn locate_anchors_in_text(text: &str) -> Vec<LocatedAnchor> {
    MARKER_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let index = caps.get(1)?.as_str().parse::<usize>().ok()?;
            Some(LocatedAnchor {
                index,
                position: whole.start(),
                length: whole.len(),
            })
        })
        .collect()
}

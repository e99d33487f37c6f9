//! Line reflow for fixed-width message boxes
//!
//! Translated text is usually longer than the source and has to be broken into lines again.
//! The policy, in order:
//!
//! 1. Author line breaks are kept if every line already fits.
//! 2. A first line starting with the speaker marker `\>` is left alone and only the lines
//!    after it are re-wrapped, provided they fit in the remaining lines of the box.
//! 3. A paragraph too wide for the whole box even in the best case is cut into fixed-size
//!    character chunks.
//! 4. Otherwise words are packed greedily.
//!
//! # Example
//!
//! ```ignore
//! use script_mt::{CharCountMeasure, reflow};
//!
//! let lines = reflow(&CharCountMeasure, "one two three four", 9.0, 4);
//! assert_eq!(lines, vec!["one two", "three", "four"]);
//! ```

use crate::metrics::TextMeasure;

/// Opening sequence of a line carrying the speaker's name box
pub const SPEAKER_MARKER: &str = "\\>";

/// Text to be laid out in a box of `max_lines` lines of `width_limit` display units
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayParagraph {
    pub text: String,
    pub width_limit: f64,
    pub max_lines: usize,
}

impl DisplayParagraph {
    pub fn new(text: impl Into<String>, width_limit: f64, max_lines: usize) -> Self {
        Self {
            text: text.into(),
            width_limit,
            max_lines,
        }
    }
}

/// Lines chosen for a paragraph
#[derive(Debug, Clone, PartialEq)]
pub struct ReflowOutcome {
    pub lines: Vec<String>,
    /// More lines than the box holds; the lines are still usable
    pub overflow: bool,
}

/// Reflow a paragraph and report whether it overflows its box
pub fn reflow_paragraph<M: TextMeasure + ?Sized>(
    measure: &M,
    paragraph: &DisplayParagraph,
) -> ReflowOutcome {
    let lines = reflow(
        measure,
        &paragraph.text,
        paragraph.width_limit,
        paragraph.max_lines,
    );
    let overflow = lines.len() > paragraph.max_lines;
    ReflowOutcome { lines, overflow }
}

/// Split `text` into display lines no wider than `width_limit`
pub fn reflow<M: TextMeasure + ?Sized>(
    measure: &M,
    text: &str,
    width_limit: f64,
    max_lines: usize,
) -> Vec<String> {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines
        .iter()
        .all(|line| measure.visible_width(line) <= width_limit)
    {
        return lines.into_iter().map(str::to_string).collect();
    }

    if lines.len() > 1 && lines[0].starts_with(SPEAKER_MARKER) {
        let rest = lines[1..].join(" ");
        let budget = max_lines.saturating_sub(1) as f64 * width_limit;
        if measure.visible_width(&rest) <= budget {
            let mut result = vec![lines[0].to_string()];
            result.extend(wrap_words(measure, &rest, width_limit));
            return result;
        }
    }

    let paragraph = lines.join(" ");
    if measure.visible_width(&paragraph) > max_lines as f64 * width_limit {
        return chunk_chars(&paragraph, width_limit.floor() as usize);
    }
    wrap_words(measure, &paragraph, width_limit)
}

/// Greedy word packing
///
/// Words are separated by whitespace and rejoined with single spaces. A word wider than the
/// limit gets a line of its own and is not split.
pub fn wrap_words<M: TextMeasure + ?Sized>(
    measure: &M,
    text: &str,
    width_limit: f64,
) -> Vec<String> {
    let space_width = measure.visible_width(" ");
    let mut lines = Vec::new();
    let mut words: Vec<&str> = Vec::new();
    let mut width = 0.0;

    for word in text.split_whitespace() {
        let word_width = measure.visible_width(word);
        if words.is_empty() {
            width = word_width;
        } else if width + space_width + word_width > width_limit {
            lines.push(words.join(" "));
            words.clear();
            width = word_width;
        } else {
            width += space_width + word_width;
        }
        words.push(word);
    }
    if !words.is_empty() {
        lines.push(words.join(" "));
    }
    lines
}

/// Cut `text` into consecutive chunks of `chunk_len` characters
///
/// Character count, not visible width; a control token can be cut in half.
pub fn chunk_chars(text: &str, chunk_len: usize) -> Vec<String> {
    let chunk_len = chunk_len.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_len)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{CharCountMeasure, GlyphWidthTable};

    #[test]
    fn test_explicit_breaks_kept() {
        let lines = reflow(&CharCountMeasure, "A\nB", 10.0, 4);
        assert_eq!(lines, vec!["A", "B"]);
    }

    #[test]
    fn test_fitting_single_line_unchanged() {
        let lines = reflow(&CharCountMeasure, "short line", 40.0, 4);
        assert_eq!(lines, vec!["short line"]);
    }

    #[test]
    fn test_tokens_do_not_count_towards_fit() {
        let text = "\\c[2]abcde\\c[0]";
        assert_eq!(reflow(&CharCountMeasure, text, 5.0, 1), vec![text]);
    }

    #[test]
    fn test_greedy_wrap() {
        let lines = reflow(&CharCountMeasure, "one two three four", 9.0, 4);
        assert_eq!(lines, vec!["one two", "three", "four"]);
    }

    #[test]
    fn test_rewrap_joins_author_lines() {
        let lines = reflow(&CharCountMeasure, "aaa bbb ccc\nddd", 8.0, 4);
        assert_eq!(lines, vec!["aaa bbb", "ccc ddd"]);
    }

    #[test]
    fn test_speaker_line_kept() {
        let text = "\\>\\}Pavel\\{\\< and a very long name line\nhello there my friend";
        let lines = reflow(&CharCountMeasure, text, 12.0, 4);
        assert_eq!(
            lines,
            vec![
                "\\>\\}Pavel\\{\\< and a very long name line",
                "hello there",
                "my friend",
            ]
        );
    }

    #[test]
    fn test_speaker_line_falls_back_when_remainder_too_long() {
        // remainder is wider than the (max_lines - 1) lines left below the name
        let text = "\\>Al\naaaa bbbb cc";
        let lines = reflow(&CharCountMeasure, text, 10.0, 2);
        assert_eq!(lines, vec!["\\>Al aaaa", "bbbb cc"]);
    }

    #[test]
    fn test_overlong_word_alone_on_line() {
        let lines = wrap_words(&CharCountMeasure, "a supercalifragilistic b", 6.0);
        assert_eq!(lines, vec!["a", "supercalifragilistic", "b"]);
    }

    #[test]
    fn test_overlong_first_word_has_no_empty_line() {
        let lines = wrap_words(&CharCountMeasure, "enormous ok", 4.0);
        assert_eq!(lines, vec!["enormous", "ok"]);
    }

    #[test]
    fn test_char_fallback_chunks() {
        let text = "abcdefghijklmnopqrstuvw";
        let lines = reflow(&CharCountMeasure, text, 5.0, 2);
        assert_eq!(lines.len(), text.len().div_ceil(5));
        assert_eq!(lines, vec!["abcde", "fghij", "klmno", "pqrst", "uvw"]);
        for line in &lines[..lines.len() - 1] {
            assert_eq!(line.chars().count(), 5);
        }
    }

    #[test]
    fn test_chunk_chars_multibyte() {
        assert_eq!(chunk_chars("приветмир", 3), vec!["при", "вет", "мир"]);
        assert_eq!(chunk_chars("abc", 0), vec!["a", "b", "c"]);
        assert!(chunk_chars("", 3).is_empty());
    }

    #[test]
    fn test_packing_respects_budget() {
        let table = GlyphWidthTable::new(1000, 500)
            .with_width(' ', 300)
            .with_width('i', 200)
            .with_width('m', 900);
        let text = "mim i mmm iii mi im m iiiii mm i mimi";
        let limit = 30.0;
        for line in wrap_words(&table, text, limit) {
            assert!(table.visible_width(&line) <= limit, "line too wide: {}", line);
        }
    }

    #[test]
    fn test_paragraph_overflow_reported() {
        let paragraph = DisplayParagraph::new("aaa bbb cc", 5.0, 2);
        let outcome = reflow_paragraph(&CharCountMeasure, &paragraph);
        assert_eq!(outcome.lines, vec!["aaa", "bbb", "cc"]);
        assert!(outcome.overflow);
    }

    #[test]
    fn test_paragraph_within_box() {
        let paragraph = DisplayParagraph::new("aa bb cc", 5.0, 2);
        let outcome = reflow_paragraph(&CharCountMeasure, &paragraph);
        assert_eq!(outcome.lines, vec!["aa bb", "cc"]);
        assert!(!outcome.overflow);
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(reflow(&CharCountMeasure, "", 5.0, 2), vec![""]);
    }
}

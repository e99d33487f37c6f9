//! Pass-through prefixes on plugin command text
//!
//! Plugin commands are code, not prose, except for a couple of commands whose tail is a line of
//! dialogue:
//!
//! - `GabText <text>`: a fixed prefix, everything after it is prose
//! - `choice_text <id> <text>`: a variable-length prefix up to the space after the id
//!
//! The prefix is kept verbatim and only the remainder goes through the translation pipeline.

/// Fixed prefix of pop-up "gab" text commands
pub const GAB_TEXT_PREFIX: &str = "GabText ";

/// Prefix of choice label commands; the prefix runs up to the next space
pub const CHOICE_TEXT_PREFIX: &str = "choice_text ";

/// A plugin command split into its verbatim prefix and translatable remainder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope<'a> {
    pub prefix: &'a str,
    pub body: &'a str,
}

impl<'a> Envelope<'a> {
    /// Split `text` if it carries a known pass-through prefix
    ///
    /// Returns `None` for commands that must not be translated at all. A `choice_text` command
    /// without a space after its id is all prefix and yields an empty body.
    pub fn split(text: &'a str) -> Option<Self> {
        if let Some(body) = text.strip_prefix(GAB_TEXT_PREFIX) {
            return Some(Envelope {
                prefix: &text[..GAB_TEXT_PREFIX.len()],
                body,
            });
        }
        if let Some(rest) = text.strip_prefix(CHOICE_TEXT_PREFIX) {
            let cut = match rest.find(' ') {
                Some(i) => CHOICE_TEXT_PREFIX.len() + i + 1,
                None => text.len(),
            };
            return Some(Envelope {
                prefix: &text[..cut],
                body: &text[cut..],
            });
        }
        None
    }

    /// Reassemble the command around a translated body
    pub fn wrap(&self, translated_body: &str) -> String {
        format!("{}{}", self.prefix, translated_body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gab_text() {
        let envelope = Envelope::split("GabText Watch out!").unwrap();
        assert_eq!(envelope.prefix, "GabText ");
        assert_eq!(envelope.body, "Watch out!");
        assert_eq!(envelope.wrap("Осторожно!"), "GabText Осторожно!");
    }

    #[test]
    fn test_choice_text() {
        let envelope = Envelope::split("choice_text 3 Go left").unwrap();
        assert_eq!(envelope.prefix, "choice_text 3 ");
        assert_eq!(envelope.body, "Go left");
    }

    #[test]
    fn test_choice_text_without_body() {
        let envelope = Envelope::split("choice_text 3").unwrap();
        assert_eq!(envelope.prefix, "choice_text 3");
        assert_eq!(envelope.body, "");
    }

    #[test]
    fn test_other_commands_are_not_split() {
        assert_eq!(Envelope::split("ShowMap 12"), None);
        assert_eq!(Envelope::split("gabtext lower case"), None);
        assert_eq!(Envelope::split(""), None);
    }
}

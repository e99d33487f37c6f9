//! Speaker name tags
//!
//! Dialogue lines open with a name box written as
//!
//! ```text
//! \>\i[ICON]\}NAME\{\<
//! ```
//!
//! where the icon is a letter badge drawn from the icon sheet. The translated font draws the
//! badge letter directly, so the tag is recoded: the icon escape is dropped and the name is
//! prefixed with the character whose code point is the remapped icon id.

use regex::Regex;
use std::sync::LazyLock;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\>\\i\[(\d+)\]\\\}([^\\]+)\\\{\\<").expect("name tag regex should compile")
});

static RECODED_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\>\\\}([^\\]+)\\\{\\<").expect("recoded name tag regex should compile")
});

/// A name tag found in a line of dialogue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTag {
    /// Icon id as written in the source
    pub icon_id: u32,
    /// The literal name
    pub name: String,
    /// Byte range of the whole tag in the source
    pub span: (usize, usize),
}

impl NameTag {
    /// Find the first name tag in `text`
    pub fn find(text: &str) -> Option<Self> {
        let caps = NAME_RE.captures(text)?;
        let whole = caps.get(0)?;
        let icon_id = caps.get(1)?.as_str().parse::<u32>().ok()?;
        let name = caps.get(2)?.as_str().to_string();
        Some(NameTag {
            icon_id,
            name,
            span: (whole.start(), whole.end()),
        })
    }

    /// The badge letter for this tag's icon
    pub fn badge(&self) -> Option<char> {
        recode_icon_id(self.icon_id).and_then(char::from_u32)
    }

    /// The name with its badge letter prepended
    pub fn full_name(&self) -> Option<String> {
        self.badge().map(|badge| format!("{}{}", badge, self.name))
    }

    /// The recoded tag: `\>\}` + badge + name + `\{\<`
    pub fn recoded(&self) -> Option<String> {
        self.full_name()
            .map(|full_name| format!("\\>\\}}{}\\{{\\<", full_name))
    }
}

/// Map an icon id to the code point of its badge letter
///
/// Most badges sit one slot after their letter; three are out of order in the icon sheet.
pub fn recode_icon_id(icon_id: u32) -> Option<u32> {
    match icon_id {
        144 => Some(80), // P
        81 => Some(83),  // S
        80 => Some(82),  // R
        other => other.checked_add(1),
    }
}

/// Recode the first name tag in `text`
///
/// Text without a name tag, or whose icon id has no valid badge character, is returned
/// unchanged.
pub fn recode(text: &str) -> String {
    let Some(tag) = NameTag::find(text) else {
        return text.to_string();
    };
    let Some(recoded) = tag.recoded() else {
        return text.to_string();
    };
    let mut result = String::with_capacity(text.len());
    result.push_str(&text[..tag.span.0]);
    result.push_str(&recoded);
    result.push_str(&text[tag.span.1..]);
    result
}

/// The name inside an already recoded tag, badge letter included
pub fn recoded_name(text: &str) -> Option<&str> {
    RECODED_NAME_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

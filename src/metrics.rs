//! Glyph advance widths and visible text width
//!
//! The message window measures text by summing per-code-point advance widths from the game
//! font. No kerning, no ligatures, no shaping. [`GlyphWidthTable`] reproduces that measure
//! from the font file itself so that line breaks chosen here match the ones the game would
//! draw. Control tokens are invisible and measure zero.

use crate::error::{MtError, MtResult};
use crate::tokens::strip_tokens;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Display units per em; widths are reported in tenths of the font size
pub const DISPLAY_UNITS_PER_EM: f64 = 10.0;

/// Something that can tell how wide a string is on screen
pub trait TextMeasure: Send + Sync {
    /// Width of `text` taken literally, every character counted
    fn text_width(&self, text: &str) -> f64;

    /// Width of `text` as rendered: control tokens contribute nothing
    fn visible_width(&self, text: &str) -> f64 {
        self.text_width(&strip_tokens(text))
    }
}

/// Advance widths of a font, keyed by code point
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphWidthTable {
    widths: HashMap<char, u16>,
    default_width: u16,
    units_per_em: u16,
}

impl GlyphWidthTable {
    /// An empty table: every character measures `default_width`
    pub fn new(units_per_em: u16, default_width: u16) -> Self {
        Self {
            widths: HashMap::new(),
            default_width,
            units_per_em: units_per_em.max(1),
        }
    }

    /// Builder-style insertion of a single advance width
    pub fn with_width(mut self, c: char, advance: u16) -> Self {
        self.widths.insert(c, advance);
        self
    }

    /// Read advance widths from TrueType/OpenType font data
    ///
    /// Every code point of every Unicode cmap subtable is mapped to the horizontal advance of
    /// its glyph. Unmapped code points fall back to the advance of glyph 0 (`.notdef`).
    pub fn from_font_data(data: &[u8]) -> MtResult<Self> {
        let face = ttf_parser::Face::parse(data, 0)
            .map_err(|e| MtError::FontError(format!("Failed to parse font: {:?}", e)))?;

        let units_per_em = face.units_per_em();
        let default_width = face
            .glyph_hor_advance(ttf_parser::GlyphId(0))
            .unwrap_or(0);

        let mut widths = HashMap::new();
        if let Some(cmap) = face.tables().cmap {
            for subtable in cmap.subtables {
                if !subtable.is_unicode() {
                    continue;
                }
                subtable.codepoints(|code_point| {
                    let Some(c) = char::from_u32(code_point) else {
                        return;
                    };
                    if widths.contains_key(&c) {
                        return;
                    }
                    if let Some(advance) = subtable
                        .glyph_index(code_point)
                        .and_then(|glyph| face.glyph_hor_advance(glyph))
                    {
                        widths.insert(c, advance);
                    }
                });
            }
        }

        debug!(
            glyphs = widths.len(),
            units_per_em, default_width, "loaded glyph widths"
        );

        Ok(Self {
            widths,
            default_width,
            units_per_em: units_per_em.max(1),
        })
    }

    /// Read advance widths from a font file on disk
    pub fn from_font_file(path: &Path) -> MtResult<Self> {
        let data = std::fs::read(path).map_err(|e| {
            MtError::FontError(format!("Failed to read font '{}': {}", path.display(), e))
        })?;
        Self::from_font_data(&data)
    }

    /// Advance of `c` in font units
    pub fn advance(&self, c: char) -> u16 {
        self.widths.get(&c).copied().unwrap_or(self.default_width)
    }

    /// Advance used for unmapped code points
    pub fn default_width(&self) -> u16 {
        self.default_width
    }

    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    /// Number of mapped code points
    pub fn len(&self) -> usize {
        self.widths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }
}

impl TextMeasure for GlyphWidthTable {
    fn text_width(&self, text: &str) -> f64 {
        // Sum in font units first so equal inputs give bit-identical widths.
        let total: u64 = text.chars().map(|c| u64::from(self.advance(c))).sum();
        total as f64 * DISPLAY_UNITS_PER_EM / f64::from(self.units_per_em)
    }
}

/// Measures text by character count
///
/// Used when no font is configured, and by the hard character fallback of the reflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CharCountMeasure;

impl TextMeasure for CharCountMeasure {
    fn text_width(&self, text: &str) -> f64 {
        text.chars().count() as f64
    }
}

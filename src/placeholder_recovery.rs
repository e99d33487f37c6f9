//! Control Token Recovery for Translated Text
//!
//! This module puts control tokens back into translated text in place of the markers
//! (`\k[1]`, `\k[2]`, ...) that stood in for them during translation.
//!
//! # Example
//!
//! ```ignore
//! Source:        "\\c[2]Bob\\c[0] waves"
//! Protected:     "\\k[1]Bob\\k[2] waves"
//! Translated:    "\\k[1]Боб\\k[2] машет"
//! Recovered:     "\\c[2]Боб\\c[0] машет"
//! ```
//!
//! Markers are matched by the index they carry, not by their position, so a translator that
//! moves a marker moves the token with it. The recovery never fails: missing, duplicated,
//! unknown and reordered markers are reported as warnings and the text is returned with
//! whatever could be restored.

use crate::anchor::{AnchorToken, LocatedAnchor, locate_anchors_in_text};
use std::collections::BTreeMap;

/// Result of a recovery operation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecoveryResult {
    /// Text with markers replaced by the original control tokens
    pub recovered_text: String,
    /// Whether the markers came back in a different order than they were sent
    pub reordering_detected: bool,
    /// Indices that were sent but not found in the translation
    pub missing: Vec<usize>,
    /// Indices that were found more than once
    pub duplicated: Vec<usize>,
    /// Indices found in the translation that were never sent (left untouched)
    pub unknown: Vec<usize>,
    /// Human readable warnings from the recovery process
    pub warnings: Vec<String>,
}

impl RecoveryResult {
    /// Whether every marker came back exactly once and in order
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Detect if markers have been reordered compared to the source
///
/// Unknown indices are ignored. Warning-mode: reordering is reported, never fatal.
///
/// # Example
/// ```ignore
/// // Markers 2 then 1: reordered
/// assert!(detect_anchor_reordering(&located, 2));
/// ```
pub fn detect_anchor_reordering(located_anchors: &[LocatedAnchor], anchor_count: usize) -> bool {
    let order: Vec<usize> = located_anchors
        .iter()
        .map(|a| a.index)
        .filter(|&index| index >= 1 && index <= anchor_count)
        .collect();
    order.windows(2).any(|pair| pair[0] > pair[1])
}

/// Replace markers in `text` with the control tokens they stand for
///
/// Replacements run from the end of the string towards the start so earlier byte offsets
/// stay valid. Each marker match (including the whitespace the translator put around it) is
/// replaced by the original token match (including the whitespace the author put around it).
pub fn recover_tokens(text: &str, anchors: &[AnchorToken]) -> RecoveryResult {
    let located = locate_anchors_in_text(text);

    let mut seen: BTreeMap<usize, usize> = BTreeMap::new();
    let mut unknown = Vec::new();
    for anchor in &located {
        if anchor.index >= 1 && anchor.index <= anchors.len() {
            *seen.entry(anchor.index).or_insert(0) += 1;
        } else {
            unknown.push(anchor.index);
        }
    }

    let mut recovered = text.to_string();
    for anchor in located.iter().rev() {
        if let Some(original) = anchor
            .index
            .checked_sub(1)
            .and_then(|i| anchors.get(i))
        {
            recovered.replace_range(
                anchor.position..anchor.position + anchor.length,
                original.restoration(),
            );
        }
    }

    let missing: Vec<usize> = anchors
        .iter()
        .map(|a| a.index)
        .filter(|index| !seen.contains_key(index))
        .collect();
    let duplicated: Vec<usize> = seen
        .iter()
        .filter(|&(_, &count)| count > 1)
        .map(|(&index, _)| index)
        .collect();
    let reordering_detected = detect_anchor_reordering(&located, anchors.len());

    let mut warnings = Vec::new();
    if !missing.is_empty() {
        warnings.push(format!("Markers dropped by the translator: {:?}", missing));
    }
    if !duplicated.is_empty() {
        warnings.push(format!("Markers duplicated by the translator: {:?}", duplicated));
    }
    if !unknown.is_empty() {
        warnings.push(format!("Markers with unknown index left in place: {:?}", unknown));
    }
    if reordering_detected {
        warnings.push("Markers were reordered during translation".to_string());
    }

    RecoveryResult {
        recovered_text: recovered,
        reordering_detected,
        missing,
        duplicated,
        unknown,
        warnings,
    }
}

//! Translation checks and the end-of-run report
//!
//! None of these problems stop a run. They are collected per source string and printed at the
//! end for a human to fix in the cache.

use crate::name_tag;
use crate::tokens::{strip_tokens, token_texts};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

static LATIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z]").expect("latin letter regex should compile"));

static CYRILLIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[А-я]").expect("cyrillic letter regex should compile"));

/// Whether `translated` carries the same control tokens as `original`, in the same order
///
/// Whitespace around tokens is ignored.
pub fn check_format(original: &str, translated: &str) -> bool {
    token_texts(original) == token_texts(translated)
}

/// Whether `translated` still contains Latin letters outside of control tokens
///
/// The target language is written in another script, so leftover Latin text usually means a
/// fragment the translator skipped.
pub fn check_ascii_leak(translated: &str) -> bool {
    LATIN_RE.is_match(&strip_tokens(translated))
}

fn letters_only(text: &str) -> String {
    CYRILLIC_RE.find_iter(text).map(|m| m.as_str()).collect()
}

/// Share of translations a human has edited, between 0 and 1
///
/// Compares a machine-translated cache with an edited copy over the keys both have. Only the
/// Cyrillic letters of each translation count, so punctuation and spacing fixes are not
/// edits. `None` when the caches have no key in common.
pub fn edited_share(
    machine: &BTreeMap<String, String>,
    edited: &BTreeMap<String, String>,
) -> Option<f64> {
    let mut common = 0usize;
    let mut changed = 0usize;
    for (source, translated) in machine {
        let Some(edited_translation) = edited.get(source) else {
            continue;
        };
        common += 1;
        if letters_only(translated) != letters_only(edited_translation) {
            changed += 1;
        }
    }
    (common > 0).then(|| changed as f64 / common as f64)
}

/// Problems found during a run, keyed by source text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Control tokens lost, duplicated or reordered: source → translation
    pub bad_formatting: BTreeMap<String, String>,
    /// Latin letters left in the translation: source → translation
    pub bad_translate: BTreeMap<String, String>,
    /// Reflow needed more lines than the box holds: source → lines
    pub overspace: BTreeMap<String, Vec<String>>,
}

impl Report {
    pub fn is_empty(&self) -> bool {
        self.bad_formatting.is_empty() && self.bad_translate.is_empty() && self.overspace.is_empty()
    }

    /// Render the report the way it is printed at the end of a run
    pub fn render(&self) -> String {
        fn quote(s: &str) -> String {
            serde_json::to_string(s).unwrap_or_else(|_| s.to_string())
        }

        let mut out = String::new();
        if !self.bad_formatting.is_empty() {
            out.push_str("Bad formatting strings:\n");
            for (source, translated) in &self.bad_formatting {
                out.push_str(&format!("{} > {}\n", quote(source), quote(translated)));
            }
        }
        if !self.bad_translate.is_empty() {
            out.push_str("Bad translate strings:\n");
            for (source, translated) in &self.bad_translate {
                out.push_str(&format!("{} > {}\n", quote(source), quote(translated)));
            }
        }
        if !self.overspace.is_empty() {
            out.push_str("Overspace strings:\n");
            for (source, lines) in &self.overspace {
                out.push_str(&format!(
                    "{} > {} lines: {}\n",
                    quote(source),
                    lines.len(),
                    quote(&lines.join("\n"))
                ));
            }
        }
        out
    }
}

/// Thread-safe collector shared by all workers
#[derive(Debug, Default)]
pub struct Diagnostics {
    report: Mutex<Report>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Report> {
        self.report.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run both checks on a translation and record what fails
    ///
    /// The icon escape of a name tag is dropped on purpose, so tokens are compared against the
    /// recoded source.
    pub fn check(&self, source: &str, translated: &str) {
        if !check_format(&name_tag::recode(source), translated) {
            self.record_bad_formatting(source, translated);
        }
        if check_ascii_leak(translated) {
            self.record_bad_translate(source, translated);
        }
    }

    fn record_bad_formatting(&self, original: &str, translated: &str) {
        self.lock()
            .bad_formatting
            .insert(original.to_string(), translated.to_string());
    }

    fn record_bad_translate(&self, original: &str, translated: &str) {
        self.lock()
            .bad_translate
            .insert(original.to_string(), translated.to_string());
    }

    pub fn record_overspace(&self, original: &str, lines: &[String]) {
        self.lock()
            .overspace
            .insert(original.to_string(), lines.to_vec());
    }

    /// A copy of everything recorded so far
    pub fn report(&self) -> Report {
        self.lock().clone()
    }
}

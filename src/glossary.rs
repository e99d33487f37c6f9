//! Fixed replacements applied after translation
//!
//! Machine translators mangle invented names in creative ways ("All-mer", "Аллл-мер",
//! "Алль-Мер"). A glossary rewrites every known variant to the canonical translation. Rules run
//! in order, on every result, cache hits included, so editing the glossary takes effect without
//! clearing the cache.

use crate::error::{MtError, MtResult};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// One literal replacement
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GlossaryRule {
    pub from: String,
    pub to: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GlossaryFile {
    Rules(Vec<GlossaryRule>),
    Map(BTreeMap<String, String>),
}

/// Ordered list of replacement rules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Glossary {
    rules: Vec<GlossaryRule>,
}

impl Glossary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule, builder style
    pub fn with_rule(mut self, from: &str, to: &str) -> Self {
        self.push(from, to);
        self
    }

    fn push(&mut self, from: &str, to: &str) {
        if from.is_empty() {
            return;
        }
        self.rules.push(GlossaryRule {
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    /// Parse a glossary from JSON
    ///
    /// Accepts either `[{"from": "...", "to": "..."}]`, which keeps rule order, or a plain
    /// object `{"from": "to"}`, applied in key order.
    pub fn from_json(json: &str) -> MtResult<Self> {
        let file: GlossaryFile = serde_json::from_str(json)
            .map_err(|e| MtError::ConfigError(format!("Invalid glossary: {}", e)))?;
        let mut glossary = Glossary::new();
        match file {
            GlossaryFile::Rules(rules) => {
                for rule in rules {
                    glossary.push(&rule.from, &rule.to);
                }
            }
            GlossaryFile::Map(map) => {
                for (from, to) in map {
                    glossary.push(&from, &to);
                }
            }
        }
        Ok(glossary)
    }

    /// Load a glossary file
    pub fn load(path: &Path) -> MtResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MtError::ConfigError(format!(
                "Failed to read glossary '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply every rule to `text`, in order
    pub fn apply(&self, text: &str) -> String {
        let mut result = text.to_string();
        for rule in &self.rules {
            if result.contains(&rule.from) {
                result = result.replace(&rule.from, &rule.to);
            }
        }
        result
    }
}

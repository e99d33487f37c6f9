//! The translation pipeline
//!
//! One string goes through these stages, in order:
//!
//! 1. name tag recoding ([`crate::name_tag::recode`])
//! 2. control tokens replaced by numbered markers ([`crate::anchor`])
//! 3. the single opaque translator call
//! 4. markers restored by index ([`crate::placeholder_recovery`])
//! 5. the glossary
//!
//! Stages 1 to 4 run at most once per distinct source string and their result is cached.
//! The glossary runs on every call. Reflow is a separate, later step ([`TranslationPipeline::layout`])
//! because the driver runs it sequentially once all translations are in.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use script_mt::{MockMode, MockTranslator, TranslationCache, TranslationPipeline};
//!
//! let pipeline = TranslationPipeline::new(
//!     Arc::new(MockTranslator::new(MockMode::Suffix)),
//!     Arc::new(TranslationCache::new()),
//! );
//! let translated = pipeline.translate("Hello \\c[2]world").await?;
//! assert_eq!(translated, "Hello \\c[2]world_ru");
//! ```

use crate::anchor::replace_tokens_with_anchors;
use crate::cache::{CacheStatus, TranslationCache};
use crate::envelope::Envelope;
use crate::error::MtResult;
use crate::glossary::Glossary;
use crate::metrics::TextMeasure;
use crate::name_tag;
use crate::placeholder_recovery::{RecoveryResult, recover_tokens};
use crate::reflow::{DisplayParagraph, reflow_paragraph};
use crate::translator::{MachineTranslator, normalize_locale, validate_locale};
use crate::validate::Diagnostics;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_SOURCE_LOCALE: &str = "en";
pub const DEFAULT_TARGET_LOCALE: &str = "ru";

/// What happened to one string on its way through the translator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    /// Text sent to the translator, markers in place of tokens
    pub sent: String,
    /// Raw translator output
    pub received: String,
    pub recovery: RecoveryResult,
}

impl RewriteOutcome {
    /// The translation with control tokens restored
    pub fn text(&self) -> &str {
        &self.recovery.recovered_text
    }

    pub fn warnings(&self) -> &[String] {
        &self.recovery.warnings
    }
}

/// Translate `text` without letting the translator see its control tokens
///
/// Only a translator error fails; marker trouble is reported in the outcome.
pub async fn rewrite(
    text: &str,
    translator: &dyn MachineTranslator,
    source_locale: &str,
    target_locale: &str,
) -> MtResult<RewriteOutcome> {
    let protected = replace_tokens_with_anchors(text);
    let received = translator
        .translate(&protected.text, source_locale, target_locale)
        .await?;
    let recovery = recover_tokens(&received, &protected.anchors);
    Ok(RewriteOutcome {
        sent: protected.text,
        received,
        recovery,
    })
}

/// Cached, checked translation of game text
pub struct TranslationPipeline {
    translator: Arc<dyn MachineTranslator>,
    cache: Arc<TranslationCache>,
    diagnostics: Arc<Diagnostics>,
    glossary: Glossary,
    source_locale: String,
    target_locale: String,
}

impl std::fmt::Debug for TranslationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationPipeline")
            .field("provider", &self.translator.provider_name())
            .field("cached", &self.cache.len())
            .field("glossary_rules", &self.glossary.len())
            .field("source_locale", &self.source_locale)
            .field("target_locale", &self.target_locale)
            .finish()
    }
}

impl TranslationPipeline {
    pub fn new(translator: Arc<dyn MachineTranslator>, cache: Arc<TranslationCache>) -> Self {
        Self {
            translator,
            cache,
            diagnostics: Arc::new(Diagnostics::new()),
            glossary: Glossary::new(),
            source_locale: DEFAULT_SOURCE_LOCALE.to_string(),
            target_locale: DEFAULT_TARGET_LOCALE.to_string(),
        }
    }

    pub fn with_glossary(mut self, glossary: Glossary) -> Self {
        self.glossary = glossary;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Set the language pair; region subtags are dropped (`en-US` → `en`)
    pub fn with_locales(mut self, source_locale: &str, target_locale: &str) -> MtResult<Self> {
        validate_locale(source_locale)?;
        validate_locale(target_locale)?;
        self.source_locale = normalize_locale(source_locale);
        self.target_locale = normalize_locale(target_locale);
        Ok(self)
    }

    pub fn cache(&self) -> &Arc<TranslationCache> {
        &self.cache
    }

    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.diagnostics
    }

    pub fn provider_name(&self) -> &str {
        self.translator.provider_name()
    }

    /// Translate one string
    ///
    /// Empty input passes through untouched and is not counted.
    pub async fn translate(&self, text: &str) -> MtResult<String> {
        if text.is_empty() {
            return Ok(String::new());
        }

        let recoded = name_tag::recode(text);
        let (cached, status) = self
            .cache
            .resolve(text, || self.translate_uncached(text, &recoded))
            .await?;
        let translated = self.glossary.apply(&cached);

        match status {
            CacheStatus::Miss => info!("{} → {}", text, translated),
            CacheStatus::Hit => debug!("cache hit: {}", text),
        }

        self.diagnostics.check(text, &translated);
        Ok(translated)
    }

    async fn translate_uncached(&self, source: &str, recoded: &str) -> MtResult<String> {
        let outcome = rewrite(
            recoded,
            self.translator.as_ref(),
            &self.source_locale,
            &self.target_locale,
        )
        .await?;
        if !outcome.recovery.is_clean() {
            for warning in outcome.warnings() {
                warn!("{}: {}", source, warning);
            }
        }
        Ok(outcome.text().to_string())
    }

    /// Translate the prose tail of a plugin command
    ///
    /// Commands without a known prose prefix are returned unchanged and not counted.
    pub async fn translate_plugin_command(&self, text: &str) -> MtResult<String> {
        let Some(envelope) = Envelope::split(text) else {
            return Ok(text.to_string());
        };
        let body = self.translate(envelope.body).await?;
        Ok(envelope.wrap(&body))
    }

    /// Register `text` as its own translation unless the cache already has one
    pub fn keep(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        self.cache.keep(text)
    }

    /// Reflow translated text into a box, recording it when it does not fit
    pub fn layout<M: TextMeasure + ?Sized>(
        &self,
        measure: &M,
        paragraph: &DisplayParagraph,
    ) -> Vec<String> {
        let outcome = reflow_paragraph(measure, paragraph);
        if outcome.overflow {
            warn!(
                "{} lines for a box of {}: {}",
                outcome.lines.len(),
                paragraph.max_lines,
                paragraph.text
            );
            self.diagnostics
                .record_overspace(&paragraph.text, &outcome.lines);
        }
        outcome.lines
    }
}

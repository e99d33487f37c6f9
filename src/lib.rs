//! Machine translation of game script text
//!
//! Game dialogue is full of control codes (`\c[2]`, `\i[64]`, `\>`) that a machine translator
//! would happily translate, split or drop, and it has to fit message boxes whose width is
//! measured in the game font's glyph advances. This crate does the text surgery around an
//! opaque translator:
//!
//! 1. **Token extraction** - [`extract_tokens`] finds control codes and their spans
//! 2. **Escape rewriting** - [`rewrite`] swaps control codes for numbered markers, calls the
//!    translator once and puts the codes back by marker index
//! 3. **Width measurement** - [`GlyphWidthTable`] sums advance widths read from the font
//! 4. **Line reflow** - [`reflow`] breaks translated text into box-sized lines
//! 5. **Caching and checks** - [`TranslationCache`] translates each distinct string once per
//!    run, [`Diagnostics`] collects what needs a human look
//!
//! [`TranslationPipeline`] composes these stages and [`BatchDriver`] runs them over every
//! document of a game.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use script_mt::{CharCountMeasure, MockMode, MockTranslator, TranslationCache,
//!                 TranslationPipeline, reflow};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = TranslationPipeline::new(
//!         Arc::new(MockTranslator::new(MockMode::NoOp)),
//!         Arc::new(TranslationCache::new()),
//!     );
//!     let translated = pipeline.translate("\\c[2]Боб\\c[0] машет рукой").await?;
//!     for line in reflow(&CharCountMeasure, &translated, 12.0, 4) {
//!         println!("{}", line);
//!     }
//!     Ok(())
//! }
//! ```

pub mod anchor;
pub mod cache;
pub mod document;
pub mod driver;
pub mod envelope;
pub mod error;
pub mod glossary;
pub mod metrics;
pub mod mock;
pub mod name_tag;
pub mod pipeline;
pub mod placeholder_recovery;
pub mod reflow;
pub mod tokens;
pub mod translator;
pub mod validate;


pub use anchor::{
    AnchorToken, LocatedAnchor, ProtectedText, locate_anchors_in_text, marker_for,
    replace_tokens_with_anchors,
};
pub use cache::{CacheStatus, TranslationCache};
pub use document::{DocumentKind, FieldAction, TextField, collapse_messages, split_messages};
pub use driver::{BatchDriver, CancelToken, RunConfig, RunSummary, Session, translate_game};
pub use envelope::Envelope;
pub use error::{MtError, MtResult};
pub use glossary::Glossary;
pub use metrics::{CharCountMeasure, DISPLAY_UNITS_PER_EM, GlyphWidthTable, TextMeasure};
pub use mock::{MockMode, MockTranslator};
pub use name_tag::{NameTag, recode, recode_icon_id};
pub use pipeline::{RewriteOutcome, TranslationPipeline, rewrite};
pub use placeholder_recovery::{RecoveryResult, detect_anchor_reordering, recover_tokens};
pub use reflow::{DisplayParagraph, ReflowOutcome, chunk_chars, reflow, reflow_paragraph, wrap_words};
pub use tokens::{ControlToken, extract_tokens, strip_tokens, token_texts};
pub use translator::{FnTranslator, MachineTranslator, normalize_locale, validate_locale};
pub use validate::{Diagnostics, Report, check_ascii_leak, check_format, edited_share};

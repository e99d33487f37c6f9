//! Offline stand-in for a translation backend
//!
//! Deterministic and free of network calls. Tests use it to provoke marker loss, reordering
//! and failures; the command line tool uses it for dry runs.
//!
//! # Example
//!
//! ```ignore
//! use script_mt::{MachineTranslator, MockTranslator, MockMode};
//!
//! let mock = MockTranslator::new(MockMode::Reorder);
//! let out = mock.translate("\\k[1] waves \\k[2]", "en", "ru").await?;
//! assert_eq!(out, "\\k[2] waves \\k[1]");
//! assert_eq!(mock.call_count(), 1);
//! ```

use crate::anchor::MARKER_RE;
use crate::error::{MtError, MtResult};
use crate::translator::MachineTranslator;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// How the mock answers
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Append locale suffix: "hello" → "hello_ru"
    Suffix,

    /// Use predefined mappings: (text, target_locale) → translation.
    /// Unknown texts fall back to suffix mode.
    Mappings(HashMap<(String, String), String>),

    /// Reverse the order of whitespace separated words, markers included
    Reorder,

    /// Remove every marker, simulating a translator that eats control syntax
    DropMarkers,

    /// Fail every call with this message
    Error(String),

    /// Echo the input
    NoOp,
}

impl std::str::FromStr for MockMode {
    type Err = MtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "suffix" => Ok(MockMode::Suffix),
            "reorder" => Ok(MockMode::Reorder),
            "drop-markers" => Ok(MockMode::DropMarkers),
            "noop" => Ok(MockMode::NoOp),
            other => Err(MtError::ConfigError(format!(
                "Unknown mock mode '{}' (expected suffix, reorder, drop-markers or noop)",
                other
            ))),
        }
    }
}

/// Counts every call, so tests can tell how often the backend was hit
#[derive(Debug)]
pub struct MockTranslator {
    mode: MockMode,
    /// Per-call latency in milliseconds
    delay_ms: u64,
    calls: AtomicUsize,
}

impl MockTranslator {
    pub fn new(mode: MockMode) -> Self {
        Self {
            mode,
            delay_ms: 0,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep `delay_ms` before each answer, to let concurrent callers overlap
    pub fn with_delay(mode: MockMode, delay_ms: u64) -> Self {
        Self {
            mode,
            delay_ms,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `translate` calls served so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
    }

    fn answer(&self, text: &str, target: &str) -> MtResult<String> {
        match &self.mode {
            MockMode::Suffix => Ok(format!("{}_{}", text, target)),
            MockMode::Mappings(map) => Ok(map
                .get(&(text.to_string(), target.to_string()))
                .cloned()
                .unwrap_or_else(|| format!("{}_{}", text, target))),
            MockMode::Reorder => Ok(text.split_whitespace().rev().collect::<Vec<_>>().join(" ")),
            MockMode::DropMarkers => Ok(MARKER_RE.replace_all(text, " ").trim().to_string()),
            MockMode::Error(message) => Err(MtError::TranslationError(message.clone())),
            MockMode::NoOp => Ok(text.to_string()),
        }
    }
}

#[async_trait]
impl MachineTranslator for MockTranslator {
    async fn translate(
        &self,
        text: &str,
        _source_locale: &str,
        target_locale: &str,
    ) -> MtResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        self.answer(text, target_locale)
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

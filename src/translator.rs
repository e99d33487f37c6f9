//! Machine Translation trait and utilities
//!
//! This module defines the `MachineTranslator` trait, the single opaque call at the centre of
//! the pipeline. Everything around it (name recoding, marker substitution, token recovery,
//! glossary, caching) is plain text surgery that never talks to a backend.
//!
//! # Example
//!
//! ```ignore
//! use script_mt::{FnTranslator, MachineTranslator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let upper = FnTranslator::new("upper", |text: &str| Ok(text.to_uppercase()));
//!     let result = upper.translate("Hello \\k[1]", "en", "ru").await?;
//!     println!("{}", result);
//!     Ok(())
//! }
//! ```

use crate::error::{MtError, MtResult};
use async_trait::async_trait;

/// Generic trait for machine translation providers
///
/// Implementations may be called concurrently from many workers and may fail. Retries and
/// timeouts are the provider's own business.
#[async_trait]
pub trait MachineTranslator: Send + Sync {
    /// Translate a single text string from source to target locale
    ///
    /// The text may contain markers like `\k[1]`; providers should pass them through.
    async fn translate(
        &self,
        text: &str,
        source_locale: &str,
        target_locale: &str,
    ) -> MtResult<String>;

    /// Get the name of this translation provider, used in logs
    fn provider_name(&self) -> &str;
}

type TranslateFn = dyn Fn(&str) -> MtResult<String> + Send + Sync;

/// Adapter turning a plain `text -> text` function into a `MachineTranslator`
///
/// Locales are ignored; the function is expected to know its language pair.
pub struct FnTranslator {
    name: String,
    func: Box<TranslateFn>,
}

impl FnTranslator {
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(&str) -> MtResult<String> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            func: Box::new(func),
        }
    }
}

impl std::fmt::Debug for FnTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTranslator").field("name", &self.name).finish()
    }
}

#[async_trait]
impl MachineTranslator for FnTranslator {
    async fn translate(
        &self,
        text: &str,
        _source_locale: &str,
        _target_locale: &str,
    ) -> MtResult<String> {
        (self.func)(text)
    }

    fn provider_name(&self) -> &str {
        &self.name
    }
}

/// Normalize a locale code by stripping region information
///
/// - `en-US` → `en`
/// - `ru-RU` → `ru`
/// - `en` → `en` (unchanged)
pub fn normalize_locale(locale: &str) -> String {
    locale.split('-').next().unwrap_or(locale).to_lowercase()
}

/// Validate that a locale code is in acceptable format
///
/// Checks that the locale code is non-empty and contains only alphanumeric characters,
/// hyphens and underscores.
pub fn validate_locale(locale: &str) -> MtResult<()> {
    if locale.is_empty() {
        return Err(MtError::ConfigError("Locale code is empty".to_string()));
    }

    if !locale
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(MtError::ConfigError(format!(
            "Invalid characters in locale code: {}",
            locale
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_translator_calls_function() {
        let upper = FnTranslator::new("upper", |text: &str| Ok(text.to_uppercase()));
        let result = upper.translate("hello", "en", "ru").await.unwrap();
        assert_eq!(result, "HELLO");
        assert_eq!(upper.provider_name(), "upper");
    }

    #[tokio::test]
    async fn test_fn_translator_propagates_errors() {
        let failing = FnTranslator::new("failing", |_: &str| {
            Err(MtError::TranslationError("quota exceeded".to_string()))
        });
        let result = failing.translate("hello", "en", "ru").await;
        assert_eq!(
            result,
            Err(MtError::TranslationError("quota exceeded".to_string()))
        );
    }

    #[test]
    fn test_normalize_locale() {
        assert_eq!(normalize_locale("en-US"), "en");
        assert_eq!(normalize_locale("ru-RU"), "ru");
        assert_eq!(normalize_locale("EN"), "en");
        assert_eq!(normalize_locale("ru"), "ru");
    }

    #[test]
    fn test_validate_locale() {
        assert!(validate_locale("en").is_ok());
        assert!(validate_locale("zh-Hans").is_ok());
        assert!(validate_locale("de_DE").is_ok());
        assert!(validate_locale("").is_err());
        assert!(validate_locale("en@US").is_err());
    }

    #[test]
    fn test_validate_locale_error_messages() {
        match validate_locale("ru#bad") {
            Err(MtError::ConfigError(msg)) => assert!(msg.contains("Invalid characters")),
            _ => panic!("Expected ConfigError"),
        }
    }
}

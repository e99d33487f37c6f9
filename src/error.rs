/// Error types for the script translation pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MtError {
    /// Error reported by the machine translation provider
    TranslationError(String),
    /// Error while loading glyph metrics from a font
    FontError(String),
    /// Error while loading or saving the translation cache
    CacheError(String),
    /// Error while walking or rewriting a game data document
    DocumentError(String),
    /// Invalid configuration (locales, limits, paths)
    ConfigError(String),
    /// Filesystem error with context
    IoError(String),
    /// A cancel token stopped new work from starting
    Cancelled,
    /// General error with context
    Other(String),
}

impl std::fmt::Display for MtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MtError::TranslationError(msg) => write!(f, "Translation error: {}", msg),
            MtError::FontError(msg) => write!(f, "Font error: {}", msg),
            MtError::CacheError(msg) => write!(f, "Cache error: {}", msg),
            MtError::DocumentError(msg) => write!(f, "Document error: {}", msg),
            MtError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            MtError::IoError(msg) => write!(f, "I/O error: {}", msg),
            MtError::Cancelled => write!(f, "Cancelled"),
            MtError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for MtError {}

impl From<std::io::Error> for MtError {
    fn from(err: std::io::Error) -> Self {
        MtError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for MtError {
    fn from(err: serde_json::Error) -> Self {
        MtError::DocumentError(err.to_string())
    }
}

/// Result type for MT operations
pub type MtResult<T> = Result<T, MtError>;

//! Style Errors
//!
//! Structured errors for the style surface, carrying the standard numeric
//! exception code alongside the offending text or URI.

/// Result type for style operations
pub type CssResult<T> = Result<T, CssError>;

/// Style operation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CssError {
    /// Unparsable rule, declaration, or selector text; also covers a
    /// failed `@import` (the text names the URI).
    #[error("syntax error in `{text}`: {message}")]
    Syntax { text: String, message: String },
    /// Mutation of a structurally read-only object, e.g. a computed style
    #[error("read-only style object: {detail}")]
    InvalidAccess { detail: &'static str },
    /// Rule index outside the valid range
    #[error("rule index {index} is out of range for length {len}")]
    IndexSize { index: usize, len: usize },
}

impl CssError {
    /// Standard numeric exception code for this error.
    pub fn code(&self) -> u16 {
        match self {
            Self::IndexSize { .. } => 1,
            Self::Syntax { .. } => 12,
            Self::InvalidAccess { .. } => 15,
        }
    }

    pub(crate) fn syntax(text: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Syntax {
            text: text.into(),
            message: message.into(),
        }
    }
}

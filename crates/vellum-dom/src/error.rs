//! DOM Operation Errors
//!
//! Structured errors carrying the standard numeric exception code.

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// Index outside the valid range of a list
    #[error("index {index} is out of range for length {len}")]
    IndexSize { index: usize, len: usize },
    /// Illegal child kind, ancestor cycle, or duplicate document root
    #[error("hierarchy violation: {detail}")]
    HierarchyRequest { detail: &'static str },
    /// Node used in a document other than the one that owns it
    #[error("node belongs to a different document")]
    WrongDocument,
    /// Illegal character in an element, attribute, or entity name
    #[error("invalid character in name `{name}`")]
    InvalidCharacter { name: String },
    /// Mutation attempted on a readonly node or subtree
    #[error("subtree is read-only")]
    NoModificationAllowed,
    /// Referenced child or attribute does not exist
    #[error("node or attribute not found")]
    NotFound,
    /// Operation not implemented for this node kind
    #[error("operation not supported: {detail}")]
    NotSupported { detail: &'static str },
    /// Attribute node already owned by another element
    #[error("attribute is already in use by another element")]
    InUseAttribute,
    /// Object is in an unusable state (e.g. a stopped owner thread)
    #[error("object is in an invalid state")]
    InvalidState,
    /// Malformed qualified name or prefix/URI mismatch
    #[error("namespace error for `{name}`")]
    Namespace { name: String },
}

impl DomError {
    /// Standard numeric exception code for this error.
    pub fn code(&self) -> u16 {
        match self {
            Self::IndexSize { .. } => 1,
            Self::HierarchyRequest { .. } => 3,
            Self::WrongDocument => 4,
            Self::InvalidCharacter { .. } => 5,
            Self::NoModificationAllowed => 7,
            Self::NotFound => 8,
            Self::NotSupported { .. } => 9,
            Self::InUseAttribute => 10,
            Self::InvalidState => 11,
            Self::Namespace { .. } => 14,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(DomError::WrongDocument.code(), 4);
        assert_eq!(DomError::NoModificationAllowed.code(), 7);
        assert_eq!(DomError::NotFound.code(), 8);
        assert_eq!(
            DomError::Namespace {
                name: "a:b".into()
            }
            .code(),
            14
        );
    }

    #[test]
    fn test_error_display() {
        let err = DomError::InvalidCharacter {
            name: "bad name".into(),
        };
        assert!(err.to_string().contains("bad name"));
    }
}

//! Name Validation
//!
//! Structural validity checks for element, attribute, and entity names,
//! including namespace well-formedness for qualified names.

use crate::error::{DomError, DomResult};

/// The XML namespace, bound to the reserved `xml` prefix.
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// The namespace-declaration namespace, bound to `xmlns`.
pub const XMLNS_NS: &str = "http://www.w3.org/2000/xmlns/";

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_numeric() || c == '-' || c == '.'
}

/// Validate a plain (non-qualified) name.
///
/// Accepts one optional colon so callers may pass qualified names through;
/// prefix/URI consistency is the job of [`validate_qualified_name`].
pub fn validate_name(name: &str) -> DomResult<()> {
    let mut chars = name.chars();
    let first = chars.next().ok_or_else(|| DomError::InvalidCharacter {
        name: name.to_owned(),
    })?;
    if !is_name_start(first) {
        return Err(DomError::InvalidCharacter {
            name: name.to_owned(),
        });
    }
    for c in chars {
        if !is_name_char(c) && c != ':' {
            return Err(DomError::InvalidCharacter {
                name: name.to_owned(),
            });
        }
    }
    Ok(())
}

/// Validate a qualified name against a namespace URI.
///
/// Returns the split (prefix, local part) on success.
pub fn validate_qualified_name(
    namespace: Option<&str>,
    qualified: &str,
) -> DomResult<(Option<String>, String)> {
    validate_name(qualified)?;

    let namespace_err = || DomError::Namespace {
        name: qualified.to_owned(),
    };

    let mut parts = qualified.split(':');
    let (prefix, local) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), None, _) => (None, local),
        (Some(prefix), Some(local), None) => {
            if prefix.is_empty() || local.is_empty() {
                return Err(namespace_err());
            }
            (Some(prefix), local)
        }
        // More than one colon is malformed
        _ => return Err(namespace_err()),
    };

    if let Some(prefix) = prefix {
        // A prefixed name must carry a namespace, and the reserved
        // prefixes must carry their reserved URIs.
        match namespace {
            None => return Err(namespace_err()),
            Some(XML_NS) => {}
            Some(_) if prefix == "xml" => return Err(namespace_err()),
            Some(uri) => {
                if prefix == "xmlns" && uri != XMLNS_NS {
                    return Err(namespace_err());
                }
            }
        }
    } else if qualified == "xmlns" && namespace.is_some_and(|uri| uri != XMLNS_NS) {
        return Err(namespace_err());
    }

    Ok((prefix.map(str::to_owned), local.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name_accepts_simple_names() {
        assert!(validate_name("div").is_ok());
        assert!(validate_name("_private").is_ok());
        assert!(validate_name("svg-rect").is_ok());
        assert!(validate_name("a1.b2").is_ok());
    }

    #[test]
    fn test_validate_name_rejects_illegal_names() {
        assert!(matches!(
            validate_name(""),
            Err(DomError::InvalidCharacter { .. })
        ));
        assert!(matches!(
            validate_name("1div"),
            Err(DomError::InvalidCharacter { .. })
        ));
        assert!(matches!(
            validate_name("a b"),
            Err(DomError::InvalidCharacter { .. })
        ));
    }

    #[test]
    fn test_qualified_name_split() {
        let (prefix, local) =
            validate_qualified_name(Some("http://example.com/ns"), "ex:rect").unwrap();
        assert_eq!(prefix.as_deref(), Some("ex"));
        assert_eq!(local, "rect");

        let (prefix, local) = validate_qualified_name(None, "rect").unwrap();
        assert!(prefix.is_none());
        assert_eq!(local, "rect");
    }

    #[test]
    fn test_prefix_without_namespace_is_rejected() {
        assert!(matches!(
            validate_qualified_name(None, "ex:rect"),
            Err(DomError::Namespace { .. })
        ));
    }

    #[test]
    fn test_reserved_prefixes() {
        assert!(validate_qualified_name(Some(XML_NS), "xml:lang").is_ok());
        assert!(matches!(
            validate_qualified_name(Some("http://example.com"), "xml:lang"),
            Err(DomError::Namespace { .. })
        ));
        assert!(matches!(
            validate_qualified_name(Some("http://example.com"), "xmlns:ex"),
            Err(DomError::Namespace { .. })
        ));
        assert!(validate_qualified_name(Some(XMLNS_NS), "xmlns:ex").is_ok());
    }

    #[test]
    fn test_double_colon_is_malformed() {
        assert!(matches!(
            validate_qualified_name(Some("http://example.com"), "a:b:c"),
            Err(DomError::Namespace { .. })
        ));
    }
}

//! Rule / Sheet Model
//!
//! Style rules, nested `@media` and `@import`, and ordered rule lists.
//! Owner links are realized structurally: a sheet owns its rules, a media
//! rule owns its nested list, an import rule owns its eagerly parsed
//! target sheet.

use std::fmt;

use crate::declaration::StyleDeclaration;
use crate::error::{CssError, CssResult};
use crate::media::MediaList;
use crate::parser::ParseContext;
use crate::selector::SelectorList;

/// A selector list plus its declaration block.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    pub selectors: SelectorList,
    pub declaration: StyleDeclaration,
}

/// `@media` with a nested rule list.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRule {
    pub media: MediaList,
    pub rules: Vec<CssRule>,
}

/// `@import`, resolved and parsed eagerly at parse time.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRule {
    pub uri: String,
    pub media: MediaList,
    pub sheet: StyleSheet,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CssRule {
    Style(StyleRule),
    Media(MediaRule),
    Import(ImportRule),
}

impl CssRule {
    pub fn css_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CssRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Style(rule) => {
                write!(f, "{} {{ {} }}", rule.selectors, rule.declaration)
            }
            Self::Media(rule) => {
                write!(f, "@media {} {{ ", rule.media)?;
                for nested in &rule.rules {
                    write!(f, "{nested} ")?;
                }
                write!(f, "}}")
            }
            Self::Import(rule) => {
                if rule.media.is_empty() {
                    write!(f, "@import url({});", rule.uri)
                } else {
                    write!(f, "@import url({}) {};", rule.uri, rule.media)
                }
            }
        }
    }
}

/// A stylesheet: media constraints plus an ordered rule list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleSheet {
    /// Location the sheet was loaded from, when it came from `@import`.
    pub href: Option<String>,
    pub media: MediaList,
    pub rules: Vec<CssRule>,
}

impl StyleSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rule(&self, index: usize) -> Option<&CssRule> {
        self.rules.get(index)
    }

    /// Parse one rule through a transient parser session and splice it in
    /// at `index`.
    pub fn insert_rule(&mut self, text: &str, index: usize, ctx: &ParseContext) -> CssResult<()> {
        insert_into(&mut self.rules, text, index, ctx)
    }

    /// Remove the rule at `index`.
    pub fn delete_rule(&mut self, index: usize) -> CssResult<CssRule> {
        delete_from(&mut self.rules, index)
    }

    pub fn css_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for StyleSheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rule) in self.rules.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{rule}")?;
        }
        Ok(())
    }
}

impl MediaRule {
    /// Splice a parsed rule into the nested list at `index`.
    pub fn insert_rule(&mut self, text: &str, index: usize, ctx: &ParseContext) -> CssResult<()> {
        insert_into(&mut self.rules, text, index, ctx)
    }

    pub fn delete_rule(&mut self, index: usize) -> CssResult<CssRule> {
        delete_from(&mut self.rules, index)
    }
}

fn insert_into(
    rules: &mut Vec<CssRule>,
    text: &str,
    index: usize,
    ctx: &ParseContext,
) -> CssResult<()> {
    if index > rules.len() {
        return Err(CssError::IndexSize {
            index,
            len: rules.len(),
        });
    }
    let rule = crate::parser::parse_rule(text, ctx)?;
    rules.insert(index, rule);
    Ok(())
}

fn delete_from(rules: &mut Vec<CssRule>, index: usize) -> CssResult<CssRule> {
    if index >= rules.len() {
        return Err(CssError::IndexSize {
            index,
            len: rules.len(),
        });
    }
    Ok(rules.remove(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ParseContext {
        ParseContext::default()
    }

    #[test]
    fn test_insert_rule_splices_at_index() {
        let mut sheet = StyleSheet::new();
        sheet.insert_rule("a { color: red; }", 0, &ctx()).unwrap();
        sheet.insert_rule("b { color: blue; }", 0, &ctx()).unwrap();
        sheet.insert_rule("c { color: green; }", 1, &ctx()).unwrap();

        let texts: Vec<String> = sheet.rules.iter().map(CssRule::css_text).collect();
        assert!(texts[0].starts_with('b'));
        assert!(texts[1].starts_with('c'));
        assert!(texts[2].starts_with('a'));
    }

    #[test]
    fn test_insert_rule_index_out_of_range() {
        let mut sheet = StyleSheet::new();
        assert_eq!(
            sheet.insert_rule("a { }", 1, &ctx()),
            Err(CssError::IndexSize { index: 1, len: 0 })
        );
    }

    #[test]
    fn test_insert_invalid_rule_is_syntax_error() {
        let mut sheet = StyleSheet::new();
        let err = sheet.insert_rule("not a rule %%", 0, &ctx()).unwrap_err();
        assert!(matches!(err, CssError::Syntax { .. }));
        // Failure left the sheet untouched
        assert!(sheet.is_empty());
    }

    #[test]
    fn test_delete_rule() {
        let mut sheet = StyleSheet::new();
        sheet.insert_rule("a { color: red; }", 0, &ctx()).unwrap();
        assert!(sheet.delete_rule(0).is_ok());
        assert!(sheet.is_empty());
        assert_eq!(
            sheet.delete_rule(0),
            Err(CssError::IndexSize { index: 0, len: 0 })
        );
    }

    #[test]
    fn test_rule_css_text_round_trip() {
        let mut sheet = StyleSheet::new();
        sheet
            .insert_rule(".box > rect { color: red; width: 10px !important; }", 0, &ctx())
            .unwrap();
        let text = sheet.rules[0].css_text();
        assert_eq!(text, ".box > rect { color: red; width: 10px !important; }");
    }
}

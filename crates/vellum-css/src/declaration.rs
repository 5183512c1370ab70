//! Style Declaration
//!
//! Ordered map from property name to a single slot holding value, priority
//! flag, and origin tag. Setting a property always replaces the slot
//! outright; the cascade clones values before inserting them so a live
//! author declaration and a frozen computed result never alias.

use std::fmt;

use crate::error::CssResult;
use crate::value::CssValue;

/// Source bucket a declaration came from, used to order cascade layering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    UserAgent,
    User,
    Author,
}

/// One property slot.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySlot {
    pub name: String,
    pub value: CssValue,
    pub important: bool,
    pub origin: Origin,
}

/// Ordered property map. Names compare case-insensitively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleDeclaration {
    slots: Vec<PropertySlot>,
}

impl StyleDeclaration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Property name at `index`, in declaration order.
    pub fn item(&self, index: usize) -> Option<&str> {
        self.slots.get(index).map(|s| s.name.as_str())
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn get_value(&self, name: &str) -> Option<&CssValue> {
        self.find(name).map(|i| &self.slots[i].value)
    }

    /// Serialized value text, empty when the property is unset.
    pub fn get_property_value(&self, name: &str) -> String {
        self.get_value(name)
            .map(CssValue::css_text)
            .unwrap_or_default()
    }

    /// "important" when the priority flag is set, empty otherwise.
    pub fn get_property_priority(&self, name: &str) -> &'static str {
        match self.find(name) {
            Some(i) if self.slots[i].important => "important",
            _ => "",
        }
    }

    pub fn get_origin(&self, name: &str) -> Option<Origin> {
        self.find(name).map(|i| self.slots[i].origin)
    }

    /// Direct API set: replaces the slot outright, origin Author.
    pub fn set_property(&mut self, name: &str, value: CssValue, important: bool) {
        self.set_property_with_origin(name, value, important, Origin::Author);
    }

    /// Cascade-layer set: replaces the slot outright with an explicit origin.
    pub fn set_property_with_origin(
        &mut self,
        name: &str,
        value: CssValue,
        important: bool,
        origin: Origin,
    ) {
        let slot = PropertySlot {
            name: name.to_ascii_lowercase(),
            value,
            important,
            origin,
        };
        match self.find(name) {
            Some(i) => self.slots[i] = slot,
            None => self.slots.push(slot),
        }
    }

    pub fn remove_property(&mut self, name: &str) -> Option<CssValue> {
        let i = self.find(name)?;
        Some(self.slots.remove(i).value)
    }

    /// Layer every slot of `other` over this declaration, tagging the new
    /// slots with `origin`. Values are cloned (read-only copies) so the
    /// source declaration and this one never share storage.
    pub fn apply_from(&mut self, other: &StyleDeclaration, origin: Origin) {
        for slot in &other.slots {
            self.set_property_with_origin(&slot.name, slot.value.clone(), slot.important, origin);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertySlot> {
        self.slots.iter()
    }

    /// Serialized declaration list.
    pub fn css_text(&self) -> String {
        self.to_string()
    }

    /// Re-parse the whole declaration from text. A parse failure leaves
    /// the previous slots in place. Re-parsed entries carry origin Author.
    pub fn set_css_text(&mut self, text: &str) -> CssResult<()> {
        let parsed = crate::parser::parse_declaration_list(text, true)?;
        *self = parsed;
        Ok(())
    }
}

impl fmt::Display for StyleDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, slot) in self.slots.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}: {}", slot.name, slot.value)?;
            if slot.important {
                write!(f, " !important")?;
            }
            write!(f, ";")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Unit;

    #[test]
    fn test_set_replaces_slot_outright() {
        let mut decl = StyleDeclaration::new();
        decl.set_property("color", CssValue::Ident("red".into()), true);
        decl.set_property("color", CssValue::Ident("blue".into()), false);

        assert_eq!(decl.len(), 1);
        assert_eq!(decl.get_value("color"), Some(&CssValue::Ident("blue".into())));
        assert_eq!(decl.get_property_priority("color"), "");
    }

    #[test]
    fn test_names_compare_case_insensitively() {
        let mut decl = StyleDeclaration::new();
        decl.set_property("COLOR", CssValue::Ident("red".into()), false);
        assert_eq!(decl.get_property_value("color"), "red");
        assert_eq!(decl.item(0), Some("color"));
    }

    #[test]
    fn test_apply_from_overwrites_and_retags() {
        let mut base = StyleDeclaration::new();
        base.set_property_with_origin(
            "color",
            CssValue::Ident("black".into()),
            false,
            Origin::UserAgent,
        );

        let mut author = StyleDeclaration::new();
        author.set_property("color", CssValue::Ident("red".into()), false);
        author.set_property("font-size", CssValue::Dimension(12.0, Unit::Px), false);

        base.apply_from(&author, Origin::Author);
        assert_eq!(base.get_property_value("color"), "red");
        assert_eq!(base.get_origin("color"), Some(Origin::Author));
        assert_eq!(base.len(), 2);
    }

    #[test]
    fn test_remove_property() {
        let mut decl = StyleDeclaration::new();
        decl.set_property("color", CssValue::Ident("red".into()), false);
        assert_eq!(
            decl.remove_property("color"),
            Some(CssValue::Ident("red".into()))
        );
        assert!(decl.is_empty());
        assert_eq!(decl.remove_property("color"), None);
    }

    #[test]
    fn test_css_text_shape() {
        let mut decl = StyleDeclaration::new();
        decl.set_property("color", CssValue::Ident("red".into()), false);
        decl.set_property("font-size", CssValue::Dimension(12.0, Unit::Px), true);
        assert_eq!(decl.css_text(), "color: red; font-size: 12px !important;");
    }
}

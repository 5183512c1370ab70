//! Computed-Style View
//!
//! A read-only view over the effective declaration for one (element,
//! pseudo-element) pair. All reads delegate to the frozen declaration;
//! every mutating entry point fails InvalidAccess.

use std::rc::Rc;

use vellum_dom::{Document, NodeId};

use crate::cascade::StyleResolver;
use crate::declaration::StyleDeclaration;
use crate::error::{CssError, CssResult};
use crate::value::CssValue;

/// Frozen computed style for one (element, pseudo) pair.
#[derive(Debug, Clone)]
pub struct ComputedStyleView {
    element: NodeId,
    pseudo: String,
    style: Rc<StyleDeclaration>,
}

impl ComputedStyleView {
    pub fn element(&self) -> NodeId {
        self.element
    }

    pub fn pseudo(&self) -> &str {
        &self.pseudo
    }

    pub fn len(&self) -> usize {
        self.style.len()
    }

    pub fn is_empty(&self) -> bool {
        self.style.is_empty()
    }

    pub fn item(&self, index: usize) -> Option<&str> {
        self.style.item(index)
    }

    pub fn get_value(&self, name: &str) -> Option<&CssValue> {
        self.style.get_value(name)
    }

    pub fn get_property_value(&self, name: &str) -> String {
        self.style.get_property_value(name)
    }

    pub fn get_property_priority(&self, name: &str) -> &'static str {
        self.style.get_property_priority(name)
    }

    pub fn css_text(&self) -> String {
        self.style.css_text()
    }

    /// Computed styles are structurally read-only.
    pub fn set_property(
        &mut self,
        _name: &str,
        _value: CssValue,
        _important: bool,
    ) -> CssResult<()> {
        Err(CssError::InvalidAccess {
            detail: "computed styles are read-only",
        })
    }

    pub fn remove_property(&mut self, _name: &str) -> CssResult<CssValue> {
        Err(CssError::InvalidAccess {
            detail: "computed styles are read-only",
        })
    }

    pub fn set_css_text(&mut self, _text: &str) -> CssResult<()> {
        Err(CssError::InvalidAccess {
            detail: "computed styles are read-only",
        })
    }
}

impl StyleResolver {
    /// Compute and wrap the style for (element, pseudo) in a read-only view.
    pub fn computed_view(
        &mut self,
        doc: &Document,
        element: NodeId,
        pseudo: &str,
    ) -> CssResult<ComputedStyleView> {
        let style = self.compute_style(doc, element, pseudo)?;
        Ok(ComputedStyleView {
            element,
            pseudo: pseudo.to_owned(),
            style,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::EngineConfig;
    use vellum_dom::Document;

    #[test]
    fn test_view_reads_and_rejects_writes() {
        let mut doc = Document::new();
        let svg = doc.create_element("svg").unwrap();
        doc.append_child(doc.document_node(), svg).unwrap();
        doc.set_attribute(svg, "style", "color: red").unwrap();

        let mut resolver = StyleResolver::new(EngineConfig::default());
        let mut view = resolver.computed_view(&doc, svg, "").unwrap();

        assert_eq!(view.get_property_value("color"), "red");
        assert_eq!(view.pseudo(), "");
        assert!(view.len() > 0);
        assert!(matches!(
            view.set_property("color", CssValue::Ident("blue".into()), false),
            Err(CssError::InvalidAccess { .. })
        ));
        assert!(matches!(
            view.set_css_text("color: blue"),
            Err(CssError::InvalidAccess { .. })
        ));
        assert!(matches!(
            view.remove_property("color"),
            Err(CssError::InvalidAccess { .. })
        ));
        // Writes failed without touching the underlying declaration
        assert_eq!(view.get_property_value("color"), "red");
    }
}

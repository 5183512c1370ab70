//! Property Registry
//!
//! One handler per property that needs special treatment after assembly:
//! the inherited flag, the initial value substituted for unset slots, and
//! an optional relative-value resolver (percentages, em units, keyword
//! sizes). Registered on the engine configuration, never global.

use crate::value::{CssValue, Unit};

/// Resolver applied after assembly: (assembled value, parent computed
/// value of the same property) to the final value.
pub type ResolveFn = fn(&CssValue, Option<&CssValue>) -> CssValue;

#[derive(Debug, Clone)]
pub struct PropertyHandler {
    pub name: &'static str,
    pub inherited: bool,
    pub initial: CssValue,
    pub resolve: Option<ResolveFn>,
}

/// Ordered set of property handlers.
#[derive(Debug, Clone)]
pub struct PropertyRegistry {
    handlers: Vec<PropertyHandler>,
}

impl PropertyRegistry {
    pub fn empty() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// The standard handler set.
    pub fn defaults() -> Self {
        let mut registry = Self::empty();
        for handler in [
            PropertyHandler {
                name: "color",
                inherited: true,
                initial: CssValue::Ident("black".into()),
                resolve: None,
            },
            PropertyHandler {
                name: "display",
                inherited: false,
                initial: CssValue::Ident("inline".into()),
                resolve: None,
            },
            PropertyHandler {
                name: "visibility",
                inherited: true,
                initial: CssValue::Ident("visible".into()),
                resolve: None,
            },
            PropertyHandler {
                name: "font-size",
                inherited: true,
                initial: CssValue::Ident("medium".into()),
                resolve: Some(resolve_font_size),
            },
            PropertyHandler {
                name: "font-family",
                inherited: true,
                initial: CssValue::Ident("sans-serif".into()),
                resolve: None,
            },
            PropertyHandler {
                name: "font-weight",
                inherited: true,
                initial: CssValue::Ident("normal".into()),
                resolve: None,
            },
            PropertyHandler {
                name: "font-style",
                inherited: true,
                initial: CssValue::Ident("normal".into()),
                resolve: None,
            },
            PropertyHandler {
                name: "background-color",
                inherited: false,
                initial: CssValue::Ident("transparent".into()),
                resolve: None,
            },
            PropertyHandler {
                name: "text-align",
                inherited: true,
                initial: CssValue::Ident("left".into()),
                resolve: None,
            },
            PropertyHandler {
                name: "line-height",
                inherited: true,
                initial: CssValue::Ident("normal".into()),
                resolve: None,
            },
        ] {
            registry.register(handler);
        }
        registry
    }

    /// Register a handler, replacing any prior one for the same property.
    pub fn register(&mut self, handler: PropertyHandler) {
        match self
            .handlers
            .iter()
            .position(|h| h.name.eq_ignore_ascii_case(handler.name))
        {
            Some(i) => self.handlers[i] = handler,
            None => self.handlers.push(handler),
        }
    }

    pub fn handler(&self, name: &str) -> Option<&PropertyHandler> {
        self.handlers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
    }

    pub fn handlers(&self) -> &[PropertyHandler] {
        &self.handlers
    }
}

/// Absolute length in pixels, if the value is absolute.
fn absolute_px(value: &CssValue) -> Option<f32> {
    match value {
        CssValue::Number(v) => Some(*v),
        CssValue::Dimension(v, unit) => match unit {
            Unit::Px => Some(*v),
            Unit::Pt => Some(v * 96.0 / 72.0),
            Unit::Pc => Some(*v * 16.0),
            Unit::In => Some(v * 96.0),
            Unit::Cm => Some(v * 96.0 / 2.54),
            Unit::Mm => Some(v * 96.0 / 25.4),
            Unit::Em | Unit::Ex => None,
        },
        _ => None,
    }
}

const MEDIUM_PX: f32 = 16.0;

/// Font sizes resolve against the parent's computed size: percentages and
/// em/ex are relative, keyword sizes map to the standard scale.
fn resolve_font_size(value: &CssValue, parent: Option<&CssValue>) -> CssValue {
    let parent_px = parent.and_then(absolute_px).unwrap_or(MEDIUM_PX);
    let px = match value {
        CssValue::Percentage(p) => parent_px * p / 100.0,
        CssValue::Dimension(v, Unit::Em) => parent_px * v,
        CssValue::Dimension(v, Unit::Ex) => parent_px * v * 0.5,
        CssValue::Ident(keyword) => match keyword.to_ascii_lowercase().as_str() {
            "xx-small" => MEDIUM_PX * 3.0 / 5.0,
            "x-small" => MEDIUM_PX * 3.0 / 4.0,
            "small" => MEDIUM_PX * 8.0 / 9.0,
            "medium" => MEDIUM_PX,
            "large" => MEDIUM_PX * 6.0 / 5.0,
            "x-large" => MEDIUM_PX * 3.0 / 2.0,
            "xx-large" => MEDIUM_PX * 2.0,
            "larger" => parent_px * 1.25,
            "smaller" => parent_px * 0.8,
            _ => return value.clone(),
        },
        other => match absolute_px(other) {
            Some(px) => px,
            None => return value.clone(),
        },
    };
    CssValue::Dimension(px, Unit::Px)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_replaces_by_name() {
        let mut registry = PropertyRegistry::defaults();
        let before = registry.handlers().len();
        registry.register(PropertyHandler {
            name: "color",
            inherited: true,
            initial: CssValue::Ident("white".into()),
            resolve: None,
        });
        assert_eq!(registry.handlers().len(), before);
        assert_eq!(
            registry.handler("COLOR").unwrap().initial,
            CssValue::Ident("white".into())
        );
    }

    #[test]
    fn test_font_size_percentage_resolves_against_parent() {
        let parent = CssValue::Dimension(20.0, Unit::Px);
        let resolved = resolve_font_size(&CssValue::Percentage(50.0), Some(&parent));
        assert_eq!(resolved, CssValue::Dimension(10.0, Unit::Px));
    }

    #[test]
    fn test_font_size_em_and_keywords() {
        let parent = CssValue::Dimension(10.0, Unit::Px);
        assert_eq!(
            resolve_font_size(&CssValue::Dimension(2.0, Unit::Em), Some(&parent)),
            CssValue::Dimension(20.0, Unit::Px)
        );
        assert_eq!(
            resolve_font_size(&CssValue::Ident("medium".into()), Some(&parent)),
            CssValue::Dimension(16.0, Unit::Px)
        );
        assert_eq!(
            resolve_font_size(&CssValue::Ident("larger".into()), Some(&parent)),
            CssValue::Dimension(12.5, Unit::Px)
        );
    }

    #[test]
    fn test_absolute_units_convert_to_px() {
        assert_eq!(
            resolve_font_size(&CssValue::Dimension(72.0, Unit::Pt), None),
            CssValue::Dimension(96.0, Unit::Px)
        );
        assert_eq!(
            resolve_font_size(&CssValue::Dimension(1.0, Unit::In), None),
            CssValue::Dimension(96.0, Unit::Px)
        );
    }
}

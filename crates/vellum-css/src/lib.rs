//! vellum CSS - Cascade & Style Resolution
//!
//! Computes the effective style declaration for any (element,
//! pseudo-element) pair from six ordered origin layers, with
//! specificity-sorted rule matching, inheritance resolution, and
//! generation-stamped computed-style caching. Tokenization is consumed
//! from `cssparser` callbacks, never done here.

mod cascade;
mod computed;
mod declaration;
mod error;
mod media;
mod parser;
mod properties;
mod rule;
mod selector;
mod value;

pub use cascade::{
    default_ua_stylesheet, EngineConfig, PresentationalHints, StyleParentResolver, StyleResolver,
};
pub use computed::ComputedStyleView;
pub use declaration::{Origin, PropertySlot, StyleDeclaration};
pub use error::{CssError, CssResult};
pub use media::MediaList;
pub use parser::{
    parse_declaration_list, parse_media_list, parse_rule, parse_selector_list, parse_stylesheet,
    parse_value, ImportLoader, ParseContext,
};
pub use properties::{PropertyHandler, PropertyRegistry, ResolveFn};
pub use rule::{CssRule, ImportRule, MediaRule, StyleRule, StyleSheet};
pub use selector::{
    collect_rules, sort_rules, AttrOp, Combinator, ComplexSelector, CompoundSelector, PseudoClass,
    Selector, SelectorList, SimpleSelector, Specificity,
};
pub use value::{CssValue, LiveValue, PrimitiveKind, Rgba, Unit, ValueFactory, ValueKind};

//! Cascade Engine
//!
//! Assembles the computed style for an (element, pseudo-element) pair by
//! layering six origin layers in fixed order, then resolving inheritance
//! and relative values through the property registry. Results are cached
//! behind generation stamps: any document mutation or sheet change makes
//! the affected entries recompute on next access.

use std::collections::HashMap;
use std::rc::Rc;

use vellum_dom::{Document, NodeId, NodeKind};

use crate::declaration::{Origin, StyleDeclaration};
use crate::error::{CssError, CssResult};
use crate::media::MediaList;
use crate::parser::{self, ImportLoader, ParseContext};
use crate::properties::{PropertyHandler, PropertyRegistry};
use crate::rule::{StyleRule, StyleSheet};
use crate::selector::{collect_rules, sort_rules};
use crate::value::CssValue;

/// Capability: legacy attribute-derived style, queried only when the
/// element exposes it and only for the element itself (empty pseudo).
pub trait PresentationalHints {
    fn hints(&self, doc: &Document, element: NodeId) -> Option<StyleDeclaration>;
}

/// Capability: a synthetic inheritance parent (a "hidden child" host),
/// consulted before the real tree parent.
pub trait StyleParentResolver {
    fn style_parent(&self, doc: &Document, element: NodeId) -> Option<NodeId>;
}

/// Per-engine configuration, passed at construction. No global state.
pub struct EngineConfig {
    pub ua_sheets: Vec<StyleSheet>,
    pub user_sheets: Vec<StyleSheet>,
    /// Active media of the view this engine computes for.
    pub view_media: MediaList,
    /// Loader for `@import` targets.
    pub loader: Option<Rc<ImportLoader>>,
    pub hints: Option<Box<dyn PresentationalHints>>,
    pub style_parent: Option<Box<dyn StyleParentResolver>>,
    pub registry: PropertyRegistry,
    pub cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ua_sheets: Vec::new(),
            user_sheets: Vec::new(),
            view_media: MediaList::new(),
            loader: None,
            hints: None,
            style_parent: None,
            registry: PropertyRegistry::defaults(),
            cache_capacity: 1024,
        }
    }
}

const DEFAULT_UA_CSS: &str = "\
    * { display: inline; } \
    svg, g, symbol, marker, pattern, mask { display: block; } \
    defs, title, desc, metadata { display: none; }";

/// The stock user-agent sheet an engine starts from when the embedder
/// does not supply one.
pub fn default_ua_stylesheet() -> StyleSheet {
    match parser::parse_stylesheet(DEFAULT_UA_CSS, &ParseContext::new()) {
        Ok(sheet) => sheet,
        Err(error) => {
            tracing::warn!(%error, "default user-agent sheet failed to parse");
            StyleSheet::new()
        }
    }
}

struct CacheEntry {
    doc_generation: u64,
    sheet_generation: u64,
    style: Rc<StyleDeclaration>,
}

/// The per-view cascade engine.
pub struct StyleResolver {
    config: EngineConfig,
    author_sheets: Vec<StyleSheet>,
    override_styles: HashMap<NodeId, StyleDeclaration>,
    sheet_generation: u64,
    cache: HashMap<(NodeId, String), CacheEntry>,
}

impl StyleResolver {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            author_sheets: Vec::new(),
            override_styles: HashMap::new(),
            sheet_generation: 0,
            cache: HashMap::new(),
        }
    }

    /// A parser session carrying this engine's import loader.
    pub fn parse_context(&self) -> ParseContext {
        match &self.config.loader {
            Some(loader) => ParseContext::with_loader(Rc::clone(loader)),
            None => ParseContext::new(),
        }
    }

    /// Attach an author stylesheet to the document view.
    pub fn add_stylesheet(&mut self, sheet: StyleSheet) {
        self.author_sheets.push(sheet);
        self.touch_sheets();
    }

    /// Parse and attach author stylesheet text.
    pub fn add_stylesheet_text(&mut self, css: &str) -> CssResult<()> {
        let sheet = parser::parse_stylesheet(css, &self.parse_context())?;
        self.add_stylesheet(sheet);
        Ok(())
    }

    pub fn stylesheets(&self) -> &[StyleSheet] {
        &self.author_sheets
    }

    pub fn remove_stylesheet(&mut self, index: usize) -> CssResult<StyleSheet> {
        if index >= self.author_sheets.len() {
            return Err(CssError::IndexSize {
                index,
                len: self.author_sheets.len(),
            });
        }
        self.touch_sheets();
        Ok(self.author_sheets.remove(index))
    }

    /// Edit an attached sheet in place (insert/delete rules); any edit
    /// invalidates cached computed styles.
    pub fn update_stylesheet<R>(
        &mut self,
        index: usize,
        edit: impl FnOnce(&mut StyleSheet, &ParseContext) -> R,
    ) -> CssResult<R> {
        let len = self.author_sheets.len();
        let ctx = self.parse_context();
        let sheet = self
            .author_sheets
            .get_mut(index)
            .ok_or(CssError::IndexSize { index, len })?;
        let out = edit(sheet, &ctx);
        self.touch_sheets();
        Ok(out)
    }

    /// Programmatic override style, the highest-precedence layer.
    pub fn set_override_style(&mut self, element: NodeId, style: Option<StyleDeclaration>) {
        match style {
            Some(style) => {
                self.override_styles.insert(element, style);
            }
            None => {
                self.override_styles.remove(&element);
            }
        }
        self.touch_sheets();
    }

    fn touch_sheets(&mut self) {
        self.sheet_generation += 1;
    }

    /// The effective style declaration for (element, pseudo), computed
    /// through the cache.
    pub fn compute_style(
        &mut self,
        doc: &Document,
        element: NodeId,
        pseudo: &str,
    ) -> CssResult<Rc<StyleDeclaration>> {
        if doc.kind(element) != Some(NodeKind::Element) {
            return Err(CssError::InvalidAccess {
                detail: "computed styles exist only for elements",
            });
        }
        let key = (element, pseudo.to_owned());
        if let Some(entry) = self.cache.get(&key) {
            if entry.doc_generation == doc.generation()
                && entry.sheet_generation == self.sheet_generation
            {
                return Ok(Rc::clone(&entry.style));
            }
        }
        tracing::trace!(pseudo, "recomputing style");
        let style = Rc::new(self.assemble(doc, element, pseudo)?);
        if self.cache.len() >= self.config.cache_capacity {
            self.cache.clear();
        }
        self.cache.insert(
            key,
            CacheEntry {
                doc_generation: doc.generation(),
                sheet_generation: self.sheet_generation,
                style: Rc::clone(&style),
            },
        );
        Ok(style)
    }

    fn assemble(
        &mut self,
        doc: &Document,
        element: NodeId,
        pseudo: &str,
    ) -> CssResult<StyleDeclaration> {
        let mut computed = StyleDeclaration::new();
        {
            let view = &self.config.view_media;
            // 1. user-agent rules
            layer_from_sheets(
                &mut computed,
                &self.config.ua_sheets,
                doc,
                element,
                pseudo,
                view,
                Origin::UserAgent,
            );
            // 2. user rules
            layer_from_sheets(
                &mut computed,
                &self.config.user_sheets,
                doc,
                element,
                pseudo,
                view,
                Origin::User,
            );
            // 3. non-CSS presentational hints, element only
            if pseudo.is_empty() {
                if let Some(hints) = &self.config.hints {
                    if let Some(hinted) = hints.hints(doc, element) {
                        computed.apply_from(&hinted, Origin::Author);
                    }
                }
            }
            // 4. author rules across every attached sheet
            layer_from_sheets(
                &mut computed,
                &self.author_sheets,
                doc,
                element,
                pseudo,
                view,
                Origin::Author,
            );
            // 5. inline style
            if let Some(inline) = doc.get_attribute(element, "style") {
                match parser::parse_declaration_list(inline, false) {
                    Ok(decl) => computed.apply_from(&decl, Origin::Author),
                    Err(error) => {
                        tracing::debug!(%error, "ignoring unparsable inline style");
                    }
                }
            }
            // 6. override style, element only
            if pseudo.is_empty() {
                if let Some(over) = self.override_styles.get(&element) {
                    let over = over.clone();
                    computed.apply_from(&over, Origin::Author);
                }
            }
        }

        // Inheritance and relative-value resolution.
        let handlers: Vec<PropertyHandler> = self.config.registry.handlers().to_vec();
        for handler in handlers {
            let current = computed.get_value(handler.name).cloned();
            let slot_important = computed.get_property_priority(handler.name) == "important";
            let slot_origin = computed.get_origin(handler.name).unwrap_or(Origin::UserAgent);

            let needs_parent =
                handler.resolve.is_some() || matches!(current, None | Some(CssValue::Inherit));
            let parent_value = if needs_parent {
                match self.inheritance_parent(doc, element, pseudo) {
                    Some(parent) => {
                        let parent_style = self.compute_style(doc, parent, "")?;
                        parent_style.get_value(handler.name).cloned()
                    }
                    None => None,
                }
            } else {
                None
            };

            let effective = match &current {
                None if handler.inherited => parent_value
                    .clone()
                    .unwrap_or_else(|| handler.initial.clone()),
                None => handler.initial.clone(),
                Some(CssValue::Inherit) => parent_value
                    .clone()
                    .unwrap_or_else(|| handler.initial.clone()),
                Some(value) => value.clone(),
            };
            let resolved = match handler.resolve {
                Some(resolve) => resolve(&effective, parent_value.as_ref()),
                None => effective,
            };
            computed.set_property_with_origin(handler.name, resolved, slot_important, slot_origin);
        }
        Ok(computed)
    }

    /// The element whose computed style this pair inherits from: the
    /// element itself for pseudo-elements, a capability-provided synthetic
    /// parent when one exists, else the nearest ancestor element.
    fn inheritance_parent(&self, doc: &Document, element: NodeId, pseudo: &str) -> Option<NodeId> {
        if !pseudo.is_empty() {
            return Some(element);
        }
        if let Some(resolver) = &self.config.style_parent {
            if let Some(parent) = resolver.style_parent(doc, element) {
                return Some(parent);
            }
        }
        let mut cursor = doc.parent_node(element);
        while let Some(n) = cursor {
            if doc.kind(n) == Some(NodeKind::Element) {
                return Some(n);
            }
            cursor = doc.parent_node(n);
        }
        None
    }
}

/// Collect and specificity-sort the matching rules of one origin layer,
/// then layer their declarations in order (later wins).
fn layer_from_sheets(
    computed: &mut StyleDeclaration,
    sheets: &[StyleSheet],
    doc: &Document,
    element: NodeId,
    pseudo: &str,
    view: &MediaList,
    origin: Origin,
) {
    let mut matched: Vec<&StyleRule> = Vec::new();
    for sheet in sheets {
        if sheet.media.matches(view) {
            collect_rules(&sheet.rules, doc, element, pseudo, view, &mut matched);
        }
    }
    for rule in sort_rules(matched, doc, element, pseudo) {
        computed.apply_from(&rule.declaration, origin);
    }
}

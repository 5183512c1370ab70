//! Selector Matching & Specificity
//!
//! Selector lists over compound selectors with descendant, child, and
//! adjacent-sibling combinators. Matching is evaluated right to left: the
//! subject compound must fit the (element, pseudo) pair, then the ancestor
//! chain is checked recursively, which backtracks across candidate
//! ancestors where a greedy walk would not.

use std::fmt;

use vellum_dom::{Document, NodeId, NodeKind};

use crate::media::MediaList;
use crate::rule::{CssRule, StyleRule};

/// Selector specificity (ids, classes/attributes/pseudo-classes, types)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity(pub u32, pub u32, pub u32);

impl Specificity {
    fn add(self, other: Specificity) -> Specificity {
        Specificity(self.0 + other.0, self.1 + other.1, self.2 + other.2)
    }
}

/// Attribute selector operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOp {
    /// `[attr]`
    Exists,
    /// `[attr=value]`
    Equals,
    /// `[attr~=value]` whitespace-separated list contains
    Includes,
    /// `[attr|=value]` exact or hyphen-prefixed
    DashMatch,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PseudoClass {
    FirstChild,
    LastChild,
    Root,
    Empty,
    Lang(String),
}

/// One simple selector part of a compound.
#[derive(Debug, Clone, PartialEq)]
pub enum SimpleSelector {
    Universal,
    Type(String),
    Id(String),
    Class(String),
    Attr {
        name: String,
        op: AttrOp,
        value: Option<String>,
    },
    PseudoClass(PseudoClass),
}

impl SimpleSelector {
    fn matches(&self, doc: &Document, element: NodeId) -> bool {
        match self {
            Self::Universal => true,
            Self::Type(name) => doc
                .element_name(element)
                .is_some_and(|q| q.local.eq_ignore_ascii_case(name)),
            Self::Id(id) => doc.get_attribute(element, "id") == Some(id.as_str()),
            Self::Class(class) => doc
                .get_attribute(element, "class")
                .is_some_and(|v| v.split_whitespace().any(|c| c == class)),
            Self::Attr { name, op, value } => {
                let actual = doc.get_attribute(element, name);
                match (op, actual, value.as_deref()) {
                    (AttrOp::Exists, actual, _) => actual.is_some(),
                    (_, None, _) => false,
                    (AttrOp::Equals, Some(a), Some(v)) => a == v,
                    (AttrOp::Includes, Some(a), Some(v)) => {
                        a.split_whitespace().any(|w| w == v)
                    }
                    (AttrOp::DashMatch, Some(a), Some(v)) => {
                        a == v || (a.starts_with(v) && a[v.len()..].starts_with('-'))
                    }
                    (_, Some(_), None) => false,
                }
            }
            Self::PseudoClass(pseudo) => match_pseudo_class(pseudo, doc, element),
        }
    }

    fn specificity(&self) -> Specificity {
        match self {
            Self::Universal => Specificity(0, 0, 0),
            Self::Type(_) => Specificity(0, 0, 1),
            Self::Id(_) => Specificity(1, 0, 0),
            Self::Class(_) | Self::Attr { .. } | Self::PseudoClass(_) => Specificity(0, 1, 0),
        }
    }
}

fn match_pseudo_class(pseudo: &PseudoClass, doc: &Document, element: NodeId) -> bool {
    match pseudo {
        PseudoClass::FirstChild => previous_element(doc, element).is_none(),
        PseudoClass::LastChild => next_element(doc, element).is_none(),
        PseudoClass::Root => {
            doc.parent_node(element)
                .is_some_and(|p| doc.kind(p) == Some(NodeKind::Document))
        }
        PseudoClass::Empty => doc.first_child(element).is_none(),
        PseudoClass::Lang(lang) => {
            // The language is taken from the nearest ancestor carrying a
            // lang or xml:lang attribute.
            let mut cursor = Some(element);
            while let Some(n) = cursor {
                let value = doc
                    .get_attribute(n, "lang")
                    .or_else(|| doc.get_attribute(n, "xml:lang"));
                if let Some(value) = value {
                    return value.eq_ignore_ascii_case(lang)
                        || (value.len() > lang.len()
                            && value[..lang.len()].eq_ignore_ascii_case(lang)
                            && value[lang.len()..].starts_with('-'));
                }
                cursor = doc.parent_node(n);
            }
            false
        }
    }
}

fn parent_element(doc: &Document, node: NodeId) -> Option<NodeId> {
    let mut cursor = doc.parent_node(node);
    while let Some(n) = cursor {
        if doc.kind(n) == Some(NodeKind::Element) {
            return Some(n);
        }
        cursor = doc.parent_node(n);
    }
    None
}

fn previous_element(doc: &Document, node: NodeId) -> Option<NodeId> {
    let mut cursor = doc.previous_sibling(node);
    while let Some(n) = cursor {
        if doc.kind(n) == Some(NodeKind::Element) {
            return Some(n);
        }
        cursor = doc.previous_sibling(n);
    }
    None
}

fn next_element(doc: &Document, node: NodeId) -> Option<NodeId> {
    let mut cursor = doc.next_sibling(node);
    while let Some(n) = cursor {
        if doc.kind(n) == Some(NodeKind::Element) {
            return Some(n);
        }
        cursor = doc.next_sibling(n);
    }
    None
}

/// A compound: simple selectors plus an optional pseudo-element, all of
/// which must hold on one element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompoundSelector {
    pub simples: Vec<SimpleSelector>,
    pub pseudo_element: Option<String>,
}

impl CompoundSelector {
    pub fn is_empty(&self) -> bool {
        self.simples.is_empty() && self.pseudo_element.is_none()
    }

    fn matches(&self, doc: &Document, element: NodeId, pseudo: &str) -> bool {
        let want = self.pseudo_element.as_deref().unwrap_or("");
        if !want.eq_ignore_ascii_case(pseudo) {
            return false;
        }
        self.simples.iter().all(|s| s.matches(doc, element))
    }

    fn specificity(&self) -> Specificity {
        let mut total = Specificity::default();
        for simple in &self.simples {
            total = total.add(simple.specificity());
        }
        if self.pseudo_element.is_some() {
            // Pseudo-elements count like type selectors.
            total = total.add(Specificity(0, 0, 1));
        }
        total
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
    NextSibling,
}

/// A complex selector, stored subject-last the way it is evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum ComplexSelector {
    Compound(CompoundSelector),
    Combined {
        ancestor: Box<ComplexSelector>,
        combinator: Combinator,
        subject: CompoundSelector,
    },
}

impl ComplexSelector {
    pub fn matches(&self, doc: &Document, element: NodeId, pseudo: &str) -> bool {
        match self {
            Self::Compound(compound) => compound.matches(doc, element, pseudo),
            Self::Combined {
                ancestor,
                combinator,
                subject,
            } => {
                if !subject.matches(doc, element, pseudo) {
                    return false;
                }
                match combinator {
                    Combinator::Child => parent_element(doc, element)
                        .is_some_and(|p| ancestor.matches(doc, p, "")),
                    Combinator::NextSibling => previous_element(doc, element)
                        .is_some_and(|p| ancestor.matches(doc, p, "")),
                    Combinator::Descendant => {
                        let mut cursor = parent_element(doc, element);
                        while let Some(candidate) = cursor {
                            if ancestor.matches(doc, candidate, "") {
                                return true;
                            }
                            cursor = parent_element(doc, candidate);
                        }
                        false
                    }
                }
            }
        }
    }

    pub fn specificity(&self) -> Specificity {
        match self {
            Self::Compound(compound) => compound.specificity(),
            Self::Combined {
                ancestor, subject, ..
            } => ancestor.specificity().add(subject.specificity()),
        }
    }
}

/// One selector of a rule's selector list.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    pub complex: ComplexSelector,
}

impl Selector {
    pub fn matches(&self, doc: &Document, element: NodeId, pseudo: &str) -> bool {
        self.complex.matches(doc, element, pseudo)
    }

    pub fn specificity(&self) -> Specificity {
        self.complex.specificity()
    }
}

/// A comma-separated selector list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectorList(pub Vec<Selector>);

impl SelectorList {
    pub fn matches(&self, doc: &Document, element: NodeId, pseudo: &str) -> bool {
        self.0.iter().any(|s| s.matches(doc, element, pseudo))
    }

    /// Specificity of the first selector in the list that matches the
    /// pair, not the maximum over all selectors.
    pub fn matching_specificity(
        &self,
        doc: &Document,
        element: NodeId,
        pseudo: &str,
    ) -> Specificity {
        self.0
            .iter()
            .find(|s| s.matches(doc, element, pseudo))
            .map(Selector::specificity)
            .unwrap_or_default()
    }
}

// ---- display ----------------------------------------------------------

impl fmt::Display for SimpleSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Universal => write!(f, "*"),
            Self::Type(name) => write!(f, "{name}"),
            Self::Id(id) => write!(f, "#{id}"),
            Self::Class(class) => write!(f, ".{class}"),
            Self::Attr { name, op, value } => match (op, value) {
                (AttrOp::Exists, _) => write!(f, "[{name}]"),
                (AttrOp::Equals, Some(v)) => write!(f, "[{name}=\"{v}\"]"),
                (AttrOp::Includes, Some(v)) => write!(f, "[{name}~=\"{v}\"]"),
                (AttrOp::DashMatch, Some(v)) => write!(f, "[{name}|=\"{v}\"]"),
                _ => write!(f, "[{name}]"),
            },
            Self::PseudoClass(p) => match p {
                PseudoClass::FirstChild => write!(f, ":first-child"),
                PseudoClass::LastChild => write!(f, ":last-child"),
                PseudoClass::Root => write!(f, ":root"),
                PseudoClass::Empty => write!(f, ":empty"),
                PseudoClass::Lang(l) => write!(f, ":lang({l})"),
            },
        }
    }
}

impl fmt::Display for CompoundSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.simples.is_empty() && self.pseudo_element.is_none() {
            return write!(f, "*");
        }
        for simple in &self.simples {
            write!(f, "{simple}")?;
        }
        if let Some(pseudo) = &self.pseudo_element {
            write!(f, "::{pseudo}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ComplexSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compound(compound) => write!(f, "{compound}"),
            Self::Combined {
                ancestor,
                combinator,
                subject,
            } => {
                let sep = match combinator {
                    Combinator::Descendant => " ",
                    Combinator::Child => " > ",
                    Combinator::NextSibling => " + ",
                };
                write!(f, "{ancestor}{sep}{subject}")
            }
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.complex)
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, sel) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{sel}")?;
        }
        Ok(())
    }
}

// ---- collection and ordering ------------------------------------------

/// Gather the style rules of `rules` that match the pair, recursing into
/// import targets and media blocks whose media list admits the view.
pub fn collect_rules<'a>(
    rules: &'a [CssRule],
    doc: &Document,
    element: NodeId,
    pseudo: &str,
    view_media: &MediaList,
    out: &mut Vec<&'a StyleRule>,
) {
    for rule in rules {
        match rule {
            CssRule::Style(style) => {
                if style.selectors.matches(doc, element, pseudo) {
                    out.push(style);
                }
            }
            CssRule::Import(import) => {
                if import.media.matches(view_media) {
                    collect_rules(&import.sheet.rules, doc, element, pseudo, view_media, out);
                }
            }
            CssRule::Media(media) => {
                if media.media.matches(view_media) {
                    collect_rules(&media.rules, doc, element, pseudo, view_media, out);
                }
            }
        }
    }
}

/// Order candidates by repeatedly extracting the lowest-specificity rule,
/// so later-applied (higher-specificity) rules win. The specificity used
/// is that of the first selector in the rule's list that matches the pair;
/// equal-specificity ties keep encounter order.
pub fn sort_rules<'a>(
    candidates: Vec<&'a StyleRule>,
    doc: &Document,
    element: NodeId,
    pseudo: &str,
) -> Vec<&'a StyleRule> {
    let mut keyed: Vec<(Specificity, &StyleRule)> = candidates
        .into_iter()
        .map(|rule| {
            (
                rule.selectors.matching_specificity(doc, element, pseudo),
                rule,
            )
        })
        .collect();
    let mut out = Vec::with_capacity(keyed.len());
    while !keyed.is_empty() {
        let mut lowest = 0;
        for (i, item) in keyed.iter().enumerate().skip(1) {
            if item.0 < keyed[lowest].0 {
                lowest = i;
            }
        }
        out.push(keyed.remove(lowest).1);
    }
    out
}

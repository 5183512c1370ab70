//! Node Core
//!
//! Kind-tagged node payloads plus the parent/sibling links threaded through
//! the document arena. Behavior is dispatched on [`NodeKind`] rather than a
//! type hierarchy; capability predicates answer what a kind can hold.

use crate::NodeId;
use crate::attributes::AttributeMap;

/// Node kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    DocumentFragment,
    DocumentType,
    Element,
    Attribute,
    Text,
    CdataSection,
    Comment,
    ProcessingInstruction,
    EntityReference,
    Entity,
    Notation,
}

impl NodeKind {
    /// Whether nodes of this kind carry a character-data payload.
    pub fn has_text_value(self) -> bool {
        matches!(
            self,
            Self::Text | Self::CdataSection | Self::Comment | Self::ProcessingInstruction
        )
    }

    /// Whether this kind can hold children at all.
    pub fn has_children(self) -> bool {
        matches!(
            self,
            Self::Document
                | Self::DocumentFragment
                | Self::Element
                | Self::EntityReference
                | Self::Entity
        )
    }

    /// Whether a node of kind `child` is a legal direct child of this kind.
    ///
    /// Document-level cardinality (single root element, single doctype) is
    /// checked separately by the child-list manager.
    pub fn allows_child(self, child: NodeKind) -> bool {
        match self {
            Self::Document => matches!(
                child,
                Self::Element
                    | Self::ProcessingInstruction
                    | Self::Comment
                    | Self::DocumentType
            ),
            Self::DocumentFragment | Self::Element | Self::EntityReference | Self::Entity => {
                matches!(
                    child,
                    Self::Element
                        | Self::Text
                        | Self::Comment
                        | Self::ProcessingInstruction
                        | Self::CdataSection
                        | Self::EntityReference
                )
            }
            _ => false,
        }
    }
}

/// Expanded name of an element or attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    pub local: String,
    pub prefix: Option<String>,
    pub namespace: Option<String>,
}

impl QualifiedName {
    /// Name without a namespace.
    pub fn new(local: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            prefix: None,
            namespace: None,
        }
    }

    pub fn with_namespace(
        namespace: Option<String>,
        prefix: Option<String>,
        local: impl Into<String>,
    ) -> Self {
        Self {
            local: local.into(),
            prefix,
            namespace,
        }
    }

    /// The prefixed form used for display and default-table lookups.
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.local),
            None => self.local.clone(),
        }
    }
}

/// Element payload: expanded name plus the two-tier attribute map.
#[derive(Debug, Clone)]
pub struct ElementData {
    pub name: QualifiedName,
    pub attributes: AttributeMap,
}

impl ElementData {
    pub fn new(name: QualifiedName) -> Self {
        Self {
            name,
            attributes: AttributeMap::new(),
        }
    }
}

/// Attribute payload. `owner_element` is a non-owning back-reference,
/// cleared when the attribute leaves its element's map.
#[derive(Debug, Clone)]
pub struct AttrData {
    pub name: QualifiedName,
    pub value: String,
    /// False only for defaulted attributes materialized by a schema layer.
    pub specified: bool,
    pub owner_element: Option<NodeId>,
}

/// Node-specific payload.
#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    DocumentFragment,
    DocumentType {
        name: String,
        public_id: String,
        system_id: String,
        entities: Vec<NodeId>,
        notations: Vec<NodeId>,
    },
    Element(ElementData),
    Attribute(AttrData),
    Text {
        data: String,
    },
    CdataSection {
        data: String,
    },
    Comment {
        data: String,
    },
    ProcessingInstruction {
        target: String,
        data: String,
    },
    EntityReference {
        name: String,
    },
    Entity {
        name: String,
        public_id: String,
        system_id: String,
        notation_name: Option<String>,
    },
    Notation {
        name: String,
        public_id: String,
        system_id: String,
    },
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Document => NodeKind::Document,
            Self::DocumentFragment => NodeKind::DocumentFragment,
            Self::DocumentType { .. } => NodeKind::DocumentType,
            Self::Element(_) => NodeKind::Element,
            Self::Attribute(_) => NodeKind::Attribute,
            Self::Text { .. } => NodeKind::Text,
            Self::CdataSection { .. } => NodeKind::CdataSection,
            Self::Comment { .. } => NodeKind::Comment,
            Self::ProcessingInstruction { .. } => NodeKind::ProcessingInstruction,
            Self::EntityReference { .. } => NodeKind::EntityReference,
            Self::Entity { .. } => NodeKind::Entity,
            Self::Notation { .. } => NodeKind::Notation,
        }
    }

    /// The DOM node name for this payload.
    pub fn node_name(&self) -> String {
        match self {
            Self::Document => "#document".to_owned(),
            Self::DocumentFragment => "#document-fragment".to_owned(),
            Self::DocumentType { name, .. } => name.clone(),
            Self::Element(e) => e.name.qualified(),
            Self::Attribute(a) => a.name.qualified(),
            Self::Text { .. } => "#text".to_owned(),
            Self::CdataSection { .. } => "#cdata-section".to_owned(),
            Self::Comment { .. } => "#comment".to_owned(),
            Self::ProcessingInstruction { target, .. } => target.clone(),
            Self::EntityReference { name } => name.clone(),
            Self::Entity { name, .. } => name.clone(),
            Self::Notation { name, .. } => name.clone(),
        }
    }

    /// The DOM node value: character data or attribute value, else none.
    pub fn node_value(&self) -> Option<&str> {
        match self {
            Self::Attribute(a) => Some(&a.value),
            Self::Text { data }
            | Self::CdataSection { data }
            | Self::Comment { data }
            | Self::ProcessingInstruction { data, .. } => Some(data),
            _ => None,
        }
    }
}

/// One arena slot: doubly-linked tree position plus payload.
#[derive(Debug, Clone)]
pub(crate) struct NodeRecord {
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub readonly: bool,
    pub data: NodeData,
}

impl NodeRecord {
    pub fn new(data: NodeData) -> Self {
        Self {
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            readonly: false,
            data,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_child_table() {
        assert!(NodeKind::Document.allows_child(NodeKind::Element));
        assert!(NodeKind::Document.allows_child(NodeKind::DocumentType));
        assert!(!NodeKind::Document.allows_child(NodeKind::Text));
        assert!(NodeKind::Element.allows_child(NodeKind::Text));
        assert!(NodeKind::Element.allows_child(NodeKind::CdataSection));
        assert!(!NodeKind::Element.allows_child(NodeKind::Attribute));
        assert!(!NodeKind::Text.allows_child(NodeKind::Text));
        assert!(!NodeKind::DocumentType.allows_child(NodeKind::Element));
    }

    #[test]
    fn test_node_names() {
        assert_eq!(NodeData::Document.node_name(), "#document");
        let el = NodeData::Element(ElementData::new(QualifiedName::with_namespace(
            Some("http://example.com".into()),
            Some("ex".into()),
            "rect",
        )));
        assert_eq!(el.node_name(), "ex:rect");
        assert_eq!(
            NodeData::Text {
                data: "hi".into()
            }
            .node_name(),
            "#text"
        );
    }

    #[test]
    fn test_has_text_value() {
        assert!(NodeKind::Text.has_text_value());
        assert!(NodeKind::ProcessingInstruction.has_text_value());
        assert!(!NodeKind::Element.has_text_value());
    }
}

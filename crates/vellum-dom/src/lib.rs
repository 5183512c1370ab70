//! vellum DOM - Document tree engine
//!
//! Arena-backed document trees with DOM Core semantics: validated tree
//! surgery, two-tier attribute maps, readonly subtrees, cross-document
//! import, and synchronous mutation events behind a document-wide gate.

mod attributes;
mod document;
mod error;
mod events;
mod facade;
mod name;
mod node;
mod tree;

pub use attributes::AttributeMap;
pub use document::Document;
pub use error::{DomError, DomResult};
pub use events::{AttrChange, ListenerId, MutationEvent, MutationKind};
pub use facade::DocumentHost;
pub use name::{validate_name, validate_qualified_name, XML_NS, XMLNS_NS};
pub use node::{AttrData, ElementData, NodeData, NodeKind, QualifiedName};

/// Node identifier: the owning document's instance id plus an arena slot.
///
/// Carrying the document id lets cross-document reuse fail WrongDocument
/// structurally instead of relying on pointer identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) doc: u32,
    pub(crate) index: u32,
}

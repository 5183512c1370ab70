//! Document
//!
//! The arena that owns every node created through its factory. Nodes keep
//! their slot for the document's lifetime; a removed node becomes an orphan
//! but is still owned by the same document for identity purposes. Crossing
//! into another document goes through [`Document::import_node`], which
//! builds a brand-new owned clone.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{DomError, DomResult};
use crate::events::{ListenerEntry, QueuedEvent};
use crate::name::{validate_name, validate_qualified_name};
use crate::node::{AttrData, ElementData, NodeData, NodeKind, NodeRecord, QualifiedName};
use crate::NodeId;

static NEXT_DOC_ID: AtomicU32 = AtomicU32::new(1);

/// A document and the tree it owns.
pub struct Document {
    doc_id: u32,
    nodes: Vec<NodeRecord>,
    pub(crate) listeners: HashMap<NodeId, Vec<ListenerEntry>>,
    pub(crate) next_listener_id: u64,
    pub(crate) events_enabled: bool,
    pub(crate) pending: VecDeque<QueuedEvent>,
    pub(crate) dispatching: bool,
    generation: u64,
}

impl Document {
    /// Create an empty document. Slot zero is the document node itself.
    pub fn new() -> Self {
        Self {
            doc_id: NEXT_DOC_ID.fetch_add(1, Ordering::Relaxed),
            nodes: vec![NodeRecord::new(NodeData::Document)],
            listeners: HashMap::new(),
            next_listener_id: 1,
            events_enabled: true,
            pending: VecDeque::new(),
            dispatching: false,
            generation: 0,
        }
    }

    /// The document node at the root of the tree.
    pub fn document_node(&self) -> NodeId {
        NodeId {
            doc: self.doc_id,
            index: 0,
        }
    }

    /// Monotonic counter bumped on every mutation that can affect style.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn bump_generation(&mut self) {
        self.generation += 1;
    }

    // ---- arena access -------------------------------------------------

    pub(crate) fn alloc(&mut self, data: NodeData) -> NodeId {
        let index = self.nodes.len() as u32;
        self.nodes.push(NodeRecord::new(data));
        NodeId {
            doc: self.doc_id,
            index,
        }
    }

    /// Record lookup that tolerates foreign ids.
    pub(crate) fn get(&self, id: NodeId) -> Option<&NodeRecord> {
        if id.doc != self.doc_id {
            return None;
        }
        self.nodes.get(id.index as usize)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeRecord> {
        if id.doc != self.doc_id {
            return None;
        }
        self.nodes.get_mut(id.index as usize)
    }

    /// Record lookup that reports WrongDocument for foreign ids.
    pub(crate) fn record(&self, id: NodeId) -> DomResult<&NodeRecord> {
        if id.doc != self.doc_id {
            return Err(DomError::WrongDocument);
        }
        self.nodes.get(id.index as usize).ok_or(DomError::NotFound)
    }

    pub(crate) fn record_mut(&mut self, id: NodeId) -> DomResult<&mut NodeRecord> {
        if id.doc != self.doc_id {
            return Err(DomError::WrongDocument);
        }
        self.nodes
            .get_mut(id.index as usize)
            .ok_or(DomError::NotFound)
    }

    pub(crate) fn ensure_writable(&self, id: NodeId) -> DomResult<()> {
        if self.record(id)?.readonly {
            return Err(DomError::NoModificationAllowed);
        }
        Ok(())
    }

    // ---- factory ------------------------------------------------------

    pub fn create_element(&mut self, name: &str) -> DomResult<NodeId> {
        validate_name(name)?;
        Ok(self.alloc(NodeData::Element(ElementData::new(QualifiedName::new(name)))))
    }

    pub fn create_element_ns(&mut self, namespace: Option<&str>, qualified: &str) -> DomResult<NodeId> {
        let (prefix, local) = validate_qualified_name(namespace, qualified)?;
        let name = QualifiedName::with_namespace(namespace.map(str::to_owned), prefix, local);
        Ok(self.alloc(NodeData::Element(ElementData::new(name))))
    }

    pub fn create_text(&mut self, data: &str) -> NodeId {
        self.alloc(NodeData::Text {
            data: data.to_owned(),
        })
    }

    pub fn create_cdata_section(&mut self, data: &str) -> NodeId {
        self.alloc(NodeData::CdataSection {
            data: data.to_owned(),
        })
    }

    pub fn create_comment(&mut self, data: &str) -> NodeId {
        self.alloc(NodeData::Comment {
            data: data.to_owned(),
        })
    }

    pub fn create_processing_instruction(&mut self, target: &str, data: &str) -> DomResult<NodeId> {
        validate_name(target)?;
        Ok(self.alloc(NodeData::ProcessingInstruction {
            target: target.to_owned(),
            data: data.to_owned(),
        }))
    }

    pub fn create_attribute(&mut self, name: &str) -> DomResult<NodeId> {
        validate_name(name)?;
        Ok(self.alloc_attr(QualifiedName::new(name), "", None))
    }

    pub fn create_attribute_ns(&mut self, namespace: Option<&str>, qualified: &str) -> DomResult<NodeId> {
        let (prefix, local) = validate_qualified_name(namespace, qualified)?;
        let name = QualifiedName::with_namespace(namespace.map(str::to_owned), prefix, local);
        Ok(self.alloc_attr(name, "", None))
    }

    pub fn create_document_fragment(&mut self) -> NodeId {
        self.alloc(NodeData::DocumentFragment)
    }

    pub fn create_entity_reference(&mut self, name: &str) -> DomResult<NodeId> {
        validate_name(name)?;
        Ok(self.alloc(NodeData::EntityReference {
            name: name.to_owned(),
        }))
    }

    pub fn create_document_type(
        &mut self,
        name: &str,
        public_id: &str,
        system_id: &str,
    ) -> DomResult<NodeId> {
        validate_name(name)?;
        Ok(self.alloc(NodeData::DocumentType {
            name: name.to_owned(),
            public_id: public_id.to_owned(),
            system_id: system_id.to_owned(),
            entities: Vec::new(),
            notations: Vec::new(),
        }))
    }

    pub fn create_entity(
        &mut self,
        name: &str,
        public_id: &str,
        system_id: &str,
        notation_name: Option<&str>,
    ) -> DomResult<NodeId> {
        validate_name(name)?;
        Ok(self.alloc(NodeData::Entity {
            name: name.to_owned(),
            public_id: public_id.to_owned(),
            system_id: system_id.to_owned(),
            notation_name: notation_name.map(str::to_owned),
        }))
    }

    pub fn create_notation(&mut self, name: &str, public_id: &str, system_id: &str) -> DomResult<NodeId> {
        validate_name(name)?;
        Ok(self.alloc(NodeData::Notation {
            name: name.to_owned(),
            public_id: public_id.to_owned(),
            system_id: system_id.to_owned(),
        }))
    }

    pub(crate) fn alloc_attr(
        &mut self,
        name: QualifiedName,
        value: &str,
        owner: Option<NodeId>,
    ) -> NodeId {
        self.alloc(NodeData::Attribute(AttrData {
            name,
            value: value.to_owned(),
            specified: true,
            owner_element: owner,
        }))
    }

    // ---- accessors ----------------------------------------------------

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get(id).map(NodeRecord::kind)
    }

    pub fn node_name(&self, id: NodeId) -> Option<String> {
        self.get(id).map(|r| r.data.node_name())
    }

    pub fn node_value(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|r| r.data.node_value())
    }

    pub fn parent_node(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.first_child
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.last_child
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.next_sibling
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.prev_sibling
    }

    /// Children of `id` in order.
    pub fn child_nodes(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut next = self.first_child(id);
        while let Some(child) = next {
            out.push(child);
            next = self.next_sibling(child);
        }
        out
    }

    /// Element name parts, if `id` is an element.
    pub fn element_name(&self, id: NodeId) -> Option<&QualifiedName> {
        match &self.get(id)?.data {
            NodeData::Element(e) => Some(&e.name),
            _ => None,
        }
    }

    /// Tag name (qualified form), if `id` is an element.
    pub fn tag_name(&self, id: NodeId) -> Option<String> {
        self.element_name(id).map(QualifiedName::qualified)
    }

    pub fn is_readonly(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|r| r.readonly)
    }

    /// Whether `ancestor` contains `node` (inclusive of `node == ancestor`).
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(n) = cursor {
            if n == ancestor {
                return true;
            }
            cursor = self.parent_node(n);
        }
        false
    }

    /// Whether the node is connected to the document node.
    pub fn is_attached(&self, node: NodeId) -> bool {
        self.contains(self.document_node(), node)
    }

    /// The single root element of the document, if present.
    pub fn document_element(&self) -> Option<NodeId> {
        self.child_nodes(self.document_node())
            .into_iter()
            .find(|&c| self.kind(c) == Some(NodeKind::Element))
    }

    /// The doctype child of the document, if present.
    pub fn doctype(&self) -> Option<NodeId> {
        self.child_nodes(self.document_node())
            .into_iter()
            .find(|&c| self.kind(c) == Some(NodeKind::DocumentType))
    }

    /// Concatenated character data of the subtree under `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.get(id).map(|r| &r.data) {
            Some(NodeData::Text { data }) | Some(NodeData::CdataSection { data }) => {
                out.push_str(data);
            }
            _ => {
                for child in self.child_nodes(id) {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// First element carrying an `id` attribute with the given value.
    pub fn get_element_by_id(&self, value: &str) -> Option<NodeId> {
        self.descendant_elements(self.document_node())
            .into_iter()
            .find(|&el| self.get_attribute(el, "id") == Some(value))
    }

    /// Elements whose tag name matches, in document order. `*` matches all.
    pub fn get_elements_by_tag_name(&self, name: &str) -> Vec<NodeId> {
        self.descendant_elements(self.document_node())
            .into_iter()
            .filter(|&el| name == "*" || self.tag_name(el).as_deref() == Some(name))
            .collect()
    }

    fn descendant_elements(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.child_nodes(root);
        stack.reverse();
        while let Some(n) = stack.pop() {
            if self.kind(n) == Some(NodeKind::Element) {
                out.push(n);
            }
            let mut children = self.child_nodes(n);
            children.reverse();
            stack.extend(children);
        }
        out
    }

    // ---- readonly subtrees --------------------------------------------

    pub(crate) fn set_readonly_deep(&mut self, node: NodeId, readonly: bool) {
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            if let Some(rec) = self.get_mut(n) {
                rec.readonly = readonly;
            }
            stack.extend(self.child_nodes(n));
            if let Some(map) = self.attributes(n) {
                stack.extend(map.iter());
            }
        }
    }

    /// Register an entity on a doctype. The entity subtree becomes readonly
    /// at attach time.
    pub fn add_entity(&mut self, doctype: NodeId, entity: NodeId) -> DomResult<()> {
        self.record(doctype)?;
        if self.record(entity)?.kind() != NodeKind::Entity {
            return Err(DomError::NotSupported {
                detail: "only entity nodes can be registered here",
            });
        }
        match &mut self.record_mut(doctype)?.data {
            NodeData::DocumentType { entities, .. } => entities.push(entity),
            _ => {
                return Err(DomError::NotSupported {
                    detail: "entities can only be registered on a doctype",
                })
            }
        }
        self.set_readonly_deep(entity, true);
        Ok(())
    }

    /// Register a notation on a doctype; readonly at attach time.
    pub fn add_notation(&mut self, doctype: NodeId, notation: NodeId) -> DomResult<()> {
        self.record(doctype)?;
        if self.record(notation)?.kind() != NodeKind::Notation {
            return Err(DomError::NotSupported {
                detail: "only notation nodes can be registered here",
            });
        }
        match &mut self.record_mut(doctype)?.data {
            NodeData::DocumentType { notations, .. } => notations.push(notation),
            _ => {
                return Err(DomError::NotSupported {
                    detail: "notations can only be registered on a doctype",
                })
            }
        }
        self.set_readonly_deep(notation, true);
        Ok(())
    }

    /// Entities registered on a doctype node.
    pub fn doctype_entities(&self, doctype: NodeId) -> Vec<NodeId> {
        match self.get(doctype).map(|r| &r.data) {
            Some(NodeData::DocumentType { entities, .. }) => entities.clone(),
            _ => Vec::new(),
        }
    }

    /// Notations registered on a doctype node.
    pub fn doctype_notations(&self, doctype: NodeId) -> Vec<NodeId> {
        match self.get(doctype).map(|r| &r.data) {
            Some(NodeData::DocumentType { notations, .. }) => notations.clone(),
            _ => Vec::new(),
        }
    }

    // ---- clone and import ---------------------------------------------

    /// Clone a node within this document. Shallow clones copy only
    /// scalar/value fields (and, for elements, the attribute map); deep
    /// clones recurse over children. Clones are never readonly.
    pub fn clone_node(&mut self, node: NodeId, deep: bool) -> DomResult<NodeId> {
        self.record(node)?;
        Ok(self.clone_branch(node, deep))
    }

    fn clone_branch(&mut self, node: NodeId, deep: bool) -> NodeId {
        let data = self
            .get(node)
            .map(|r| r.data.clone())
            .unwrap_or(NodeData::Document);
        let new = match data {
            NodeData::Element(source) => {
                let new_el =
                    self.alloc(NodeData::Element(ElementData::new(source.name.clone())));
                self.clone_attributes(&source, new_el);
                new_el
            }
            NodeData::Attribute(a) => self.alloc_attr(a.name, &a.value, None),
            other => self.alloc(other),
        };
        if deep {
            for child in self.child_nodes(node) {
                let cloned = self.clone_branch(child, true);
                self.link_last(new, cloned);
            }
        }
        new
    }

    /// Import a node from another document, producing a brand-new clone
    /// exclusively owned by this document. Names are re-validated against
    /// this document's constraints.
    pub fn import_node(&mut self, source: &Document, node: NodeId, deep: bool) -> DomResult<NodeId> {
        if node.doc != source.doc_id {
            return Err(DomError::WrongDocument);
        }
        let rec = source.record(node)?;
        match rec.kind() {
            NodeKind::Document | NodeKind::DocumentType => Err(DomError::NotSupported {
                detail: "documents and doctypes cannot be imported",
            }),
            _ => self.import_branch(source, node, deep),
        }
    }

    fn import_branch(&mut self, source: &Document, node: NodeId, deep: bool) -> DomResult<NodeId> {
        let data = source.record(node)?.data.clone();
        let new = match data {
            NodeData::Element(src) => {
                self.validate_imported_name(&src.name)?;
                let new_el = self.alloc(NodeData::Element(ElementData::new(src.name.clone())));
                for attr in src.attributes.iter() {
                    let imported = self.import_branch(source, attr, true)?;
                    self.set_imported_attr_owner(imported, new_el);
                    match source.attr_data(attr).and_then(|a| a.name.namespace.clone()) {
                        Some(uri) => {
                            if let NodeData::Element(e) = &mut self.record_mut(new_el)?.data {
                                e.attributes.insert_ns(&uri, imported);
                            }
                        }
                        None => {
                            if let NodeData::Element(e) = &mut self.record_mut(new_el)?.data {
                                e.attributes.insert_base(imported);
                            }
                        }
                    }
                }
                new_el
            }
            NodeData::Attribute(a) => {
                self.validate_imported_name(&a.name)?;
                // Imported attributes are always specified and ownerless.
                self.alloc_attr(a.name, &a.value, None)
            }
            other => self.alloc(other),
        };
        // Entity-reference content belongs to the destination doctype, so
        // children are not carried across.
        let import_children = deep && source.kind(node) != Some(NodeKind::EntityReference);
        if import_children {
            for child in source.child_nodes(node) {
                let imported = self.import_branch(source, child, true)?;
                self.link_last(new, imported);
            }
        }
        Ok(new)
    }

    /// Imported names must satisfy this document's name constraints.
    fn validate_imported_name(&self, name: &QualifiedName) -> DomResult<()> {
        match &name.namespace {
            Some(uri) => {
                validate_qualified_name(Some(uri), &name.qualified())?;
            }
            None => validate_name(&name.local)?,
        }
        Ok(())
    }

    fn set_imported_attr_owner(&mut self, attr: NodeId, owner: NodeId) {
        if let Some(NodeData::Attribute(a)) = self.get_mut(attr).map(|r| &mut r.data) {
            a.owner_element = Some(owner);
        }
    }

    fn clone_attributes(&mut self, source: &ElementData, new_el: NodeId) {
        let base: Vec<NodeId> = source.attributes.base_entries().to_vec();
        for attr in base {
            if let Some(a) = self.attr_data(attr).cloned() {
                let cloned = self.alloc_attr(a.name, &a.value, Some(new_el));
                if let Some(NodeData::Element(e)) = self.get_mut(new_el).map(|r| &mut r.data) {
                    e.attributes.insert_base(cloned);
                }
            }
        }
        for (uri, entries) in source.attributes.ns_entries() {
            for attr in entries {
                if let Some(a) = self.attr_data(attr).cloned() {
                    let cloned = self.alloc_attr(a.name, &a.value, Some(new_el));
                    if let Some(NodeData::Element(e)) = self.get_mut(new_el).map(|r| &mut r.data)
                    {
                        e.attributes.insert_ns(&uri, cloned);
                    }
                }
            }
        }
    }

    /// Internal child link used while building clones and imports; no
    /// validation, no events.
    pub(crate) fn link_last(&mut self, parent: NodeId, child: NodeId) {
        let prev = self.get(parent).and_then(|r| r.last_child);
        if let Some(rec) = self.get_mut(child) {
            rec.parent = Some(parent);
            rec.prev_sibling = prev;
            rec.next_sibling = None;
        }
        if let Some(prev) = prev {
            if let Some(rec) = self.get_mut(prev) {
                rec.next_sibling = Some(child);
            }
        }
        if let Some(rec) = self.get_mut(parent) {
            if rec.first_child.is_none() {
                rec.first_child = Some(child);
            }
            rec.last_child = Some(child);
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_validates_names() {
        let mut doc = Document::new();
        assert!(doc.create_element("rect").is_ok());
        assert!(matches!(
            doc.create_element("1bad"),
            Err(DomError::InvalidCharacter { .. })
        ));
        assert!(matches!(
            doc.create_processing_instruction("9pi", "data"),
            Err(DomError::InvalidCharacter { .. })
        ));
    }

    #[test]
    fn test_document_node_identity() {
        let doc = Document::new();
        let root = doc.document_node();
        assert_eq!(doc.kind(root), Some(NodeKind::Document));
        assert_eq!(doc.node_name(root), Some("#document".to_owned()));
    }

    #[test]
    fn test_foreign_id_is_wrong_document() {
        let mut a = Document::new();
        let b = Document::new();
        let el = a.create_element("rect").unwrap();
        assert_eq!(b.record(el).err(), Some(DomError::WrongDocument));
    }

    #[test]
    fn test_clone_shallow_copies_attributes() {
        let mut doc = Document::new();
        let el = doc.create_element("rect").unwrap();
        doc.set_attribute(el, "x", "1").unwrap();
        let child = doc.create_text("body");
        doc.append_child(el, child).unwrap();

        let copy = doc.clone_node(el, false).unwrap();
        assert_eq!(doc.get_attribute(copy, "x"), Some("1"));
        assert!(doc.first_child(copy).is_none());

        // Attribute nodes are cloned, not shared.
        let orig_attr = doc.get_attribute_node(el, "x").unwrap();
        let copy_attr = doc.get_attribute_node(copy, "x").unwrap();
        assert_ne!(orig_attr, copy_attr);
    }

    #[test]
    fn test_clone_deep_recurses() {
        let mut doc = Document::new();
        let el = doc.create_element("g").unwrap();
        let inner = doc.create_element("rect").unwrap();
        doc.append_child(el, inner).unwrap();
        let text = doc.create_text("label");
        doc.append_child(inner, text).unwrap();

        let copy = doc.clone_node(el, true).unwrap();
        let copy_inner = doc.first_child(copy).unwrap();
        assert_eq!(doc.tag_name(copy_inner).as_deref(), Some("rect"));
        assert_eq!(doc.text_content(copy), "label");
    }

    #[test]
    fn test_get_element_by_id() {
        let mut doc = Document::new();
        let root = doc.create_element("svg").unwrap();
        doc.append_child(doc.document_node(), root).unwrap();
        let rect = doc.create_element("rect").unwrap();
        doc.set_attribute(rect, "id", "target").unwrap();
        doc.append_child(root, rect).unwrap();

        assert_eq!(doc.get_element_by_id("target"), Some(rect));
        assert_eq!(doc.get_element_by_id("missing"), None);
    }

    #[test]
    fn test_entity_registration_marks_readonly() {
        let mut doc = Document::new();
        let doctype = doc.create_document_type("svg", "", "").unwrap();
        let entity = doc.create_entity("chunk", "", "", None).unwrap();
        let content = doc.create_text("expansion");
        doc.append_child(entity, content).unwrap();

        doc.add_entity(doctype, entity).unwrap();
        assert!(doc.is_readonly(entity));
        assert!(doc.is_readonly(content));
        assert_eq!(
            doc.append_child(entity, doc.document_node()).err(),
            Some(DomError::NoModificationAllowed)
        );
    }
}

//! Child-List Manager
//!
//! Ordered sibling linkage per parent: insert/remove/replace/append plus
//! normalize and character-data edits. Every operation validates fully
//! before touching links, so a failure leaves the tree unchanged.

use crate::error::{DomError, DomResult};
use crate::events::{MutationEvent, QueuedEvent};
use crate::node::{NodeData, NodeKind};
use crate::{Document, NodeId};

impl Document {
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.insert_before(parent, child, None)
    }

    /// Insert `new_child` before `ref_child` (or at the end when none).
    ///
    /// A DocumentFragment is never inserted as a unit: its children are
    /// spliced in order as independent inserts, each with its own events.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        ref_child: Option<NodeId>,
    ) -> DomResult<NodeId> {
        // Inserting a node before itself anchors on its next sibling.
        let ref_child = if ref_child == Some(new_child) {
            self.next_sibling(new_child)
        } else {
            ref_child
        };
        self.check_attach(parent, new_child, ref_child, None)?;
        if self.kind(new_child) == Some(NodeKind::DocumentFragment) {
            self.splice_fragment(parent, new_child, ref_child)
        } else {
            self.move_into(parent, new_child, ref_child, true);
            Ok(new_child)
        }
    }

    /// Replace `old_child` with `new_child`, returning the removed node.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> DomResult<NodeId> {
        self.record(old_child)?;
        if self.parent_node(old_child) != Some(parent) {
            return Err(DomError::HierarchyRequest {
                detail: "replaced node is not a child of the target",
            });
        }
        self.check_attach(parent, new_child, None, Some(old_child))?;

        let anchor = match self.next_sibling(old_child) {
            Some(n) if n == new_child => self.next_sibling(new_child),
            other => other,
        };
        // Removal events settle before insertion events; the single
        // SubtreeModified for the operation fires with the insertion.
        self.remove_child_unchecked(parent, old_child, false);
        if self.kind(new_child) == Some(NodeKind::DocumentFragment) {
            self.splice_fragment(parent, new_child, anchor)?;
        } else {
            self.move_into(parent, new_child, anchor, true);
        }
        Ok(old_child)
    }

    /// Detach `child`, returning ownership of the orphan to the caller.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.record(parent)?;
        self.record(child)?;
        self.ensure_writable(parent)?;
        if self.parent_node(child) != Some(parent) {
            return Err(DomError::NotFound);
        }
        self.remove_child_unchecked(parent, child, true);
        Ok(child)
    }

    // ---- validation ---------------------------------------------------

    fn check_attach(
        &self,
        parent: NodeId,
        new_child: NodeId,
        ref_child: Option<NodeId>,
        replacing: Option<NodeId>,
    ) -> DomResult<()> {
        self.record(new_child)?;
        self.record(parent)?;
        self.ensure_writable(parent)?;
        if let Some(r) = ref_child {
            self.record(r)?;
            if self.parent_node(r) != Some(parent) {
                return Err(DomError::NotFound);
            }
        }
        if self.contains(new_child, parent) {
            return Err(DomError::HierarchyRequest {
                detail: "new child is an ancestor of the target",
            });
        }

        let parent_kind = self.record(parent)?.kind();
        if !parent_kind.has_children() {
            return Err(DomError::HierarchyRequest {
                detail: "target kind cannot hold children",
            });
        }
        let incoming = if self.kind(new_child) == Some(NodeKind::DocumentFragment) {
            self.child_nodes(new_child)
        } else {
            vec![new_child]
        };
        for &c in &incoming {
            let child_kind = self.record(c)?.kind();
            if !parent_kind.allows_child(child_kind) {
                return Err(DomError::HierarchyRequest {
                    detail: "node kind is not a legal child of the target kind",
                });
            }
            // Implicit move must be able to detach from the old parent.
            if let Some(old_parent) = self.parent_node(c) {
                self.ensure_writable(old_parent)?;
            }
        }

        if parent_kind == NodeKind::Document {
            self.check_document_cardinality(parent, &incoming, replacing)?;
        }
        Ok(())
    }

    /// A document holds at most one root element and one doctype.
    fn check_document_cardinality(
        &self,
        parent: NodeId,
        incoming: &[NodeId],
        replacing: Option<NodeId>,
    ) -> DomResult<()> {
        let count = |kind: NodeKind| -> usize {
            let existing = self
                .child_nodes(parent)
                .into_iter()
                .filter(|&c| {
                    self.kind(c) == Some(kind)
                        && Some(c) != replacing
                        && !incoming.contains(&c)
                })
                .count();
            let added = incoming
                .iter()
                .filter(|&&c| self.kind(c) == Some(kind))
                .count();
            existing + added
        };
        if count(NodeKind::Element) > 1 {
            return Err(DomError::HierarchyRequest {
                detail: "document already has a root element",
            });
        }
        if count(NodeKind::DocumentType) > 1 {
            return Err(DomError::HierarchyRequest {
                detail: "document already has a doctype",
            });
        }
        Ok(())
    }

    // ---- link surgery -------------------------------------------------

    fn splice_fragment(
        &mut self,
        parent: NodeId,
        fragment: NodeId,
        before: Option<NodeId>,
    ) -> DomResult<NodeId> {
        for child in self.child_nodes(fragment) {
            self.move_into(parent, child, before, true);
        }
        Ok(fragment)
    }

    fn move_into(&mut self, parent: NodeId, child: NodeId, before: Option<NodeId>, subtree: bool) {
        if let Some(old_parent) = self.parent_node(child) {
            self.remove_child_unchecked(old_parent, child, true);
        }
        self.link_before(parent, child, before);
        // A doctype subtree becomes readonly the moment it attaches.
        if self.kind(child) == Some(NodeKind::DocumentType) {
            self.set_readonly_deep(child, true);
        }
        self.bump_generation();
        self.fire_inserted(parent, child, subtree);
    }

    pub(crate) fn remove_child_unchecked(&mut self, parent: NodeId, child: NodeId, subtree: bool) {
        let batch = if self.mutation_events_enabled() {
            let mut batch = vec![QueuedEvent {
                path: self.bubble_path(child),
                event: MutationEvent::node_removed(child, parent),
            }];
            if self.is_attached(parent) {
                for n in self.subtree(child) {
                    batch.push(QueuedEvent {
                        path: vec![n],
                        event: MutationEvent::removed_from_document(n),
                    });
                }
            }
            if subtree {
                batch.push(QueuedEvent {
                    path: self.bubble_path(parent),
                    event: MutationEvent::subtree_modified(parent),
                });
            }
            batch
        } else {
            Vec::new()
        };
        self.unlink(child);
        self.bump_generation();
        if !batch.is_empty() {
            self.dispatch_batch(batch);
        }
    }

    fn fire_inserted(&mut self, parent: NodeId, child: NodeId, subtree: bool) {
        if !self.mutation_events_enabled() {
            return;
        }
        let mut batch = vec![QueuedEvent {
            path: self.bubble_path(child),
            event: MutationEvent::node_inserted(child, parent),
        }];
        if self.is_attached(parent) {
            for n in self.subtree(child) {
                batch.push(QueuedEvent {
                    path: vec![n],
                    event: MutationEvent::inserted_into_document(n),
                });
            }
        }
        if subtree {
            batch.push(QueuedEvent {
                path: self.bubble_path(parent),
                event: MutationEvent::subtree_modified(parent),
            });
        }
        self.dispatch_batch(batch);
    }

    fn unlink(&mut self, child: NodeId) {
        let Some(rec) = self.get(child) else { return };
        let (parent, prev, next) = (rec.parent, rec.prev_sibling, rec.next_sibling);
        match prev {
            Some(p) => {
                if let Some(r) = self.get_mut(p) {
                    r.next_sibling = next;
                }
            }
            None => {
                if let Some(par) = parent {
                    if let Some(r) = self.get_mut(par) {
                        r.first_child = next;
                    }
                }
            }
        }
        match next {
            Some(n) => {
                if let Some(r) = self.get_mut(n) {
                    r.prev_sibling = prev;
                }
            }
            None => {
                if let Some(par) = parent {
                    if let Some(r) = self.get_mut(par) {
                        r.last_child = prev;
                    }
                }
            }
        }
        if let Some(r) = self.get_mut(child) {
            r.parent = None;
            r.prev_sibling = None;
            r.next_sibling = None;
        }
    }

    fn link_before(&mut self, parent: NodeId, child: NodeId, before: Option<NodeId>) {
        let Some(anchor) = before else {
            self.link_last(parent, child);
            return;
        };
        let prev = self.get(anchor).and_then(|r| r.prev_sibling);
        if let Some(rec) = self.get_mut(child) {
            rec.parent = Some(parent);
            rec.prev_sibling = prev;
            rec.next_sibling = Some(anchor);
        }
        match prev {
            Some(p) => {
                if let Some(r) = self.get_mut(p) {
                    r.next_sibling = Some(child);
                }
            }
            None => {
                if let Some(r) = self.get_mut(parent) {
                    r.first_child = Some(child);
                }
            }
        }
        if let Some(r) = self.get_mut(anchor) {
            r.prev_sibling = Some(child);
        }
    }

    /// Preorder walk of the subtree rooted at `node`, inclusive.
    pub(crate) fn subtree(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            out.push(n);
            let mut children = self.child_nodes(n);
            children.reverse();
            stack.extend(children);
        }
        out
    }

    // ---- character data -----------------------------------------------

    /// Replace the character data of a text-kind node.
    pub fn set_data(&mut self, node: NodeId, value: &str) -> DomResult<()> {
        self.record(node)?;
        self.ensure_writable(node)?;
        if !self.record(node)?.kind().has_text_value() {
            return Err(DomError::NotSupported {
                detail: "node does not hold character data",
            });
        }
        self.replace_chardata(node, value);
        Ok(())
    }

    /// Generic node-value setter: character data and attribute values
    /// accept a new value, kinds without a value ignore the call.
    pub fn set_node_value(&mut self, node: NodeId, value: &str) -> DomResult<()> {
        self.ensure_writable(node)?;
        let attr_info = match &self.record(node)?.data {
            NodeData::Attribute(a) => Some((a.owner_element, a.name.qualified())),
            _ => None,
        };
        if let Some((owner, name)) = attr_info {
            let old = match &mut self.record_mut(node)?.data {
                NodeData::Attribute(a) => std::mem::replace(&mut a.value, value.to_owned()),
                _ => String::new(),
            };
            self.bump_generation();
            if let Some(el) = owner {
                self.fire_attr_modified(
                    el,
                    &name,
                    crate::events::AttrChange::Modification,
                    old,
                    value.to_owned(),
                );
            }
        } else if self.record(node)?.kind().has_text_value() {
            self.replace_chardata(node, value);
        }
        Ok(())
    }

    fn replace_chardata(&mut self, node: NodeId, value: &str) {
        let old = {
            let Ok(rec) = self.record_mut(node) else { return };
            match &mut rec.data {
                NodeData::Text { data }
                | NodeData::CdataSection { data }
                | NodeData::Comment { data }
                | NodeData::ProcessingInstruction { data, .. } => {
                    std::mem::replace(data, value.to_owned())
                }
                _ => return,
            }
        };
        self.bump_generation();
        if !self.mutation_events_enabled() {
            return;
        }
        let mut batch = vec![QueuedEvent {
            path: self.bubble_path(node),
            event: MutationEvent::char_data_modified(node, old, value.to_owned()),
        }];
        if let Some(parent) = self.parent_node(node) {
            batch.push(QueuedEvent {
                path: self.bubble_path(parent),
                event: MutationEvent::subtree_modified(parent),
            });
        }
        self.dispatch_batch(batch);
    }

    /// Merge every run of adjacent text siblings under `node`, recursively.
    pub fn normalize(&mut self, node: NodeId) -> DomResult<()> {
        self.record(node)?;
        let mut cursor = self.first_child(node);
        while let Some(current) = cursor {
            if self.kind(current) == Some(NodeKind::Text) {
                let mut merged = self.node_value(current).unwrap_or("").to_owned();
                let mut grew = false;
                while let Some(next) = self.next_sibling(current) {
                    if self.kind(next) != Some(NodeKind::Text) {
                        break;
                    }
                    merged.push_str(self.node_value(next).unwrap_or(""));
                    self.remove_child(node, next)?;
                    grew = true;
                }
                if grew {
                    self.set_data(current, &merged)?;
                }
            } else {
                self.normalize(current)?;
            }
            cursor = self.next_sibling(current);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_root() -> (Document, NodeId) {
        let mut doc = Document::new();
        let root = doc.create_element("svg").unwrap();
        doc.append_child(doc.document_node(), root).unwrap();
        (doc, root)
    }

    #[test]
    fn test_append_and_order() {
        let (mut doc, root) = doc_with_root();
        let a = doc.create_element("a").unwrap();
        let b = doc.create_element("b").unwrap();
        doc.append_child(root, a).unwrap();
        doc.append_child(root, b).unwrap();

        assert_eq!(doc.child_nodes(root), vec![a, b]);
        assert_eq!(doc.first_child(root), Some(a));
        assert_eq!(doc.last_child(root), Some(b));
        assert_eq!(doc.next_sibling(a), Some(b));
        assert_eq!(doc.previous_sibling(b), Some(a));
    }

    #[test]
    fn test_insert_before_links() {
        let (mut doc, root) = doc_with_root();
        let a = doc.create_element("a").unwrap();
        let c = doc.create_element("c").unwrap();
        doc.append_child(root, a).unwrap();
        doc.append_child(root, c).unwrap();
        let b = doc.create_element("b").unwrap();
        doc.insert_before(root, b, Some(c)).unwrap();

        assert_eq!(doc.child_nodes(root), vec![a, b, c]);
    }

    #[test]
    fn test_second_root_element_rejected() {
        let (mut doc, _root) = doc_with_root();
        let extra = doc.create_element("other").unwrap();
        let err = doc.append_child(doc.document_node(), extra).unwrap_err();
        assert!(matches!(err, DomError::HierarchyRequest { .. }));
    }

    #[test]
    fn test_ancestor_cycle_rejected() {
        let (mut doc, root) = doc_with_root();
        let child = doc.create_element("g").unwrap();
        doc.append_child(root, child).unwrap();
        let err = doc.append_child(child, root).unwrap_err();
        assert!(matches!(err, DomError::HierarchyRequest { .. }));
        // Tree unchanged
        assert_eq!(doc.parent_node(child), Some(root));
        assert_eq!(doc.child_nodes(child), vec![]);
    }

    #[test]
    fn test_text_under_document_rejected() {
        let mut doc = Document::new();
        let text = doc.create_text("stray");
        let err = doc.append_child(doc.document_node(), text).unwrap_err();
        assert!(matches!(err, DomError::HierarchyRequest { .. }));
        assert!(doc.child_nodes(doc.document_node()).is_empty());
    }

    #[test]
    fn test_implicit_move_detaches_first() {
        let (mut doc, root) = doc_with_root();
        let a = doc.create_element("a").unwrap();
        let b = doc.create_element("b").unwrap();
        doc.append_child(root, a).unwrap();
        doc.append_child(root, b).unwrap();
        let child = doc.create_element("leaf").unwrap();
        doc.append_child(a, child).unwrap();

        doc.append_child(b, child).unwrap();
        assert_eq!(doc.child_nodes(a), vec![]);
        assert_eq!(doc.child_nodes(b), vec![child]);
        assert_eq!(doc.parent_node(child), Some(b));
    }

    #[test]
    fn test_remove_child_not_found() {
        let (mut doc, root) = doc_with_root();
        let stray = doc.create_element("stray").unwrap();
        assert_eq!(doc.remove_child(root, stray), Err(DomError::NotFound));
    }

    #[test]
    fn test_replace_child_returns_old() {
        let (mut doc, root) = doc_with_root();
        let a = doc.create_element("a").unwrap();
        doc.append_child(root, a).unwrap();
        let b = doc.create_element("b").unwrap();

        let removed = doc.replace_child(root, b, a).unwrap();
        assert_eq!(removed, a);
        assert_eq!(doc.child_nodes(root), vec![b]);
        assert_eq!(doc.parent_node(a), None);
    }

    #[test]
    fn test_replace_non_child_is_hierarchy_error() {
        let (mut doc, root) = doc_with_root();
        let a = doc.create_element("a").unwrap();
        let b = doc.create_element("b").unwrap();
        let err = doc.replace_child(root, b, a).unwrap_err();
        assert!(matches!(err, DomError::HierarchyRequest { .. }));
    }

    #[test]
    fn test_fragment_splices_in_order() {
        let (mut doc, root) = doc_with_root();
        let anchor = doc.create_element("anchor").unwrap();
        doc.append_child(root, anchor).unwrap();

        let frag = doc.create_document_fragment();
        let a = doc.create_element("a").unwrap();
        let b = doc.create_element("b").unwrap();
        let c = doc.create_element("c").unwrap();
        for n in [a, b, c] {
            doc.append_child(frag, n).unwrap();
        }

        doc.insert_before(root, frag, Some(anchor)).unwrap();
        assert_eq!(doc.child_nodes(root), vec![a, b, c, anchor]);
        assert!(doc.child_nodes(frag).is_empty());
    }

    #[test]
    fn test_fragment_with_two_elements_into_document() {
        let mut doc = Document::new();
        let frag = doc.create_document_fragment();
        let a = doc.create_element("a").unwrap();
        let b = doc.create_element("b").unwrap();
        doc.append_child(frag, a).unwrap();
        doc.append_child(frag, b).unwrap();

        let err = doc.append_child(doc.document_node(), frag).unwrap_err();
        assert!(matches!(err, DomError::HierarchyRequest { .. }));
        // Fail-fast: nothing was spliced
        assert_eq!(doc.child_nodes(frag), vec![a, b]);
    }

    #[test]
    fn test_cross_document_insert_fails() {
        let mut a = Document::new();
        let mut b = Document::new();
        let root = a.create_element("svg").unwrap();
        a.append_child(a.document_node(), root).unwrap();
        let foreign = b.create_element("rect").unwrap();

        assert_eq!(
            a.append_child(root, foreign),
            Err(DomError::WrongDocument)
        );
    }

    #[test]
    fn test_normalize_merges_adjacent_text() {
        let (mut doc, root) = doc_with_root();
        let t1 = doc.create_text("a");
        let t2 = doc.create_text("b");
        let el = doc.create_element("e").unwrap();
        doc.append_child(root, t1).unwrap();
        doc.append_child(root, t2).unwrap();
        doc.append_child(root, el).unwrap();

        doc.normalize(root).unwrap();
        assert_eq!(doc.child_nodes(root), vec![t1, el]);
        assert_eq!(doc.node_value(t1), Some("ab"));
    }

    #[test]
    fn test_normalize_recurses() {
        let (mut doc, root) = doc_with_root();
        let inner = doc.create_element("g").unwrap();
        doc.append_child(root, inner).unwrap();
        let t1 = doc.create_text("x");
        let t2 = doc.create_text("y");
        let t3 = doc.create_text("z");
        for t in [t1, t2, t3] {
            doc.append_child(inner, t).unwrap();
        }

        doc.normalize(root).unwrap();
        assert_eq!(doc.child_nodes(inner), vec![t1]);
        assert_eq!(doc.node_value(t1), Some("xyz"));
    }

    #[test]
    fn test_set_data_on_comment() {
        let (mut doc, root) = doc_with_root();
        let c = doc.create_comment("old");
        doc.append_child(root, c).unwrap();
        doc.set_data(c, "new").unwrap();
        assert_eq!(doc.node_value(c), Some("new"));
    }

    #[test]
    fn test_doctype_attach_becomes_readonly() {
        let mut doc = Document::new();
        let doctype = doc.create_document_type("svg", "", "").unwrap();
        assert!(!doc.is_readonly(doctype));
        doc.append_child(doc.document_node(), doctype).unwrap();
        assert!(doc.is_readonly(doctype));
    }
}

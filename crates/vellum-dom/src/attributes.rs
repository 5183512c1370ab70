//! Attribute Maps
//!
//! Two-tier attribute storage per element: a default table for attributes
//! without a namespace plus one sub-table per namespace URI, kept in
//! registration order. Entries are attribute nodes in the owning document's
//! arena; the map itself never touches names, the document resolves them.

use smallvec::SmallVec;

use crate::error::{DomError, DomResult};
use crate::events::{AttrChange, MutationEvent, MutationKind};
use crate::name::{validate_name, validate_qualified_name};
use crate::node::{AttrData, NodeData, NodeKind, QualifiedName};
use crate::{Document, NodeId};

/// Two-tier attribute table.
#[derive(Debug, Clone, Default)]
pub struct AttributeMap {
    base: SmallVec<[NodeId; 4]>,
    ns_tables: Vec<NsTable>,
}

#[derive(Debug, Clone)]
struct NsTable {
    uri: String,
    entries: SmallVec<[NodeId; 2]>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total entry count across all tables.
    pub fn len(&self) -> usize {
        self.base.len() + self.ns_tables.iter().map(|t| t.entries.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entry at `index`, enumerating the default table first and then each
    /// namespace sub-table in registration order.
    pub fn item(&self, index: usize) -> Option<NodeId> {
        self.iter().nth(index)
    }

    /// All entries in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.base
            .iter()
            .copied()
            .chain(self.ns_tables.iter().flat_map(|t| t.entries.iter().copied()))
    }

    pub(crate) fn insert_base(&mut self, id: NodeId) {
        self.base.push(id);
    }

    pub(crate) fn insert_ns(&mut self, uri: &str, id: NodeId) {
        if let Some(table) = self.ns_tables.iter_mut().find(|t| t.uri == uri) {
            table.entries.push(id);
        } else {
            self.ns_tables.push(NsTable {
                uri: uri.to_owned(),
                entries: SmallVec::from_elem(id, 1),
            });
        }
    }

    /// Swap `old` for `new` in place, keeping enumeration order stable.
    pub(crate) fn replace(&mut self, old: NodeId, new: NodeId) -> bool {
        if let Some(slot) = self.base.iter_mut().find(|slot| **slot == old) {
            *slot = new;
            return true;
        }
        for table in &mut self.ns_tables {
            if let Some(slot) = table.entries.iter_mut().find(|slot| **slot == old) {
                *slot = new;
                return true;
            }
        }
        false
    }

    pub(crate) fn base_entries(&self) -> &[NodeId] {
        &self.base
    }

    pub(crate) fn ns_entries(&self) -> Vec<(String, Vec<NodeId>)> {
        self.ns_tables
            .iter()
            .map(|t| (t.uri.clone(), t.entries.to_vec()))
            .collect()
    }

    pub(crate) fn remove(&mut self, id: NodeId) -> bool {
        if let Some(pos) = self.base.iter().position(|slot| *slot == id) {
            self.base.remove(pos);
            return true;
        }
        for table in &mut self.ns_tables {
            if let Some(pos) = table.entries.iter().position(|slot| *slot == id) {
                table.entries.remove(pos);
                return true;
            }
        }
        false
    }
}

impl Document {
    /// The attribute map of `element`, if it is an element.
    pub fn attributes(&self, element: NodeId) -> Option<&AttributeMap> {
        match &self.get(element)?.data {
            NodeData::Element(e) => Some(&e.attributes),
            _ => None,
        }
    }

    /// Qualified names of all attributes on `element`, in enumeration order.
    pub fn attribute_names(&self, element: NodeId) -> Vec<String> {
        let Some(map) = self.attributes(element) else {
            return Vec::new();
        };
        map.iter()
            .filter_map(|id| self.attr_data(id).map(|a| a.name.qualified()))
            .collect()
    }

    /// Look up an attribute node by qualified name in the default table.
    pub fn get_attribute_node(&self, element: NodeId, name: &str) -> Option<NodeId> {
        let map = self.attributes(element)?;
        map.base
            .iter()
            .copied()
            .find(|&id| self.attr_data(id).is_some_and(|a| a.name.qualified() == name))
    }

    /// Look up an attribute node by (namespace, local name).
    pub fn get_attribute_node_ns(
        &self,
        element: NodeId,
        namespace: Option<&str>,
        local: &str,
    ) -> Option<NodeId> {
        let map = self.attributes(element)?;
        match namespace {
            None => map.base.iter().copied().find(|&id| {
                self.attr_data(id)
                    .is_some_and(|a| a.name.namespace.is_none() && a.name.local == local)
            }),
            Some(uri) => map
                .ns_tables
                .iter()
                .find(|t| t.uri == uri)?
                .entries
                .iter()
                .copied()
                .find(|&id| self.attr_data(id).is_some_and(|a| a.name.local == local)),
        }
    }

    pub fn get_attribute(&self, element: NodeId, name: &str) -> Option<&str> {
        let id = self.get_attribute_node(element, name)?;
        self.attr_data(id).map(|a| a.value.as_str())
    }

    pub fn get_attribute_ns(
        &self,
        element: NodeId,
        namespace: Option<&str>,
        local: &str,
    ) -> Option<&str> {
        let id = self.get_attribute_node_ns(element, namespace, local)?;
        self.attr_data(id).map(|a| a.value.as_str())
    }

    pub fn has_attribute(&self, element: NodeId, name: &str) -> bool {
        self.get_attribute_node(element, name).is_some()
    }

    pub fn has_attribute_ns(&self, element: NodeId, namespace: Option<&str>, local: &str) -> bool {
        self.get_attribute_node_ns(element, namespace, local).is_some()
    }

    /// Set an attribute in the default table, replacing any prior value.
    pub fn set_attribute(&mut self, element: NodeId, name: &str, value: &str) -> DomResult<()> {
        validate_name(name)?;
        self.ensure_element(element)?;
        self.ensure_writable(element)?;

        let (old_value, change) = match self.get_attribute_node(element, name) {
            Some(attr) => {
                let old = self.set_attr_value(attr, value);
                (old, AttrChange::Modification)
            }
            None => {
                let attr = self.alloc_attr(QualifiedName::new(name), value, Some(element));
                self.element_map_mut(element)?.insert_base(attr);
                (String::new(), AttrChange::Addition)
            }
        };
        self.bump_generation();
        self.fire_attr_modified(element, name, change, old_value, value.to_owned());
        Ok(())
    }

    /// Set a namespaced attribute, replacing any prior (namespace, local)
    /// entry in the corresponding sub-table.
    pub fn set_attribute_ns(
        &mut self,
        element: NodeId,
        namespace: Option<&str>,
        qualified: &str,
        value: &str,
    ) -> DomResult<()> {
        let (prefix, local) = validate_qualified_name(namespace, qualified)?;
        self.ensure_element(element)?;
        self.ensure_writable(element)?;

        let (old_value, change) = match self.get_attribute_node_ns(element, namespace, &local) {
            Some(attr) => {
                let old = self.set_attr_value(attr, value);
                (old, AttrChange::Modification)
            }
            None => {
                let name = QualifiedName::with_namespace(
                    namespace.map(str::to_owned),
                    prefix,
                    local,
                );
                let attr = self.alloc_attr(name, value, Some(element));
                match namespace {
                    Some(uri) => self.element_map_mut(element)?.insert_ns(uri, attr),
                    None => self.element_map_mut(element)?.insert_base(attr),
                }
                (String::new(), AttrChange::Addition)
            }
        };
        self.bump_generation();
        self.fire_attr_modified(element, qualified, change, old_value, value.to_owned());
        Ok(())
    }

    /// Attach an attribute node, replacing any prior same-name entry.
    ///
    /// Returns the replaced attribute node, if any.
    pub fn set_attribute_node(
        &mut self,
        element: NodeId,
        attr: NodeId,
    ) -> DomResult<Option<NodeId>> {
        self.ensure_element(element)?;
        self.ensure_writable(element)?;
        let data = self.checked_attr(attr)?;
        match data.owner_element {
            Some(owner) if owner == element => return Ok(None),
            Some(_) => return Err(DomError::InUseAttribute),
            None => {}
        }
        let name = data.name.clone();
        let new_value = data.value.clone();

        let prior = match &name.namespace {
            Some(uri) => self.get_attribute_node_ns(element, Some(uri), &name.local),
            None => self.get_attribute_node(element, &name.qualified()),
        };
        let (old_value, change) = match prior {
            Some(old_attr) => {
                let old = self.clear_attr_owner(old_attr);
                self.element_map_mut(element)?.replace(old_attr, attr);
                (old, AttrChange::Modification)
            }
            None => {
                match &name.namespace {
                    Some(uri) => {
                        let uri = uri.clone();
                        self.element_map_mut(element)?.insert_ns(&uri, attr);
                    }
                    None => self.element_map_mut(element)?.insert_base(attr),
                }
                (String::new(), AttrChange::Addition)
            }
        };
        self.set_attr_owner(attr, Some(element));
        self.bump_generation();
        self.fire_attr_modified(element, &name.qualified(), change, old_value, new_value);
        Ok(prior)
    }

    /// Remove an attribute by qualified name. Fails NotFound if absent.
    pub fn remove_attribute(&mut self, element: NodeId, name: &str) -> DomResult<()> {
        self.ensure_element(element)?;
        self.ensure_writable(element)?;
        let attr = self
            .get_attribute_node(element, name)
            .ok_or(DomError::NotFound)?;
        self.detach_attr(element, attr, name)
    }

    /// Remove an attribute by (namespace, local name). Fails NotFound if absent.
    pub fn remove_attribute_ns(
        &mut self,
        element: NodeId,
        namespace: Option<&str>,
        local: &str,
    ) -> DomResult<()> {
        self.ensure_element(element)?;
        self.ensure_writable(element)?;
        let attr = self
            .get_attribute_node_ns(element, namespace, local)
            .ok_or(DomError::NotFound)?;
        let name = self
            .attr_data(attr)
            .map(|a| a.name.qualified())
            .ok_or(DomError::NotFound)?;
        self.detach_attr(element, attr, &name)
    }

    /// Remove a specific attribute node, returning it to the caller.
    pub fn remove_attribute_node(&mut self, element: NodeId, attr: NodeId) -> DomResult<NodeId> {
        self.ensure_element(element)?;
        self.ensure_writable(element)?;
        let data = self.checked_attr(attr)?;
        if data.owner_element != Some(element) {
            return Err(DomError::NotFound);
        }
        let name = data.name.qualified();
        self.detach_attr(element, attr, &name)?;
        Ok(attr)
    }

    fn detach_attr(&mut self, element: NodeId, attr: NodeId, name: &str) -> DomResult<()> {
        let old_value = self.clear_attr_owner(attr);
        if !self.element_map_mut(element)?.remove(attr) {
            return Err(DomError::NotFound);
        }
        self.bump_generation();
        self.fire_attr_modified(
            element,
            name,
            AttrChange::Removal,
            old_value,
            String::new(),
        );
        Ok(())
    }

    pub(crate) fn fire_attr_modified(
        &mut self,
        element: NodeId,
        attr_name: &str,
        change: AttrChange,
        old_value: String,
        new_value: String,
    ) {
        if !self.mutation_events_enabled() {
            return;
        }
        let modified = MutationEvent {
            kind: MutationKind::AttrModified,
            target: element,
            related: None,
            prev_value: Some(old_value),
            new_value: Some(new_value),
            attr_name: Some(attr_name.to_owned()),
            attr_change: Some(change),
            bubbles: true,
        };
        // The attribute-level event settles first, then the owner element
        // reports the subtree change.
        let settled = MutationEvent::subtree_modified(element);
        let batch = vec![self.queue_for(modified), self.queue_for(settled)];
        self.dispatch_batch(batch);
    }

    pub(crate) fn ensure_element(&self, id: NodeId) -> DomResult<()> {
        if self.record(id)?.kind() != NodeKind::Element {
            return Err(DomError::NotSupported {
                detail: "attributes only exist on elements",
            });
        }
        Ok(())
    }

    /// Attribute payload (name, value, specified flag, owner), if `id` is
    /// an attribute node.
    pub fn attr_data(&self, id: NodeId) -> Option<&AttrData> {
        match &self.get(id)?.data {
            NodeData::Attribute(a) => Some(a),
            _ => None,
        }
    }

    /// The element an attribute node currently belongs to.
    pub fn attribute_owner(&self, attr: NodeId) -> Option<NodeId> {
        self.attr_data(attr)?.owner_element
    }

    /// Attribute payload with document and kind checks.
    fn checked_attr(&self, id: NodeId) -> DomResult<&AttrData> {
        match &self.record(id)?.data {
            NodeData::Attribute(a) => Ok(a),
            _ => Err(DomError::NotSupported {
                detail: "node is not an attribute",
            }),
        }
    }

    fn element_map_mut(&mut self, element: NodeId) -> DomResult<&mut AttributeMap> {
        match &mut self.record_mut(element)?.data {
            NodeData::Element(e) => Ok(&mut e.attributes),
            _ => Err(DomError::NotSupported {
                detail: "attributes only exist on elements",
            }),
        }
    }

    /// Replace an attribute node's value, returning the old one.
    fn set_attr_value(&mut self, attr: NodeId, value: &str) -> String {
        match self.get_mut(attr).map(|r| &mut r.data) {
            Some(NodeData::Attribute(a)) => {
                a.specified = true;
                std::mem::replace(&mut a.value, value.to_owned())
            }
            _ => String::new(),
        }
    }

    fn set_attr_owner(&mut self, attr: NodeId, owner: Option<NodeId>) {
        if let Some(NodeData::Attribute(a)) = self.get_mut(attr).map(|r| &mut r.data) {
            a.owner_element = owner;
        }
    }

    /// Clear the owner back-reference, returning the attribute's value.
    fn clear_attr_owner(&mut self, attr: NodeId) -> String {
        match self.get_mut(attr).map(|r| &mut r.data) {
            Some(NodeData::Attribute(a)) => {
                a.owner_element = None;
                a.value.clone()
            }
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_attribute() {
        let mut doc = Document::new();
        let el = doc.create_element("rect").unwrap();
        doc.set_attribute(el, "width", "10").unwrap();
        doc.set_attribute(el, "height", "20").unwrap();

        assert_eq!(doc.get_attribute(el, "width"), Some("10"));
        assert_eq!(doc.get_attribute(el, "height"), Some("20"));
        assert_eq!(doc.attributes(el).unwrap().len(), 2);
    }

    #[test]
    fn test_set_attribute_replaces_value() {
        let mut doc = Document::new();
        let el = doc.create_element("rect").unwrap();
        doc.set_attribute(el, "x", "1").unwrap();
        let node = doc.get_attribute_node(el, "x").unwrap();
        doc.set_attribute(el, "x", "2").unwrap();

        // Same attribute node, new value
        assert_eq!(doc.get_attribute_node(el, "x"), Some(node));
        assert_eq!(doc.get_attribute(el, "x"), Some("2"));
        assert_eq!(doc.attributes(el).unwrap().len(), 1);
    }

    #[test]
    fn test_remove_attribute_not_found() {
        let mut doc = Document::new();
        let el = doc.create_element("rect").unwrap();
        assert_eq!(doc.remove_attribute(el, "x"), Err(DomError::NotFound));
    }

    #[test]
    fn test_namespaced_attributes_enumerate_after_base() {
        let mut doc = Document::new();
        let el = doc.create_element("rect").unwrap();
        doc.set_attribute_ns(el, Some("http://example.com/a"), "a:x", "1")
            .unwrap();
        doc.set_attribute(el, "plain", "2").unwrap();
        doc.set_attribute_ns(el, Some("http://example.com/b"), "b:y", "3")
            .unwrap();

        let names = doc.attribute_names(el);
        // Default table first, then sub-tables in registration order.
        assert_eq!(names, vec!["plain", "a:x", "b:y"]);
        assert_eq!(
            doc.get_attribute_ns(el, Some("http://example.com/a"), "x"),
            Some("1")
        );
    }

    #[test]
    fn test_attribute_node_in_use() {
        let mut doc = Document::new();
        let a = doc.create_element("a").unwrap();
        let b = doc.create_element("b").unwrap();
        let attr = doc.create_attribute("shared").unwrap();
        doc.set_attribute_node(a, attr).unwrap();
        assert_eq!(doc.set_attribute_node(b, attr), Err(DomError::InUseAttribute));
    }

    #[test]
    fn test_set_attribute_node_replaces_same_name() {
        let mut doc = Document::new();
        let el = doc.create_element("rect").unwrap();
        doc.set_attribute(el, "x", "old").unwrap();
        let old_node = doc.get_attribute_node(el, "x").unwrap();

        let attr = doc.create_attribute("x").unwrap();
        doc.set_attr_value(attr, "new");
        let replaced = doc.set_attribute_node(el, attr).unwrap();

        assert_eq!(replaced, Some(old_node));
        assert_eq!(doc.get_attribute(el, "x"), Some("new"));
        // The replaced node is orphaned but still owned by the document.
        assert!(doc.attr_data(old_node).unwrap().owner_element.is_none());
    }
}

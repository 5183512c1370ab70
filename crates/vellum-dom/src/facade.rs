//! Thread-Boundary Facade
//!
//! Marshals tree operations onto the document's owner thread over a
//! blocking run queue, for embedding inside a multi-threaded host. Carries
//! no tree or cascade logic of its own; every call is pure delegation.

use crossbeam_channel::{bounded, unbounded, Sender};
use std::thread::JoinHandle;

use crate::error::{DomError, DomResult};
use crate::node::NodeKind;
use crate::{Document, NodeId};

type Job = Box<dyn FnOnce(&mut Document) + Send>;

/// Owns a document on a dedicated thread and forwards operations to it.
///
/// The document is built on the owner thread and never leaves it. Callers
/// block until their operation has run; results travel back over a
/// single-use channel.
pub struct DocumentHost {
    jobs: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl DocumentHost {
    /// Spawn the owner thread and build the document on it.
    pub fn spawn<F>(build: F) -> Self
    where
        F: FnOnce() -> Document + Send + 'static,
    {
        let (jobs, queue) = unbounded::<Job>();
        let worker = std::thread::spawn(move || {
            let mut document = build();
            tracing::debug!("document owner thread started");
            while let Ok(job) = queue.recv() {
                job(&mut document);
            }
            tracing::debug!("document owner thread stopped");
        });
        Self {
            jobs: Some(jobs),
            worker: Some(worker),
        }
    }

    /// Run a closure against the document on its owner thread, blocking
    /// until the result is available.
    pub fn with<R, F>(&self, f: F) -> DomResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut Document) -> R + Send + 'static,
    {
        let jobs = self.jobs.as_ref().ok_or(DomError::InvalidState)?;
        let (reply, result) = bounded(1);
        jobs.send(Box::new(move |doc| {
            let _ = reply.send(f(doc));
        }))
        .map_err(|_| DomError::InvalidState)?;
        result.recv().map_err(|_| DomError::InvalidState)
    }

    // ---- delegating tree surface --------------------------------------

    pub fn document_node(&self) -> DomResult<NodeId> {
        self.with(|doc| doc.document_node())
    }

    pub fn create_element(&self, name: &str) -> DomResult<NodeId> {
        let name = name.to_owned();
        self.with(move |doc| doc.create_element(&name))?
    }

    pub fn create_text(&self, data: &str) -> DomResult<NodeId> {
        let data = data.to_owned();
        self.with(move |doc| doc.create_text(&data))
    }

    pub fn create_comment(&self, data: &str) -> DomResult<NodeId> {
        let data = data.to_owned();
        self.with(move |doc| doc.create_comment(&data))
    }

    pub fn append_child(&self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.with(move |doc| doc.append_child(parent, child))?
    }

    pub fn insert_before(
        &self,
        parent: NodeId,
        new_child: NodeId,
        ref_child: Option<NodeId>,
    ) -> DomResult<NodeId> {
        self.with(move |doc| doc.insert_before(parent, new_child, ref_child))?
    }

    pub fn replace_child(
        &self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> DomResult<NodeId> {
        self.with(move |doc| doc.replace_child(parent, new_child, old_child))?
    }

    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.with(move |doc| doc.remove_child(parent, child))?
    }

    pub fn set_attribute(&self, element: NodeId, name: &str, value: &str) -> DomResult<()> {
        let name = name.to_owned();
        let value = value.to_owned();
        self.with(move |doc| doc.set_attribute(element, &name, &value))?
    }

    pub fn get_attribute(&self, element: NodeId, name: &str) -> DomResult<Option<String>> {
        let name = name.to_owned();
        self.with(move |doc| doc.get_attribute(element, &name).map(str::to_owned))
    }

    pub fn remove_attribute(&self, element: NodeId, name: &str) -> DomResult<()> {
        let name = name.to_owned();
        self.with(move |doc| doc.remove_attribute(element, &name))?
    }

    pub fn set_data(&self, node: NodeId, value: &str) -> DomResult<()> {
        let value = value.to_owned();
        self.with(move |doc| doc.set_data(node, &value))?
    }

    pub fn normalize(&self, node: NodeId) -> DomResult<()> {
        self.with(move |doc| doc.normalize(node))?
    }

    pub fn kind(&self, node: NodeId) -> DomResult<Option<NodeKind>> {
        self.with(move |doc| doc.kind(node))
    }

    pub fn text_content(&self, node: NodeId) -> DomResult<String> {
        self.with(move |doc| doc.text_content(node))
    }

    pub fn child_nodes(&self, node: NodeId) -> DomResult<Vec<NodeId>> {
        self.with(move |doc| doc.child_nodes(node))
    }
}

impl Drop for DocumentHost {
    fn drop(&mut self) {
        // Closing the queue lets the owner thread run down.
        drop(self.jobs.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facade_builds_tree_across_threads() {
        let host = DocumentHost::spawn(Document::new);
        let root = host.create_element("svg").unwrap();
        let doc_node = host.document_node().unwrap();
        host.append_child(doc_node, root).unwrap();
        let text = host.create_text("hello").unwrap();
        host.append_child(root, text).unwrap();

        assert_eq!(host.text_content(root).unwrap(), "hello");
        assert_eq!(host.child_nodes(root).unwrap(), vec![text]);
    }

    #[test]
    fn test_facade_propagates_errors() {
        let host = DocumentHost::spawn(Document::new);
        let doc_node = host.document_node().unwrap();
        let text = host.create_text("stray").unwrap();
        let err = host.append_child(doc_node, text).unwrap_err();
        assert!(matches!(err, DomError::HierarchyRequest { .. }));
    }

    #[test]
    fn test_facade_attribute_roundtrip() {
        let host = DocumentHost::spawn(Document::new);
        let el = host.create_element("rect").unwrap();
        host.set_attribute(el, "x", "10").unwrap();
        assert_eq!(host.get_attribute(el, "x").unwrap().as_deref(), Some("10"));
        host.remove_attribute(el, "x").unwrap();
        assert_eq!(host.get_attribute(el, "x").unwrap(), None);
    }
}

//! Mutation Event Dispatcher
//!
//! Synchronous, ordered mutation events with bubble propagation and a
//! document-wide enable gate. Listener callbacks raised during an active
//! dispatch are queued and drained after the triggering mutation completes,
//! which bounds re-entrancy: a listener may freely mutate the tree and the
//! resulting events append to the same drain queue.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::DomResult;
use crate::{Document, NodeId};

/// Mutation event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// Attribute value add/change/remove on an element
    AttrModified,
    /// Text/comment/processing-instruction data edit
    CharacterDataModified,
    /// Structural insert, fired once per direct change
    NodeInserted,
    /// Structural removal, fired once per direct change
    NodeRemoved,
    /// Fired on the nearest container that changed, last in a batch
    SubtreeModified,
    /// Fired over a whole subtree when it becomes document-attached
    NodeInsertedIntoDocument,
    /// Fired over a whole subtree when it leaves the document
    NodeRemovedFromDocument,
}

/// Attribute change sub-type carried by AttrModified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrChange {
    Addition,
    Modification,
    Removal,
}

/// A mutation notification. All kinds are non-cancelable.
#[derive(Debug, Clone)]
pub struct MutationEvent {
    pub kind: MutationKind,
    pub target: NodeId,
    /// Parent for structural events, none otherwise.
    pub related: Option<NodeId>,
    pub prev_value: Option<String>,
    pub new_value: Option<String>,
    pub attr_name: Option<String>,
    pub attr_change: Option<AttrChange>,
    pub bubbles: bool,
}

impl MutationEvent {
    fn bare(kind: MutationKind, target: NodeId, bubbles: bool) -> Self {
        Self {
            kind,
            target,
            related: None,
            prev_value: None,
            new_value: None,
            attr_name: None,
            attr_change: None,
            bubbles,
        }
    }

    pub fn node_inserted(target: NodeId, parent: NodeId) -> Self {
        Self {
            related: Some(parent),
            ..Self::bare(MutationKind::NodeInserted, target, true)
        }
    }

    pub fn node_removed(target: NodeId, parent: NodeId) -> Self {
        Self {
            related: Some(parent),
            ..Self::bare(MutationKind::NodeRemoved, target, true)
        }
    }

    pub fn inserted_into_document(target: NodeId) -> Self {
        Self::bare(MutationKind::NodeInsertedIntoDocument, target, false)
    }

    pub fn removed_from_document(target: NodeId) -> Self {
        Self::bare(MutationKind::NodeRemovedFromDocument, target, false)
    }

    pub fn subtree_modified(target: NodeId) -> Self {
        Self::bare(MutationKind::SubtreeModified, target, true)
    }

    pub fn char_data_modified(target: NodeId, old: String, new: String) -> Self {
        Self {
            prev_value: Some(old),
            new_value: Some(new),
            ..Self::bare(MutationKind::CharacterDataModified, target, true)
        }
    }
}

/// Handle for unregistering a listener.
pub type ListenerId = u64;

type ListenerFn = dyn FnMut(&mut Document, &MutationEvent);

pub(crate) struct ListenerEntry {
    pub id: ListenerId,
    pub kind: MutationKind,
    pub callback: Rc<RefCell<ListenerFn>>,
}

/// An event plus its propagation path, snapshotted when the event was
/// constructed so removal events still see their old ancestor chain.
pub(crate) struct QueuedEvent {
    pub event: MutationEvent,
    pub path: Vec<NodeId>,
}

impl Document {
    /// Register a listener for one mutation kind on one node. The listener
    /// runs for events targeted at the node and for bubbling events from
    /// its descendants.
    pub fn add_event_listener<F>(
        &mut self,
        node: NodeId,
        kind: MutationKind,
        callback: F,
    ) -> DomResult<ListenerId>
    where
        F: FnMut(&mut Document, &MutationEvent) + 'static,
    {
        self.record(node)?;
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        self.listeners.entry(node).or_default().push(ListenerEntry {
            id,
            kind,
            callback: Rc::new(RefCell::new(callback)),
        });
        Ok(id)
    }

    /// Unregister a listener; returns whether it was found.
    pub fn remove_event_listener(&mut self, node: NodeId, id: ListenerId) -> bool {
        match self.listeners.get_mut(&node) {
            Some(entries) => {
                let before = entries.len();
                entries.retain(|e| e.id != id);
                entries.len() != before
            }
            None => false,
        }
    }

    /// Document-wide gate. While disabled, mutation paths skip event
    /// construction entirely.
    pub fn set_mutation_events_enabled(&mut self, enabled: bool) {
        self.events_enabled = enabled;
    }

    pub fn mutation_events_enabled(&self) -> bool {
        self.events_enabled
    }

    /// Target-to-root chain for a bubbling event.
    pub(crate) fn bubble_path(&self, target: NodeId) -> Vec<NodeId> {
        let mut path = vec![target];
        let mut cursor = self.parent_node(target);
        while let Some(n) = cursor {
            path.push(n);
            cursor = self.parent_node(n);
        }
        path
    }

    pub(crate) fn queue_for(&self, event: MutationEvent) -> QueuedEvent {
        let path = if event.bubbles {
            self.bubble_path(event.target)
        } else {
            vec![event.target]
        };
        QueuedEvent { event, path }
    }

    /// Enqueue a batch and, unless a dispatch is already running further up
    /// the stack, drain the queue. Listeners invoked here may mutate the
    /// tree; any events they raise join the same queue.
    pub(crate) fn dispatch_batch(&mut self, batch: Vec<QueuedEvent>) {
        self.pending.extend(batch);
        if self.dispatching {
            return;
        }
        self.dispatching = true;
        while let Some(queued) = self.pending.pop_front() {
            for &node in &queued.path {
                let callbacks: Vec<Rc<RefCell<ListenerFn>>> = match self.listeners.get(&node) {
                    Some(entries) => entries
                        .iter()
                        .filter(|e| e.kind == queued.event.kind)
                        .map(|e| Rc::clone(&e.callback))
                        .collect(),
                    None => continue,
                };
                for callback in callbacks {
                    (&mut *callback.borrow_mut())(self, &queued.event);
                }
            }
        }
        self.dispatching = false;
    }
}

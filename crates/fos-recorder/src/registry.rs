//! Identity Registry
//!
//! Associates live elements with [`Identity`] values and takes the one-time
//! document snapshot.
//!
//! The association is keyed by [`NodeId`], a handle the arena never reuses,
//! so the registry holds no ownership over nodes. Each assigned element also
//! carries the identity as a marker attribute while it is being serialized;
//! the marker is stripped from the live tree right after every capture.

use std::collections::HashMap;

use fos_dom::{Document, DomTree, NodeId};
use fos_html::get_outer_html;

use crate::{Identity, RecorderError, Result};

/// Outcome of a snapshot request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotState {
    /// Document still loading; request again once it is interactive
    Deferred,
    /// Snapshot captured
    Taken,
}

/// Node identity registry
#[derive(Debug)]
pub struct Registry {
    ids: HashMap<NodeId, Identity>,
    last: u32,
    marker: String,
    snapshot: Option<String>,
    pending: bool,
}

impl Registry {
    pub fn new(marker: &str) -> Self {
        Self {
            ids: HashMap::new(),
            last: 0,
            marker: marker.to_string(),
            snapshot: None,
            pending: false,
        }
    }

    /// Marker attribute name
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Identity of `node`, allocating one on first sight.
    ///
    /// The marker attribute is (re)written every time. Returns `None` for
    /// anything that is not an element.
    pub fn assign(&mut self, tree: &mut DomTree, node: NodeId) -> Option<Identity> {
        if !tree.is_element(node) {
            return None;
        }

        let id = match self.ids.get(&node) {
            Some(&id) => id,
            None => {
                self.last += 1;
                let id = Identity::from(self.last);
                self.ids.insert(node, id);
                id
            }
        };

        tree.set_attribute(node, &self.marker, &id.to_string()).ok()?;
        Some(id)
    }

    /// Assign `node` and every descendant element, in tree order
    pub fn register_subtree(&mut self, tree: &mut DomTree, node: NodeId) -> Vec<Identity> {
        let mut assigned = Vec::new();
        assigned.extend(self.assign(tree, node));
        for element in tree.descendant_elements(node) {
            assigned.extend(self.assign(tree, element));
        }
        assigned
    }

    /// Identity of `node`, if it was ever assigned.
    ///
    /// `NodeId::NONE`, text nodes and unknown nodes all yield `None`.
    pub fn lookup(&self, node: NodeId) -> Option<Identity> {
        self.ids.get(&node).copied()
    }

    /// Strip the marker attribute; the association stays valid
    pub fn unmark(&self, tree: &mut DomTree, node: NodeId, deep: bool) {
        self.strip(tree, node);
        if deep {
            for element in tree.descendant_elements(node) {
                self.strip(tree, element);
            }
        }
    }

    fn strip(&self, tree: &mut DomTree, node: NodeId) {
        if tree.is_element(node) {
            // Only NotFound/InvalidNodeType can fail here, both ruled out above
            let _ = tree.remove_attribute(node, &self.marker);
        }
    }

    /// Forget one association. The identity is not reissued.
    pub fn release(&mut self, node: NodeId) -> Option<Identity> {
        self.ids.remove(&node)
    }

    /// Forget `node` and its descendant elements; returns how many were known
    pub fn release_subtree(&mut self, tree: &DomTree, node: NodeId) -> usize {
        let mut released = usize::from(self.release(node).is_some());
        for element in tree.descendant_elements(node) {
            released += usize::from(self.release(element).is_some());
        }
        released
    }

    /// Take the document snapshot.
    ///
    /// Every element gets an identity and a marker, the `<html>` element's
    /// outer markup is captured with the markers in it, then the markers are
    /// stripped from the live tree. While the document is still loading, or
    /// has no `<html>` element yet, this returns [`SnapshotState::Deferred`]
    /// and has no effect.
    pub fn take_snapshot(&mut self, document: &mut Document) -> Result<SnapshotState> {
        if self.snapshot.is_some() {
            return Err(RecorderError::SnapshotAlreadyTaken);
        }
        let html = match document.document_element() {
            Some(html) if document.is_ready() => html,
            _ => {
                if !self.pending {
                    tracing::debug!(
                        "Snapshot of {} deferred until the document is interactive",
                        document.url()
                    );
                }
                self.pending = true;
                return Ok(SnapshotState::Deferred);
            }
        };

        let tree = document.tree_mut();
        let elements = tree.descendant_elements(tree.root());
        for &element in &elements {
            self.assign(tree, element);
        }

        let snapshot = get_outer_html(tree, html);

        for &element in &elements {
            self.unmark(tree, element, false);
        }

        tracing::debug!(
            "Document snapshot: {} elements, {} bytes",
            elements.len(),
            snapshot.len()
        );
        self.snapshot = Some(snapshot);
        self.pending = false;
        Ok(SnapshotState::Taken)
    }

    /// The document snapshot, once taken
    pub fn snapshot(&self) -> Option<&str> {
        self.snapshot.as_deref()
    }

    pub fn is_initialized(&self) -> bool {
        self.snapshot.is_some()
    }

    /// A snapshot was requested but is waiting for the document
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Number of live associations
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Most recently allocated identity
    pub fn last_assigned(&self) -> Option<Identity> {
        (self.last > 0).then(|| Identity::from(self.last))
    }
}

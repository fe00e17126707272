//! Document - High-level document API

use crate::{DomTree, NodeId};

/// Document loading state, ordered from least to most ready
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ReadyState {
    #[default]
    Loading,
    Interactive,
    Complete,
}

/// HTML Document
#[derive(Debug)]
pub struct Document {
    tree: DomTree,
    url: String,
    ready_state: ReadyState,
}

impl Document {
    /// Create a document with an empty html/head/body skeleton
    pub fn new(url: &str) -> Self {
        let mut tree = DomTree::new();

        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let body = tree.create_element("body");

        // Freshly created nodes under a container cannot fail to link
        let _ = tree.append_child(tree.root(), html);
        let _ = tree.append_child(html, head);
        let _ = tree.append_child(html, body);

        Self {
            tree,
            url: url.to_string(),
            ready_state: ReadyState::Complete,
        }
    }

    /// Create an empty document (no structure, still loading)
    pub fn empty(url: &str) -> Self {
        Self::from_tree(url, DomTree::new(), ReadyState::Loading)
    }

    /// Wrap an existing tree
    pub fn from_tree(url: &str, tree: DomTree, ready_state: ReadyState) -> Self {
        Self {
            tree,
            url: url.to_string(),
            ready_state,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    /// Interactive or complete
    pub fn is_ready(&self) -> bool {
        self.ready_state >= ReadyState::Interactive
    }

    /// Advance the loading state; returns true if it changed
    pub fn set_ready_state(&mut self, state: ReadyState) -> bool {
        if self.ready_state == state {
            return false;
        }
        tracing::debug!("Document {} ready state {:?} -> {:?}", self.url, self.ready_state, state);
        self.ready_state = state;
        true
    }

    /// `<html>` element
    pub fn document_element(&self) -> Option<NodeId> {
        self.tree.document_element()
    }

    /// `<head>` element
    pub fn head(&self) -> Option<NodeId> {
        self.child_element_named("head")
    }

    /// `<body>` element
    pub fn body(&self) -> Option<NodeId> {
        self.child_element_named("body")
    }

    fn child_element_named(&self, tag: &str) -> Option<NodeId> {
        let html = self.document_element()?;
        self.tree
            .element_children(html)
            .into_iter()
            .find(|&id| self.tree.tag_name(id) == Some(tag))
    }

    /// Text of the first `<title>` in `<head>`
    pub fn title(&self) -> String {
        let Some(head) = self.head() else {
            return String::new();
        };
        self.tree
            .element_children(head)
            .into_iter()
            .find(|&id| self.tree.tag_name(id) == Some("title"))
            .map(|id| self.tree.text_content(id))
            .unwrap_or_default()
    }

    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("about:blank")
    }
}

//! fOS DOM - Document Object Model
//!
//! Arena-based DOM tree used as the observation host for the recorder.
//! Nodes are addressed by [`NodeId`] and never freed, so a handle is never
//! reused for a different node.

mod document;
mod interner;
mod node;
mod observer;
mod operations;
mod tree;

pub use document::{Document, ReadyState};
pub use interner::{InternedString, StringInterner};
pub use node::{Attribute, ElementData, Node, NodeData, NodeType, QualName, TextData};
pub use observer::{MutationObserverInit, MutationRecord, MutationType, ObserverId};
pub use operations::{DomError, DomResult};
pub use tree::{Children, DomTree};

/// HTML namespace URI
pub const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root node ID (the document node)
    pub const ROOT: NodeId = NodeId(0);

    /// Null handle
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check if this handle points at a node
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    /// Convert a null handle into `None`
    #[inline]
    pub fn some(self) -> Option<NodeId> {
        self.is_valid().then_some(self)
    }

    /// Arena index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

//! DOM Tree (arena-based allocation)
//!
//! Structural, attribute and character-data mutations go through this type so
//! that every change inside an observed subtree is reported to the registered
//! mutation observers in the order it happened.

use crate::observer::ObserverList;
use crate::{
    DomError, DomResult, InternedString, MutationObserverInit, MutationRecord, Node, NodeData,
    NodeId, NodeType, ObserverId, QualName, StringInterner, HTML_NAMESPACE,
};

/// Arena-based DOM tree
#[derive(Debug)]
pub struct DomTree {
    nodes: Vec<Node>,
    interner: StringInterner,
    observers: ObserverList,
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::document()],
            interner: StringInterner::new(),
            observers: ObserverList::default(),
        }
    }

    /// The document node
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Number of nodes ever allocated (detached ones included)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always holds its document node
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn interner(&self) -> &StringInterner {
        &self.interner
    }

    pub fn interner_mut(&mut self) -> &mut StringInterner {
        &mut self.interner
    }

    /// Resolve an interned name
    #[inline]
    pub fn resolve(&self, s: InternedString) -> &str {
        self.interner.get(s)
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Create a detached HTML element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.create_element_ns(HTML_NAMESPACE, &tag.to_ascii_lowercase())
    }

    /// Create a detached element in a namespace
    pub fn create_element_ns(&mut self, ns: &str, local: &str) -> NodeId {
        let ns = self.interner.intern(ns);
        let local = self.interner.intern(local);
        self.push(Node::element(QualName::new(ns, local)))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.push(Node::text(content.to_string()))
    }

    /// Create a detached comment node
    pub fn create_comment(&mut self, content: &str) -> NodeId {
        self.push(Node::comment(content.to_string()))
    }

    /// Create a detached doctype node
    pub fn create_doctype(&mut self, name: &str, public_id: &str, system_id: &str) -> NodeId {
        let name = self.interner.intern(name);
        self.push(Node {
            data: NodeData::Doctype {
                name,
                public_id: public_id.to_string(),
                system_id: system_id.to_string(),
            },
            ..Node::document()
        })
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent.some()
    }

    /// Parent if it is an element (the document node is not)
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|&p| self.is_element(p))
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.first_child.some()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.prev_sibling.some()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.next_sibling.some()
    }

    /// Iterate over direct children
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.get(id).map_or(NodeId::NONE, |n| n.first_child),
        }
    }

    pub fn child_ids(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).map(|(child, _)| child).collect()
    }

    /// Position of `child` in `parent`'s child list (text nodes count)
    pub fn child_index(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).position(|(id, _)| id == child)
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .filter(|(_, node)| node.is_element())
            .map(|(child, _)| child)
            .collect()
    }

    /// All descendants in tree order, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.child_ids(id).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.child_ids(current).into_iter().rev());
        }
        out
    }

    /// Descendant elements in tree order, excluding `id` itself
    pub fn descendant_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&d| self.is_element(d))
            .collect()
    }

    /// Is `node` an inclusive descendant of `ancestor`
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        contains(&self.nodes, ancestor, node)
    }

    /// Is the node attached to the document
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(NodeId::ROOT, id)
    }

    /// The `<html>` element, if any
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(NodeId::ROOT)
            .find(|(_, node)| node.is_element())
            .map(|(id, _)| id)
    }

    pub fn node_type(&self, id: NodeId) -> Option<NodeType> {
        self.get(id).map(Node::node_type)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_element)
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_text)
    }

    /// Lowercase local name of an element
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        let elem = self.get(id)?.as_element()?;
        Some(self.resolve(elem.name.local))
    }

    /// DOM `textContent`
    pub fn text_content(&self, id: NodeId) -> String {
        let Some(node) = self.get(id) else {
            return String::new();
        };
        if let Some(data) = node.character_data() {
            return data.to_string();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|d| self.get(d).and_then(Node::as_text))
            .collect()
    }

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        let name = self.interner.lookup(name)?;
        self.get(id)?.as_element()?.get_attr(name)
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.get_attribute(id, name).is_some()
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Append a child node
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.insert_before(parent, child, None)
    }

    /// Append several detached nodes at once, like inserting a
    /// `DocumentFragment`: one notification lists all of them in order.
    pub fn append_children(&mut self, parent: NodeId, children: &[NodeId]) -> DomResult<()> {
        for &child in children {
            self.check_insertion(parent, child)?;
            if self.parent(child).is_some() {
                return Err(DomError::HierarchyRequest);
            }
        }
        if children.is_empty() {
            return Ok(());
        }

        let prev = self.get(parent).and_then(|p| p.last_child.some());
        for &child in children {
            self.link(parent, child, None);
        }
        self.queue(MutationRecord::child_list(
            parent,
            children.to_vec(),
            Vec::new(),
            prev,
            None,
        ));
        Ok(())
    }

    /// Insert `child` before `reference` (or at the end)
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<NodeId> {
        self.check_insertion(parent, child)?;
        if let Some(r) = reference {
            if self.parent(r) != Some(parent) {
                return Err(DomError::NotAChild);
            }
        }

        let mut reference = reference;
        if reference == Some(child) {
            reference = self.next_sibling(child);
        }

        if let Some(old_parent) = self.parent(child) {
            self.remove_child(old_parent, child)?;
        }

        let prev = match reference {
            Some(r) => self.previous_sibling(r),
            None => self.get(parent).and_then(|p| p.last_child.some()),
        };
        self.link(parent, child, reference);
        self.queue(MutationRecord::child_list(
            parent,
            vec![child],
            Vec::new(),
            prev,
            reference,
        ));
        Ok(child)
    }

    /// Remove a child node
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        if self.get(parent).is_none() || self.get(child).is_none() {
            return Err(DomError::NotFound);
        }
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotAChild);
        }

        let prev = self.previous_sibling(child);
        let next = self.next_sibling(child);
        self.unlink(child);
        self.queue(MutationRecord::child_list(
            parent,
            Vec::new(),
            vec![child],
            prev,
            next,
        ));
        Ok(child)
    }

    /// Replace `old_child` with `new_child` (one notification)
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> DomResult<NodeId> {
        self.check_insertion(parent, new_child)?;
        if self.parent(old_child) != Some(parent) {
            return Err(DomError::NotAChild);
        }
        if new_child == old_child {
            return Ok(old_child);
        }

        let mut reference = self.next_sibling(old_child);
        if reference == Some(new_child) {
            reference = self.next_sibling(new_child);
        }
        if let Some(old_parent) = self.parent(new_child) {
            self.remove_child(old_parent, new_child)?;
        }

        let prev = self.previous_sibling(old_child);
        self.unlink(old_child);
        self.link(parent, new_child, reference);
        self.queue(MutationRecord::child_list(
            parent,
            vec![new_child],
            vec![old_child],
            prev,
            reference,
        ));
        Ok(old_child)
    }

    /// DOM `textContent` setter.
    ///
    /// On a container every child is replaced by a single text node (none if
    /// `text` is empty) in one notification.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> DomResult<()> {
        let node = self.get(id).ok_or(DomError::NotFound)?;
        match node.node_type() {
            NodeType::Text | NodeType::Comment => return self.set_text(id, text),
            NodeType::DocumentType => return Err(DomError::InvalidNodeType),
            NodeType::Element | NodeType::Document => {}
        }

        let removed = self.child_ids(id);
        for &child in &removed {
            self.unlink(child);
        }

        let mut added = Vec::new();
        if !text.is_empty() {
            let text_node = self.create_text(text);
            self.link(id, text_node, None);
            added.push(text_node);
        }

        if !added.is_empty() || !removed.is_empty() {
            self.queue(MutationRecord::child_list(id, added, removed, None, None));
        }
        Ok(())
    }

    /// Set an attribute on an element
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<()> {
        let name_id = self.interner.intern(name);
        let elem = self
            .node_mut(id)
            .ok_or(DomError::NotFound)?
            .as_element_mut()
            .ok_or(DomError::InvalidNodeType)?;
        let old = elem.set_attr(name_id, value.to_string());
        self.queue(MutationRecord::attributes(id, name, old));
        Ok(())
    }

    /// Remove an attribute; returns whether it was present
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> DomResult<bool> {
        let Some(name_id) = self.interner.lookup(name) else {
            return Ok(false);
        };
        let elem = self
            .node_mut(id)
            .ok_or(DomError::NotFound)?
            .as_element_mut()
            .ok_or(DomError::InvalidNodeType)?;
        let Some(old) = elem.remove_attr(name_id) else {
            return Ok(false);
        };
        self.queue(MutationRecord::attributes(id, name, Some(old)));
        Ok(true)
    }

    /// Replace the data of a text or comment node
    pub fn set_text(&mut self, id: NodeId, data: &str) -> DomResult<()> {
        let node = self.node_mut(id).ok_or(DomError::NotFound)?;
        let old = match &mut node.data {
            NodeData::Text(t) => std::mem::replace(&mut t.content, data.to_string()),
            NodeData::Comment(c) => std::mem::replace(c, data.to_string()),
            _ => return Err(DomError::InvalidNodeType),
        };
        self.queue(MutationRecord::character_data(id, Some(old)));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    /// Register a mutation observer on `target`
    pub fn observe(&mut self, target: NodeId, init: MutationObserverInit) -> DomResult<ObserverId> {
        if self.get(target).is_none() {
            return Err(DomError::NotFound);
        }
        self.observers.register(target, init)
    }

    /// Take the pending batch of an observer
    pub fn take_records(&mut self, id: ObserverId) -> Vec<MutationRecord> {
        self.observers.take_records(id)
    }

    pub fn has_pending_records(&self, id: ObserverId) -> bool {
        self.observers.has_pending(id)
    }

    /// Stop an observer; pending records are discarded
    pub fn disconnect(&mut self, id: ObserverId) -> bool {
        self.observers.disconnect(id)
    }

    /// Simulate a host without the MutationObserver API
    pub fn set_mutation_observer_supported(&mut self, supported: bool) {
        self.observers.set_supported(supported);
    }

    pub fn supports_mutation_observer(&self) -> bool {
        self.observers.is_supported()
    }

    fn queue(&mut self, record: MutationRecord) {
        if self.observers.is_empty() {
            return;
        }
        let nodes = &self.nodes;
        self.observers
            .queue(record, |root, target| contains(nodes, root, target));
    }

    // ------------------------------------------------------------------
    // Raw linking
    // ------------------------------------------------------------------

    fn check_insertion(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        let parent_node = self.get(parent).ok_or(DomError::NotFound)?;
        let child_node = self.get(child).ok_or(DomError::NotFound)?;
        if !parent_node.is_container() {
            return Err(DomError::HierarchyRequest);
        }
        if matches!(child_node.data, NodeData::Document) {
            return Err(DomError::HierarchyRequest);
        }
        if self.contains(child, parent) {
            return Err(DomError::HierarchyRequest);
        }
        Ok(())
    }

    /// Link a detached node into `parent` before `before`
    fn link(&mut self, parent: NodeId, child: NodeId, before: Option<NodeId>) {
        let prev = match before {
            Some(b) => self.nodes[b.index()].prev_sibling,
            None => self.nodes[parent.index()].last_child,
        };
        let next = before.unwrap_or(NodeId::NONE);

        {
            let node = &mut self.nodes[child.index()];
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = next;
        }

        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = child;
        } else {
            self.nodes[parent.index()].first_child = child;
        }
        if next.is_valid() {
            self.nodes[next.index()].prev_sibling = child;
        } else {
            self.nodes[parent.index()].last_child = child;
        }
    }

    /// Detach a node from its parent; children stay attached to it
    fn unlink(&mut self, child: NodeId) {
        let (parent, prev, next) = {
            let node = &self.nodes[child.index()];
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        if !parent.is_valid() {
            return;
        }

        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = next;
        } else {
            self.nodes[parent.index()].first_child = next;
        }
        if next.is_valid() {
            self.nodes[next.index()].prev_sibling = prev;
        } else {
            self.nodes[parent.index()].last_child = prev;
        }

        let node = &mut self.nodes[child.index()];
        node.parent = NodeId::NONE;
        node.prev_sibling = NodeId::NONE;
        node.next_sibling = NodeId::NONE;
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

fn contains(nodes: &[Node], ancestor: NodeId, node: NodeId) -> bool {
    let mut current = node;
    while let Some(n) = nodes.get(current.index()) {
        if current == ancestor {
            return true;
        }
        current = n.parent;
    }
    false
}

/// Iterator over the direct children of a node
pub struct Children<'a> {
    tree: &'a DomTree,
    next: NodeId,
}

impl<'a> Iterator for Children<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next;
        let node = self.tree.get(id)?;
        self.next = node.next_sibling;
        Some((id, node))
    }
}

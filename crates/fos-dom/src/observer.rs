//! MutationObserver
//!
//! Host-side change notification channel. The tree queues a raw record for
//! every mutation; each registered observer keeps the records it is
//! interested in until they are taken as one batch.

use crate::{DomError, DomResult, NodeId};

/// Handle of a registered observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u32);

/// Mutation observer options
#[derive(Debug, Clone, Default)]
pub struct MutationObserverInit {
    pub child_list: bool,
    pub attributes: bool,
    pub character_data: bool,
    pub subtree: bool,
    pub attribute_old_value: bool,
    pub character_data_old_value: bool,
    pub attribute_filter: Option<Vec<String>>,
}

impl MutationObserverInit {
    /// Everything below the target, no old values
    pub fn all() -> Self {
        Self {
            child_list: true,
            attributes: true,
            character_data: true,
            subtree: true,
            ..Default::default()
        }
    }
}

/// Raw mutation record as delivered by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub mutation_type: MutationType,
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
    pub previous_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub attribute_name: Option<String>,
    pub old_value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    Attributes,
    CharacterData,
    ChildList,
}

impl MutationRecord {
    pub fn child_list(
        target: NodeId,
        added_nodes: Vec<NodeId>,
        removed_nodes: Vec<NodeId>,
        previous_sibling: Option<NodeId>,
        next_sibling: Option<NodeId>,
    ) -> Self {
        Self {
            mutation_type: MutationType::ChildList,
            target,
            added_nodes,
            removed_nodes,
            previous_sibling,
            next_sibling,
            attribute_name: None,
            old_value: None,
        }
    }

    pub fn attributes(target: NodeId, name: &str, old_value: Option<String>) -> Self {
        Self {
            mutation_type: MutationType::Attributes,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
            attribute_name: Some(name.to_string()),
            old_value,
        }
    }

    pub fn character_data(target: NodeId, old_value: Option<String>) -> Self {
        Self {
            mutation_type: MutationType::CharacterData,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
            attribute_name: None,
            old_value,
        }
    }
}

/// Mutation observer
#[derive(Debug)]
struct MutationObserver {
    id: ObserverId,
    target: NodeId,
    options: MutationObserverInit,
    records: Vec<MutationRecord>,
}

impl MutationObserver {
    fn wants(&self, record: &MutationRecord) -> bool {
        match record.mutation_type {
            MutationType::ChildList => self.options.child_list,
            MutationType::CharacterData => self.options.character_data,
            MutationType::Attributes => {
                self.options.attributes
                    && match (&self.options.attribute_filter, &record.attribute_name) {
                        (Some(filter), Some(name)) => filter.iter().any(|f| f == name),
                        _ => true,
                    }
            }
        }
    }

    fn keep_old_value(&self, kind: MutationType) -> bool {
        match kind {
            MutationType::Attributes => self.options.attribute_old_value,
            MutationType::CharacterData => self.options.character_data_old_value,
            MutationType::ChildList => false,
        }
    }
}

/// All observers registered on one tree
#[derive(Debug)]
pub(crate) struct ObserverList {
    observers: Vec<MutationObserver>,
    next_id: u32,
    supported: bool,
}

impl Default for ObserverList {
    fn default() -> Self {
        Self {
            observers: Vec::new(),
            next_id: 1,
            supported: true,
        }
    }
}

impl ObserverList {
    pub(crate) fn set_supported(&mut self, supported: bool) {
        self.supported = supported;
    }

    pub(crate) fn is_supported(&self) -> bool {
        self.supported
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub(crate) fn register(
        &mut self,
        target: NodeId,
        options: MutationObserverInit,
    ) -> DomResult<ObserverId> {
        if !self.supported {
            return Err(DomError::NotSupported);
        }
        if !(options.child_list || options.attributes || options.character_data) {
            return Err(DomError::InvalidObserverOptions);
        }

        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push(MutationObserver {
            id,
            target,
            options,
            records: Vec::new(),
        });
        tracing::debug!("MutationObserver {:?} observing {:?}", id, target);
        Ok(id)
    }

    pub(crate) fn disconnect(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| o.id != id);
        before != self.observers.len()
    }

    pub(crate) fn take_records(&mut self, id: ObserverId) -> Vec<MutationRecord> {
        self.observers
            .iter_mut()
            .find(|o| o.id == id)
            .map(|o| std::mem::take(&mut o.records))
            .unwrap_or_default()
    }

    pub(crate) fn has_pending(&self, id: ObserverId) -> bool {
        self.observers
            .iter()
            .any(|o| o.id == id && !o.records.is_empty())
    }

    /// Queue a record for every interested observer.
    ///
    /// `contains(root, target)` answers whether `target` is an inclusive
    /// descendant of `root`.
    pub(crate) fn queue(
        &mut self,
        record: MutationRecord,
        contains: impl Fn(NodeId, NodeId) -> bool,
    ) {
        for observer in &mut self.observers {
            let in_scope = observer.target == record.target
                || (observer.options.subtree && contains(observer.target, record.target));
            if !in_scope || !observer.wants(&record) {
                continue;
            }

            let mut queued = record.clone();
            if !observer.keep_old_value(record.mutation_type) {
                queued.old_value = None;
            }
            observer.records.push(queued);
        }
    }
}

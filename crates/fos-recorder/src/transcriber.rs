//! Mutation Transcriber
//!
//! Turns batches of raw host notifications into [`MutationRecord`]s.
//!
//! Each notification is classified once (ignore, attribute, text, node) and
//! either transcribed or dropped. Records come out in exactly the order the
//! host queued the notifications; nothing is merged or reordered, since a
//! later record in a batch may target an element registered by an earlier
//! one.

use fos_dom::{
    Document, DomError, DomTree, MutationObserverInit, MutationRecord as RawMutation,
    MutationType, NodeId, NodeType, ObserverId,
};
use fos_html::HtmlSerializer;

use crate::{
    AddedNode, MutationRecord, RecorderConfig, RecorderError, ReclaimPolicy, Registry,
    RemovedNode, Result, TextPayload,
};

/// Counters kept across batches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranscriberStats {
    /// Batches processed
    pub batches: u64,
    /// Records emitted
    pub emitted: u64,
    /// Notifications that carried nothing reconstructable
    pub dropped: u64,
    /// Observation artifacts (script targets, marker writes)
    pub ignored: u64,
    /// Identities released under [`ReclaimPolicy::OnDetach`]
    pub released: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Classification {
    Ignore,
    Attribute,
    Text,
    Node,
}

/// Mutation transcriber
#[derive(Debug)]
pub struct MutationTranscriber {
    registry: Registry,
    observer: Option<ObserverId>,
    init: MutationObserverInit,
    reclaim: ReclaimPolicy,
    capture: HtmlSerializer,
    stats: TranscriberStats,
}

impl MutationTranscriber {
    /// Create a transcriber around an explicit registry
    pub fn new(registry: Registry, config: &RecorderConfig) -> Self {
        let capture = HtmlSerializer::skipping_attribute(registry.marker());
        Self {
            registry,
            observer: None,
            init: config.observer_init(),
            reclaim: config.reclaim,
            capture,
            stats: TranscriberStats::default(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn stats(&self) -> TranscriberStats {
        self.stats
    }

    /// Is the host subscription active
    pub fn is_installed(&self) -> bool {
        self.observer.is_some()
    }

    /// Subscribe to the host's notifications for the document element's
    /// subtree. Installing twice is a no-op.
    pub fn install(&mut self, document: &mut Document) -> Result<()> {
        if self.observer.is_some() {
            return Ok(());
        }
        let tree = document.tree_mut();
        if !tree.supports_mutation_observer() {
            return Err(RecorderError::MutationObservationUnavailable);
        }
        let root = tree
            .document_element()
            .ok_or(RecorderError::NoDocumentElement)?;

        let id = tree.observe(root, self.init.clone()).map_err(|e| match e {
            DomError::NotSupported => RecorderError::MutationObservationUnavailable,
            other => RecorderError::Dom(other),
        })?;
        tracing::debug!("Mutation transcriber installed on {}", document.url());
        self.observer = Some(id);
        Ok(())
    }

    /// Drop the host subscription; pending notifications are discarded.
    /// Identities already assigned stay valid.
    pub fn uninstall(&mut self, document: &mut Document) -> bool {
        let Some(id) = self.observer.take() else {
            return false;
        };
        document.tree_mut().disconnect(id);
        tracing::debug!(
            "Mutation transcriber uninstalled ({} records emitted)",
            self.stats.emitted
        );
        true
    }

    /// Take the pending batch from the host and transcribe it
    pub fn deliver(
        &mut self,
        document: &mut Document,
        emit: impl FnMut(MutationRecord),
    ) -> usize {
        let Some(id) = self.observer else {
            return 0;
        };
        let tree = document.tree_mut();
        let batch = tree.take_records(id);
        if batch.is_empty() {
            return 0;
        }
        self.process_batch(tree, &batch, emit)
    }

    /// Transcribe one batch in host order; returns the number of records
    /// passed to `emit`
    pub fn process_batch(
        &mut self,
        tree: &mut DomTree,
        batch: &[RawMutation],
        mut emit: impl FnMut(MutationRecord),
    ) -> usize {
        self.stats.batches += 1;
        let mut emitted = 0;
        for raw in batch {
            if let Some(record) = self.transcribe(tree, raw) {
                emit(record);
                emitted += 1;
            }
        }

        if self.reclaim == ReclaimPolicy::OnDetach {
            self.reclaim_detached(tree, batch);
        }

        tracing::trace!("Batch of {}: {} records", batch.len(), emitted);
        emitted
    }

    /// Classify and transcribe a single notification
    pub fn transcribe(&mut self, tree: &mut DomTree, raw: &RawMutation) -> Option<MutationRecord> {
        let record = match self.classify(tree, raw) {
            Classification::Ignore => {
                self.stats.ignored += 1;
                return None;
            }
            Classification::Attribute => self.attribute_record(tree, raw),
            Classification::Text => self.text_record(tree, raw),
            Classification::Node => self.node_record(tree, raw),
        };

        match record {
            Some(_) => self.stats.emitted += 1,
            None => {
                self.stats.dropped += 1;
                tracing::trace!("Dropped {:?} on {:?}", raw.mutation_type, raw.target);
            }
        }
        record
    }

    fn classify(&self, tree: &DomTree, raw: &RawMutation) -> Classification {
        if tree.tag_name(raw.target) == Some("script") {
            return Classification::Ignore;
        }
        match raw.mutation_type {
            MutationType::Attributes
                if raw.attribute_name.as_deref() == Some(self.registry.marker()) =>
            {
                Classification::Ignore
            }
            MutationType::Attributes => Classification::Attribute,
            MutationType::CharacterData => Classification::Text,
            MutationType::ChildList => Classification::Node,
        }
    }

    fn attribute_record(&self, tree: &DomTree, raw: &RawMutation) -> Option<MutationRecord> {
        let target = self.registry.lookup(raw.target)?;
        let name = raw.attribute_name.clone()?;
        // Read live: the host may have coalesced several writes
        let value = tree.get_attribute(raw.target, &name).map(str::to_string);
        Some(MutationRecord::Attribute {
            target,
            name,
            value,
        })
    }

    fn text_record(&self, tree: &DomTree, raw: &RawMutation) -> Option<MutationRecord> {
        if let Some(target) = self.registry.lookup(raw.target) {
            return Some(MutationRecord::Text {
                target,
                payload: TextPayload::Text(tree.text_content(raw.target)),
            });
        }

        // Text nodes carry no identity; fall back to the owning element
        let parent = tree.parent_element(raw.target)?;
        let target = self.registry.lookup(parent)?;
        Some(MutationRecord::Text {
            target,
            payload: TextPayload::Html(self.capture.serialize_inner(tree, parent)),
        })
    }

    fn node_record(&mut self, tree: &mut DomTree, raw: &RawMutation) -> Option<MutationRecord> {
        let added: Vec<NodeId> = raw
            .added_nodes
            .iter()
            .copied()
            .filter(|&n| is_recordable(tree, n))
            .collect();
        let removed: Vec<NodeId> = raw
            .removed_nodes
            .iter()
            .copied()
            .filter(|&n| is_recordable(tree, n))
            .collect();
        if added.is_empty() && removed.is_empty() {
            return None;
        }

        let target = self.registry.lookup(raw.target)?;
        let prev = raw.previous_sibling.and_then(|n| self.registry.lookup(n));
        let next = raw.next_sibling.and_then(|n| self.registry.lookup(n));

        let add: Vec<AddedNode> = added
            .into_iter()
            .filter_map(|n| self.added_entry(tree, n))
            .collect();
        let remove: Vec<RemovedNode> = removed
            .into_iter()
            .filter_map(|n| self.removed_entry(tree, n))
            .collect();
        if add.is_empty() && remove.is_empty() {
            return None;
        }

        Some(MutationRecord::Node {
            target,
            prev,
            next,
            add,
            remove,
        })
    }

    fn added_entry(&mut self, tree: &mut DomTree, node: NodeId) -> Option<AddedNode> {
        match tree.node_type(node)? {
            NodeType::Text => Some(AddedNode::Text {
                html: tree.text_content(node),
                index: index_in_parent(tree, node),
            }),
            NodeType::Element => {
                // Already moved out again: nothing to anchor or register
                if tree.parent(node).is_none() {
                    return Some(AddedNode::Element {
                        html: self.capture.serialize_outer(tree, node),
                        index: None,
                        ids: Vec::new(),
                    });
                }

                let ids = self.registry.register_subtree(tree, node);
                let index = index_in_parent(tree, node);
                let html = self.capture.serialize_outer(tree, node);
                self.registry.unmark(tree, node, true);
                Some(AddedNode::Element { html, index, ids })
            }
            NodeType::Document | NodeType::DocumentType | NodeType::Comment => None,
        }
    }

    fn removed_entry(&self, tree: &DomTree, node: NodeId) -> Option<RemovedNode> {
        match tree.node_type(node)? {
            NodeType::Text => Some(RemovedNode::Text {
                index: index_in_parent(tree, node),
                text: tree.text_content(node),
            }),
            NodeType::Element => self
                .registry
                .lookup(node)
                .map(|target| RemovedNode::Element { target }),
            NodeType::Document | NodeType::DocumentType | NodeType::Comment => None,
        }
    }

    /// Release identities of removed elements that are still detached
    fn reclaim_detached(&mut self, tree: &DomTree, batch: &[RawMutation]) {
        let mut released = 0;
        for raw in batch {
            for &node in &raw.removed_nodes {
                if tree.is_element(node) && !tree.is_connected(node) {
                    released += self.registry.release_subtree(tree, node);
                }
            }
        }
        if released > 0 {
            tracing::debug!("Released {} detached identities", released);
            self.stats.released += released as u64;
        }
    }
}

/// Comments and scripts never reach a record
fn is_recordable(tree: &DomTree, node: NodeId) -> bool {
    match tree.node_type(node) {
        Some(NodeType::Comment) | None => false,
        Some(NodeType::Element) => tree.tag_name(node) != Some("script"),
        Some(_) => true,
    }
}

fn index_in_parent(tree: &DomTree, node: NodeId) -> Option<usize> {
    let parent = tree.parent(node)?;
    tree.child_index(parent, node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Identity, DEFAULT_MARKER_ATTRIBUTE};
    use fos_html::HtmlParser;

    /// Parsed, snapshotted and observed document plus its transcriber
    fn recording(html: &str) -> (Document, MutationTranscriber) {
        recording_with(html, RecorderConfig::default())
    }

    fn recording_with(html: &str, config: RecorderConfig) -> (Document, MutationTranscriber) {
        let mut doc = HtmlParser::new().parse(html).unwrap();
        let mut registry = Registry::new(&config.marker_attribute);
        registry.take_snapshot(&mut doc).unwrap();
        let mut transcriber = MutationTranscriber::new(registry, &config);
        transcriber.install(&mut doc).unwrap();
        (doc, transcriber)
    }

    fn drain(doc: &mut Document, transcriber: &mut MutationTranscriber) -> Vec<MutationRecord> {
        let mut out = Vec::new();
        transcriber.deliver(doc, |record| out.push(record));
        out
    }

    fn first_in_body(doc: &Document) -> NodeId {
        doc.tree().element_children(doc.body().unwrap())[0]
    }

    #[test]
    fn test_attribute_value_is_read_live() {
        let (mut doc, mut transcriber) = recording("<div></div>");
        let div = first_in_body(&doc);
        let id = transcriber.registry().lookup(div).unwrap();

        doc.tree_mut().set_attribute(div, "class", "a").unwrap();
        doc.tree_mut().set_attribute(div, "class", "b").unwrap();
        doc.tree_mut().remove_attribute(div, "title").unwrap();

        let records = drain(&mut doc, &mut transcriber);
        let expected = MutationRecord::Attribute {
            target: id,
            name: "class".into(),
            value: Some("b".into()),
        };
        assert_eq!(records, vec![expected.clone(), expected]);
    }

    #[test]
    fn test_removed_attribute_has_no_value() {
        let (mut doc, mut transcriber) = recording("<div title=\"t\"></div>");
        let div = first_in_body(&doc);
        doc.tree_mut().remove_attribute(div, "title").unwrap();

        let records = drain(&mut doc, &mut transcriber);
        assert!(matches!(
            &records[..],
            [MutationRecord::Attribute { value: None, .. }]
        ));
    }

    #[test]
    fn test_marker_writes_are_ignored() {
        let (mut doc, mut transcriber) = recording("<div></div>");
        let div = first_in_body(&doc);
        doc.tree_mut()
            .set_attribute(div, DEFAULT_MARKER_ATTRIBUTE, "99")
            .unwrap();
        doc.tree_mut()
            .remove_attribute(div, DEFAULT_MARKER_ATTRIBUTE)
            .unwrap();

        assert!(drain(&mut doc, &mut transcriber).is_empty());
        assert_eq!(transcriber.stats().ignored, 2);
    }

    #[test]
    fn test_script_targets_are_ignored() {
        let (mut doc, mut transcriber) = recording("<p></p><script>var a;</script>");
        let body = doc.body().unwrap();
        let script = doc
            .tree()
            .element_children(body)
            .into_iter()
            .find(|&e| doc.tree().tag_name(e) == Some("script"))
            .unwrap();
        doc.tree_mut().set_attribute(script, "src", "x.js").unwrap();
        doc.tree_mut().set_text_content(script, "var b;").unwrap();

        assert!(drain(&mut doc, &mut transcriber).is_empty());
    }

    #[test]
    fn test_text_edit_falls_back_to_parent_markup() {
        let (mut doc, mut transcriber) = recording("<p>hello <b>you</b></p>");
        let p = first_in_body(&doc);
        let text = doc.tree().first_child(p).unwrap();
        doc.tree_mut().set_text(text, "bye ").unwrap();

        let records = drain(&mut doc, &mut transcriber);
        assert_eq!(
            records,
            vec![MutationRecord::Text {
                target: transcriber.registry().lookup(p).unwrap(),
                payload: TextPayload::Html("bye <b>you</b>".into()),
            }]
        );
    }

    #[test]
    fn test_text_edit_on_detached_node_is_dropped() {
        let (mut doc, mut transcriber) = recording("<p>hello</p>");
        let p = first_in_body(&doc);
        let text = doc.tree().first_child(p).unwrap();
        let raw = RawMutation::character_data(text, None);
        doc.tree_mut().remove_child(p, text).unwrap();

        assert_eq!(transcriber.transcribe(doc.tree_mut(), &raw), None);
        assert_eq!(transcriber.stats().dropped, 1);
    }

    #[test]
    fn test_added_element_is_registered_and_clean() {
        let (mut doc, mut transcriber) = recording("<ul><li>a</li></ul>");
        let ul = first_in_body(&doc);
        let before = transcriber.registry().last_assigned().unwrap().get();

        let roots = fos_html::HtmlParser::new()
            .parse_fragment_into(doc.tree_mut(), "<li class=\"n\"><a href=\"#\">b</a></li>")
            .unwrap();
        doc.tree_mut().append_child(ul, roots[0]).unwrap();

        let records = drain(&mut doc, &mut transcriber);
        let [MutationRecord::Node { target, add, remove, .. }] = &records[..] else {
            panic!("expected one node record, got {records:?}");
        };
        assert_eq!(Some(*target), transcriber.registry().lookup(ul));
        assert!(remove.is_empty());
        assert_eq!(
            add,
            &vec![AddedNode::Element {
                html: "<li class=\"n\"><a href=\"#\">b</a></li>".into(),
                index: Some(1),
                ids: vec![Identity::from(before + 1), Identity::from(before + 2)],
            }]
        );

        let li = roots[0];
        let a = doc.tree().element_children(li)[0];
        assert!(!doc.tree().has_attribute(li, DEFAULT_MARKER_ATTRIBUTE));
        assert!(!doc.tree().has_attribute(a, DEFAULT_MARKER_ATTRIBUTE));
        assert_eq!(transcriber.registry().lookup(a), Some(Identity::from(before + 2)));

        // Marker bookkeeping comes back next batch and is swallowed
        assert!(drain(&mut doc, &mut transcriber).is_empty());
    }

    #[test]
    fn test_siblings_are_resolved() {
        let (mut doc, mut transcriber) = recording("<div><i></i><u></u></div>");
        let div = first_in_body(&doc);
        let children = doc.tree().element_children(div);
        let [i, u] = children[..] else {
            panic!("expected two children");
        };
        let em = doc.tree_mut().create_element("em");
        doc.tree_mut().insert_before(div, em, Some(u)).unwrap();

        let records = drain(&mut doc, &mut transcriber);
        let registry = transcriber.registry();
        let MutationRecord::Node { prev, next, .. } = &records[0] else {
            panic!("expected a node record");
        };
        assert_eq!(*prev, registry.lookup(i));
        assert_eq!(*next, registry.lookup(u));
    }

    #[test]
    fn test_removed_entries() {
        let (mut doc, mut transcriber) = recording("<div>t<span></span></div>");
        let div = first_in_body(&doc);
        let children = doc.tree().child_ids(div);
        let [text, span] = children[..] else {
            panic!("expected two children");
        };
        let span_id = transcriber.registry().lookup(span).unwrap();
        doc.tree_mut().remove_child(div, span).unwrap();
        doc.tree_mut().remove_child(div, text).unwrap();

        let records = drain(&mut doc, &mut transcriber);
        assert_eq!(records.len(), 2);
        assert!(matches!(
            &records[0],
            MutationRecord::Node { remove, .. }
                if remove == &vec![RemovedNode::Element { target: span_id }]
        ));
        assert!(matches!(
            &records[1],
            MutationRecord::Node { remove, .. }
                if remove == &vec![RemovedNode::Text { index: None, text: "t".into() }]
        ));
    }

    #[test]
    fn test_moved_text_keeps_index_in_new_parent() {
        let (mut doc, mut transcriber) = recording("<div>t<span></span></div>");
        let div = first_in_body(&doc);
        let children = doc.tree().child_ids(div);
        let [text, span] = children[..] else {
            panic!("expected two children");
        };
        doc.tree_mut().append_child(span, text).unwrap();

        let records = drain(&mut doc, &mut transcriber);
        let registry = transcriber.registry();
        assert_eq!(
            records,
            vec![
                MutationRecord::Node {
                    target: registry.lookup(div).unwrap(),
                    prev: None,
                    next: registry.lookup(span),
                    add: Vec::new(),
                    remove: vec![RemovedNode::Text {
                        index: Some(0),
                        text: "t".into(),
                    }],
                },
                MutationRecord::Node {
                    target: registry.lookup(span).unwrap(),
                    prev: None,
                    next: None,
                    add: vec![AddedNode::Text {
                        html: "t".into(),
                        index: Some(0),
                    }],
                    remove: Vec::new(),
                },
            ]
        );
    }

    #[test]
    fn test_nested_adds_in_one_batch_share_ids() {
        let (mut doc, mut transcriber) = recording("<ul></ul>");
        let ul = first_in_body(&doc);
        let li = doc.tree_mut().create_element("li");
        doc.tree_mut().append_child(ul, li).unwrap();
        let a = doc.tree_mut().create_element("a");
        doc.tree_mut().append_child(li, a).unwrap();

        let records = drain(&mut doc, &mut transcriber);
        let added: Vec<&AddedNode> = records
            .iter()
            .flat_map(|r| match r {
                MutationRecord::Node { add, .. } => add.iter().collect::<Vec<_>>(),
                _ => Vec::new(),
            })
            .collect();
        let registry = transcriber.registry();
        let (li_id, a_id) = (registry.lookup(li).unwrap(), registry.lookup(a).unwrap());
        assert_eq!(
            added,
            vec![
                &AddedNode::Element {
                    html: "<li><a></a></li>".into(),
                    index: Some(0),
                    ids: vec![li_id, a_id],
                },
                &AddedNode::Element {
                    html: "<a></a>".into(),
                    index: Some(0),
                    ids: vec![a_id],
                },
            ]
        );
    }

    #[test]
    fn test_element_gone_before_delivery() {
        let (mut doc, mut transcriber) = recording("<div></div>");
        let div = first_in_body(&doc);
        let p = doc.tree_mut().create_element("p");
        let text = doc.tree_mut().create_text("x");
        doc.tree_mut().append_child(p, text).unwrap();
        doc.tree_mut().append_child(div, p).unwrap();
        doc.tree_mut().remove_child(div, p).unwrap();

        let records = drain(&mut doc, &mut transcriber);
        assert_eq!(
            records,
            vec![MutationRecord::Node {
                target: transcriber.registry().lookup(div).unwrap(),
                prev: None,
                next: None,
                add: vec![AddedNode::Element {
                    html: "<p>x</p>".into(),
                    index: None,
                    ids: Vec::new(),
                }],
                remove: Vec::new(),
            }]
        );
        assert_eq!(transcriber.registry().lookup(p), None);
        // The removal names an element that never got an identity
        assert_eq!(transcriber.stats().dropped, 1);
    }

    #[test]
    fn test_comment_only_changes_are_dropped() {
        let (mut doc, mut transcriber) = recording("<div></div>");
        let div = first_in_body(&doc);
        let comment = doc.tree_mut().create_comment("note");
        doc.tree_mut().append_child(div, comment).unwrap();
        doc.tree_mut().remove_child(div, comment).unwrap();
        let script = doc.tree_mut().create_element("script");
        doc.tree_mut().append_child(div, script).unwrap();

        assert!(drain(&mut doc, &mut transcriber).is_empty());
        assert_eq!(transcriber.stats().dropped, 3);
    }

    #[test]
    fn test_unknown_parent_is_dropped() {
        let (mut doc, mut transcriber) = recording("<div></div>");
        let orphan = doc.tree_mut().create_element("section");
        let child = doc.tree_mut().create_element("p");
        let raw = RawMutation::child_list(orphan, vec![child], Vec::new(), None, None);

        assert_eq!(transcriber.transcribe(doc.tree_mut(), &raw), None);
        // Nothing was registered on the way
        assert_eq!(transcriber.registry().lookup(child), None);
    }

    #[test]
    fn test_reclaim_on_detach() {
        let config = RecorderConfig {
            reclaim: ReclaimPolicy::OnDetach,
            ..Default::default()
        };
        let (mut doc, mut transcriber) = recording_with("<div><p><b></b></p></div>", config);
        let div = first_in_body(&doc);
        let p = doc.tree().element_children(div)[0];
        let known = transcriber.registry().len();

        doc.tree_mut().remove_child(div, p).unwrap();
        let records = drain(&mut doc, &mut transcriber);
        assert_eq!(records.len(), 1);
        assert_eq!(transcriber.registry().len(), known - 2);
        assert_eq!(transcriber.stats().released, 2);
    }

    #[test]
    fn test_moved_element_keeps_identity_under_reclaim() {
        let config = RecorderConfig {
            reclaim: ReclaimPolicy::OnDetach,
            ..Default::default()
        };
        let (mut doc, mut transcriber) = recording_with("<div><p></p></div><section></section>", config);
        let body = doc.body().unwrap();
        let children = doc.tree().element_children(body);
        let [div, section] = children[..] else {
            panic!("expected two children");
        };
        let p = doc.tree().element_children(div)[0];
        let id = transcriber.registry().lookup(p);

        doc.tree_mut().append_child(section, p).unwrap();
        let records = drain(&mut doc, &mut transcriber);
        assert_eq!(records.len(), 2);
        assert_eq!(transcriber.registry().lookup(p), id);
    }

    #[test]
    fn test_install_requires_observer_support() {
        let mut doc = HtmlParser::new().parse("<p></p>").unwrap();
        doc.tree_mut().set_mutation_observer_supported(false);
        let config = RecorderConfig::default();
        let mut transcriber = MutationTranscriber::new(Registry::new(DEFAULT_MARKER_ATTRIBUTE), &config);

        assert!(matches!(
            transcriber.install(&mut doc),
            Err(RecorderError::MutationObservationUnavailable)
        ));
        assert!(!transcriber.is_installed());
    }

    #[test]
    fn test_uninstall_stops_delivery() {
        let (mut doc, mut transcriber) = recording("<div></div>");
        let div = first_in_body(&doc);
        assert!(transcriber.uninstall(&mut doc));
        assert!(!transcriber.uninstall(&mut doc));

        doc.tree_mut().set_attribute(div, "id", "x").unwrap();
        assert!(drain(&mut doc, &mut transcriber).is_empty());
        assert!(transcriber.registry().lookup(div).is_some());
    }
}

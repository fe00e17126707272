//! HTML5 Parser implementation
//!
//! Uses html5ever's RcDom and converts it into the arena DOM.

use fos_dom::{Document, DomTree, NodeId, ReadyState};
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use crate::ParseError;

/// HTML5 parser
#[derive(Debug, Default)]
pub struct HtmlParser;

impl HtmlParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse HTML string into a Document
    pub fn parse(&self, html: &str) -> Result<Document, ParseError> {
        self.parse_with_url(html, "about:blank")
    }

    /// Parse HTML with a base URL. The returned document is complete.
    pub fn parse_with_url(&self, html: &str, url: &str) -> Result<Document, ParseError> {
        tracing::debug!("Parsing HTML document: {}", url);

        let dom = read(html)?;
        let mut tree = DomTree::new();
        let root = tree.root();
        for child in dom.document.children.borrow().iter() {
            convert_node(child, &mut tree, root)?;
        }

        tracing::debug!("Parsed {} nodes", tree.len());
        Ok(Document::from_tree(url, tree, ReadyState::Complete))
    }

    /// Build detached nodes for a markup fragment in body context.
    ///
    /// Returns the top-level nodes in source order; they are not linked into
    /// any parent.
    pub fn parse_fragment_into(
        &self,
        tree: &mut DomTree,
        html: &str,
    ) -> Result<Vec<NodeId>, ParseError> {
        let dom = read(&format!(
            "<!DOCTYPE html><html><head></head><body>{html}</body></html>"
        ))?;
        let body = find_body(&dom.document).ok_or(ParseError::MissingBody)?;

        let mut roots = Vec::new();
        for child in body.children.borrow().iter() {
            if let Some(id) = convert_node(child, tree, NodeId::NONE)? {
                roots.push(id);
            }
        }
        Ok(roots)
    }
}

fn read(html: &str) -> Result<RcDom, ParseError> {
    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())?;
    Ok(dom)
}

fn find_body(document: &Handle) -> Option<Handle> {
    let html = document
        .children
        .borrow()
        .iter()
        .find(|c| is_element_named(c, "html"))
        .cloned()?;
    let body = html
        .children
        .borrow()
        .iter()
        .find(|c| is_element_named(c, "body"))
        .cloned();
    body
}

fn is_element_named(handle: &Handle, tag: &str) -> bool {
    matches!(&handle.data, RcNodeData::Element { name, .. } if &*name.local == tag)
}

/// Convert an RcDom node (and its subtree) into the arena.
///
/// The new node is appended to `parent` unless `parent` is `NodeId::NONE`.
fn convert_node(
    handle: &Handle,
    tree: &mut DomTree,
    parent: NodeId,
) -> Result<Option<NodeId>, ParseError> {
    let id = match &handle.data {
        RcNodeData::Document => {
            for child in handle.children.borrow().iter() {
                convert_node(child, tree, parent)?;
            }
            return Ok(None);
        }
        RcNodeData::Doctype {
            name,
            public_id,
            system_id,
        } => tree.create_doctype(name, public_id, system_id),
        RcNodeData::Text { contents } => tree.create_text(&contents.borrow()),
        RcNodeData::Comment { contents } => tree.create_comment(contents),
        RcNodeData::Element { name, attrs, .. } => {
            let id = tree.create_element_ns(&name.ns, &name.local);
            for attr in attrs.borrow().iter() {
                tree.set_attribute(id, &attr.name.local, &attr.value)?;
            }
            for child in handle.children.borrow().iter() {
                convert_node(child, tree, id)?;
            }
            id
        }
        RcNodeData::ProcessingInstruction { .. } => return Ok(None),
    };

    if parent.is_valid() {
        tree.append_child(parent, id)?;
    }
    Ok(Some(id))
}

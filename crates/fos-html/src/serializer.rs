//! HTML Serialization (innerHTML/outerHTML)
//!
//! Serializes DOM nodes to HTML strings the way a browser reports them:
//! - proper escaping of text and attribute values
//! - void elements without end tags
//! - raw text for script/style
//!
//! A serializer can be told to leave one attribute out, which keeps
//! bookkeeping attributes out of captured markup.

use fos_dom::{DomTree, NodeData, NodeId};

/// Void elements (no end tag)
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Raw text elements (no escaping for content)
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

/// HTML serializer
#[derive(Debug, Clone, Default)]
pub struct HtmlSerializer {
    skip_attribute: Option<String>,
}

impl HtmlSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializer that omits attribute `name` from every element
    pub fn skipping_attribute(name: &str) -> Self {
        Self {
            skip_attribute: Some(name.to_string()),
        }
    }

    /// Serialize innerHTML of a node (children only)
    pub fn serialize_inner(&self, tree: &DomTree, node_id: NodeId) -> String {
        let mut output = String::new();
        self.serialize_children(tree, node_id, &mut output);
        output
    }

    /// Serialize outerHTML of a node (including the node itself)
    pub fn serialize_outer(&self, tree: &DomTree, node_id: NodeId) -> String {
        let mut output = String::new();
        self.serialize_node(tree, node_id, &mut output);
        output
    }

    fn serialize_node(&self, tree: &DomTree, node_id: NodeId, output: &mut String) {
        let Some(node) = tree.get(node_id) else {
            return;
        };

        match &node.data {
            NodeData::Document => {
                self.serialize_children(tree, node_id, output);
            }
            NodeData::Element(elem) => {
                let tag = tree.resolve(elem.name.local);

                output.push('<');
                output.push_str(tag);
                for attr in &elem.attrs {
                    let name = tree.resolve(attr.name);
                    if self.skip_attribute.as_deref() == Some(name) {
                        continue;
                    }
                    output.push(' ');
                    output.push_str(name);
                    output.push_str("=\"");
                    escape_attribute(&attr.value, output);
                    output.push('"');
                }
                output.push('>');

                if VOID_ELEMENTS.contains(&tag) {
                    return;
                }

                if RAW_TEXT_ELEMENTS.contains(&tag) {
                    for (_, child) in tree.children(node_id) {
                        if let Some(text) = child.as_text() {
                            output.push_str(text);
                        }
                    }
                } else {
                    self.serialize_children(tree, node_id, output);
                }

                output.push_str("</");
                output.push_str(tag);
                output.push('>');
            }
            NodeData::Text(text) => {
                escape_text(&text.content, output);
            }
            NodeData::Comment(text) => {
                output.push_str("<!--");
                output.push_str(text);
                output.push_str("-->");
            }
            NodeData::Doctype { name, .. } => {
                output.push_str("<!DOCTYPE ");
                output.push_str(tree.resolve(*name));
                output.push('>');
            }
        }
    }

    fn serialize_children(&self, tree: &DomTree, parent_id: NodeId, output: &mut String) {
        for (child_id, _) in tree.children(parent_id) {
            self.serialize_node(tree, child_id, output);
        }
    }
}

/// Escape text content for HTML
fn escape_text(text: &str, output: &mut String) {
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '\u{a0}' => output.push_str("&nbsp;"),
            _ => output.push(c),
        }
    }
}

/// Escape attribute value
fn escape_attribute(text: &str, output: &mut String) {
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '"' => output.push_str("&quot;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '\u{a0}' => output.push_str("&nbsp;"),
            _ => output.push(c),
        }
    }
}

/// innerHTML of a node
pub fn get_inner_html(tree: &DomTree, node_id: NodeId) -> String {
    HtmlSerializer::new().serialize_inner(tree, node_id)
}

/// outerHTML of a node
pub fn get_outer_html(tree: &DomTree, node_id: NodeId) -> String {
    HtmlSerializer::new().serialize_outer(tree, node_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text() {
        let mut output = String::new();
        escape_text("Hello <world> & \"friends\"", &mut output);
        assert_eq!(output, "Hello &lt;world&gt; &amp; \"friends\"");
    }

    #[test]
    fn test_escape_attribute() {
        let mut output = String::new();
        escape_attribute("a \"b\" & c", &mut output);
        assert_eq!(output, "a &quot;b&quot; &amp; c");
    }

    #[test]
    fn test_outer_and_inner() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let br = tree.create_element("br");
        let text = tree.create_text("a < b");
        tree.set_attribute(div, "class", "box").unwrap();
        tree.set_attribute(div, "hidden", "").unwrap();
        tree.append_child(div, text).unwrap();
        tree.append_child(div, br).unwrap();

        assert_eq!(
            get_outer_html(&tree, div),
            r#"<div class="box" hidden="">a &lt; b<br></div>"#
        );
        assert_eq!(get_inner_html(&tree, div), "a &lt; b<br>");
    }

    #[test]
    fn test_raw_text_and_comments() {
        let mut tree = DomTree::new();
        let script = tree.create_element("script");
        let code = tree.create_text("if (a < b) {}");
        let comment = tree.create_comment(" note ");
        tree.append_child(script, code).unwrap();

        assert_eq!(get_outer_html(&tree, script), "<script>if (a < b) {}</script>");
        assert_eq!(get_outer_html(&tree, comment), "<!-- note -->");
    }

    #[test]
    fn test_skipping_attribute() {
        let mut tree = DomTree::new();
        let ul = tree.create_element("ul");
        let li = tree.create_element("li");
        tree.append_child(ul, li).unwrap();
        tree.set_attribute(ul, "data-recorder-id", "1").unwrap();
        tree.set_attribute(li, "data-recorder-id", "2").unwrap();
        tree.set_attribute(li, "class", "item").unwrap();

        let html = HtmlSerializer::skipping_attribute("data-recorder-id").serialize_outer(&tree, ul);
        assert_eq!(html, r#"<ul><li class="item"></li></ul>"#);
    }
}

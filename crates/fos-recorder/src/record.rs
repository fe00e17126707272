//! Mutation records
//!
//! The persisted shape of one transcribed change. Serialized with a `type`
//! tag (`attribute`, `text` or `node`) and the target identity; see the
//! variant docs for the kind-specific fields.

use serde::{Deserialize, Serialize};

use crate::Identity;

/// One structured, identity-addressed DOM change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MutationRecord {
    /// `{"type":"attribute","target":n,"name":s,"value":s|null}`.
    /// `value` is read from the live element; `null` means removed.
    Attribute {
        target: Identity,
        name: String,
        value: Option<String>,
    },
    /// `{"type":"text","target":n,"html":s}` or `{..,"text":s}`
    Text {
        target: Identity,
        #[serde(flatten)]
        payload: TextPayload,
    },
    /// Children added to and/or removed from `target`
    Node {
        target: Identity,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prev: Option<Identity>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        next: Option<Identity>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        add: Vec<AddedNode>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        remove: Vec<RemovedNode>,
    },
}

/// Payload of a text record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextPayload {
    /// Full inner markup of the owning element
    Html(String),
    /// New text content of the target itself
    Text(String),
}

/// Entry of a node record's `add` list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AddedNode {
    #[serde(rename = "text")]
    Text {
        html: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    /// `ids` lists the identities assigned to the element and its
    /// descendant elements, in tree order, matching the order elements
    /// appear in `html`.
    ///
    /// `html` is captured when the batch is delivered, so it already holds
    /// children added later in the same batch. Those children also get their
    /// own entries, carrying ids listed here. Replay must skip an element
    /// whose identity it has already inserted.
    #[serde(rename = "ele")]
    Element {
        html: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        ids: Vec<Identity>,
    },
}

/// Entry of a node record's `remove` list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RemovedNode {
    /// Without an index, replay locates the node between `prev` and `next`
    #[serde(rename = "text")]
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
        text: String,
    },
    #[serde(rename = "ele")]
    Element { target: Identity },
}

impl MutationRecord {
    /// Identity the record is addressed to
    pub fn target(&self) -> Identity {
        match self {
            Self::Attribute { target, .. } | Self::Text { target, .. } | Self::Node { target, .. } => {
                *target
            }
        }
    }

    /// `"attribute"`, `"text"` or `"node"`
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Attribute { .. } => "attribute",
            Self::Text { .. } => "text",
            Self::Node { .. } => "node",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

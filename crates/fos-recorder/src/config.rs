//! Recorder Configuration

use fos_dom::MutationObserverInit;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Marker attribute used when none is configured
pub const DEFAULT_MARKER_ATTRIBUTE: &str = "data-recorder-id";

/// What happens to identities of elements that leave the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReclaimPolicy {
    /// Keep every association for the page lifetime
    #[default]
    Retain,
    /// Drop associations of elements still detached at the end of a batch
    OnDetach,
}

/// Recorder configuration options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Record DOM mutations
    pub mutation: bool,

    /// Attribute that carries an element's identity through serialization
    pub marker_attribute: String,

    /// Record attribute changes
    pub attributes: bool,

    /// Record text edits
    pub character_data: bool,

    /// Identity reclamation for detached elements
    pub reclaim: ReclaimPolicy,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            mutation: true,
            marker_attribute: DEFAULT_MARKER_ATTRIBUTE.to_string(),
            attributes: true,
            character_data: true,
            reclaim: ReclaimPolicy::Retain,
        }
    }
}

impl RecorderConfig {
    /// Load from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Host observer options for the document subtree
    pub fn observer_init(&self) -> MutationObserverInit {
        MutationObserverInit {
            child_list: true,
            attributes: self.attributes,
            character_data: self.character_data,
            subtree: true,
            ..Default::default()
        }
    }
}

//! Capture channels
//!
//! Everything the [`Recorder`](crate::Recorder) multiplexes implements
//! [`Observer`]. The mutation channel is built in; console, input, network
//! and error capture plug in from outside and emit opaque JSON payloads.

use fos_dom::Document;
use serde::Serialize;

use crate::{MutationRecord, MutationTranscriber, Result};

/// One item of the recorded stream
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Mutation(MutationRecord),
    External {
        channel: String,
        data: serde_json::Value,
    },
}

impl Record {
    /// Record for an external channel
    pub fn external(channel: &str, data: serde_json::Value) -> Self {
        Record::External {
            channel: channel.to_string(),
            data,
        }
    }

    pub fn as_mutation(&self) -> Option<&MutationRecord> {
        match self {
            Record::Mutation(record) => Some(record),
            Record::External { .. } => None,
        }
    }
}

impl From<MutationRecord> for Record {
    fn from(record: MutationRecord) -> Self {
        Record::Mutation(record)
    }
}

/// A capture channel.
///
/// Implement this trait to feed another kind of page activity into the
/// recorded stream.
pub trait Observer {
    /// Channel name, used in logs
    fn name(&self) -> &str;

    /// Start observing. Called once by the recorder.
    fn install(&mut self, document: &mut Document) -> Result<()>;

    /// Stop observing; further deliveries emit nothing
    fn uninstall(&mut self, document: &mut Document);

    fn is_active(&self) -> bool;

    /// Push everything captured since the last call to `emit`, in capture
    /// order. Returns the number of records emitted.
    fn deliver(&mut self, document: &mut Document, emit: &mut dyn FnMut(Record)) -> usize;
}

impl Observer for MutationTranscriber {
    fn name(&self) -> &str {
        "mutation"
    }

    fn install(&mut self, document: &mut Document) -> Result<()> {
        MutationTranscriber::install(self, document)
    }

    fn uninstall(&mut self, document: &mut Document) {
        MutationTranscriber::uninstall(self, document);
    }

    fn is_active(&self) -> bool {
        self.is_installed()
    }

    fn deliver(&mut self, document: &mut Document, emit: &mut dyn FnMut(Record)) -> usize {
        MutationTranscriber::deliver(self, document, |record| emit(Record::Mutation(record)))
    }
}

//! fOS Recorder
//!
//! DOM observation core for replayable page recordings.
//!
//! Two pieces work together:
//! - [`Registry`] gives every live element a small integer [`Identity`],
//!   mirrors it onto the element as a marker attribute, and takes the one-time
//!   document snapshot.
//! - [`MutationTranscriber`] turns the host's raw mutation notifications into
//!   ordered [`MutationRecord`]s addressed by identity.
//!
//! [`Recorder`] drives both and multiplexes their output with any other
//! [`Observer`] into one sequenced stream.
//!
//! # Example
//! ```rust,ignore
//! use fos_recorder::{Recorder, RecorderConfig};
//!
//! let mut doc = fos_html::parse("<div id=app></div>")?;
//! let mut recorder = Recorder::new(RecorderConfig::default());
//! recorder.start(&mut doc)?;
//! // ... page mutates `doc` ...
//! recorder.pump(&mut doc, |event| println!("{}", event.to_json()))?;
//! ```

mod config;
mod error;
mod identity;
mod observer;
mod record;
mod recorder;
mod registry;
mod transcriber;

pub use config::{ReclaimPolicy, RecorderConfig, DEFAULT_MARKER_ATTRIBUTE};
pub use error::{RecorderError, Result};
pub use identity::Identity;
pub use observer::{Observer, Record};
pub use record::{AddedNode, MutationRecord, RemovedNode, TextPayload};
pub use recorder::{Envelope, Recorder, RecorderState};
pub use registry::{Registry, SnapshotState};
pub use transcriber::{MutationTranscriber, TranscriberStats};

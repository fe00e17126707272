//! Recorder errors

use fos_dom::DomError;

/// Result type for recorder operations
pub type Result<T> = std::result::Result<T, RecorderError>;

/// Recorder error
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("Mutation observation unavailable")]
    MutationObservationUnavailable,

    #[error("Document snapshot already taken")]
    SnapshotAlreadyTaken,

    #[error("Document has no root element to observe")]
    NoDocumentElement,

    #[error("Recorder already started")]
    AlreadyStarted,

    #[error("DOM error: {0}")]
    Dom(#[from] DomError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

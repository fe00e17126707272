//! Recorder
//!
//! Drives the observation lifecycle for one document: startup check,
//! snapshot bootstrap, then one [`pump`](Recorder::pump) per event-loop turn
//! until [`stop`](Recorder::stop).

use std::fmt;

use fos_dom::Document;
use serde::Serialize;

use crate::{
    MutationTranscriber, Observer, Record, RecorderConfig, RecorderError, Registry, Result,
    SnapshotState,
};

/// A record with its position in the combined stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub seq: u64,
    pub record: Record,
}

impl Envelope {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Recorder lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    /// Waiting for the document to become interactive
    Bootstrapping,
    Recording,
    Stopped,
}

/// Recording orchestrator
pub struct Recorder {
    config: RecorderConfig,
    mutation: Option<MutationTranscriber>,
    observers: Vec<Box<dyn Observer>>,
    seq: u64,
    state: RecorderState,
}

impl fmt::Debug for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.observers.iter().map(|o| o.name()).collect();
        f.debug_struct("Recorder")
            .field("config", &self.config)
            .field("mutation", &self.mutation)
            .field("observers", &names)
            .field("seq", &self.seq)
            .field("state", &self.state)
            .finish()
    }
}

impl Recorder {
    pub fn new(config: RecorderConfig) -> Self {
        let mutation = config.mutation.then(|| {
            MutationTranscriber::new(Registry::new(&config.marker_attribute), &config)
        });
        Self {
            config,
            mutation,
            observers: Vec::new(),
            seq: 0,
            state: RecorderState::Idle,
        }
    }

    /// Add an external capture channel
    pub fn with_observer(mut self, observer: impl Observer + 'static) -> Self {
        self.add_observer(Box::new(observer));
        self
    }

    pub fn add_observer(&mut self, observer: Box<dyn Observer>) {
        self.observers.push(observer);
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    /// The Document Snapshot, once bootstrap has completed
    pub fn snapshot(&self) -> Option<&str> {
        self.registry()?.snapshot()
    }

    pub fn registry(&self) -> Option<&Registry> {
        self.mutation.as_ref().map(MutationTranscriber::registry)
    }

    pub fn transcriber(&self) -> Option<&MutationTranscriber> {
        self.mutation.as_ref()
    }

    /// Start recording.
    ///
    /// Fails with [`RecorderError::MutationObservationUnavailable`] when the
    /// host has no mutation observer API. External channels are installed
    /// right away; the mutation channel waits for the snapshot, which is
    /// deferred while the document is still loading.
    pub fn start(&mut self, document: &mut Document) -> Result<()> {
        if self.state != RecorderState::Idle {
            return Err(RecorderError::AlreadyStarted);
        }
        if self.mutation.is_some() && !document.tree().supports_mutation_observer() {
            tracing::warn!("Cannot record {}: mutation observation unavailable", document.url());
            return Err(RecorderError::MutationObservationUnavailable);
        }

        for i in 0..self.observers.len() {
            if let Err(err) = self.observers[i].install(document) {
                tracing::warn!(
                    "Observer '{}' failed to install: {}",
                    self.observers[i].name(),
                    err
                );
                for installed in &mut self.observers[..i] {
                    installed.uninstall(document);
                }
                return Err(err);
            }
            tracing::debug!("Observer '{}' installed", self.observers[i].name());
        }

        self.state = RecorderState::Bootstrapping;
        self.bootstrap(document)
    }

    fn bootstrap(&mut self, document: &mut Document) -> Result<()> {
        if let Some(transcriber) = &mut self.mutation {
            // A failed install is retried without snapshotting again
            if !transcriber.registry().is_initialized()
                && transcriber.registry_mut().take_snapshot(document)? == SnapshotState::Deferred
            {
                return Ok(());
            }
            Observer::install(transcriber, document)?;
        }

        self.state = RecorderState::Recording;
        tracing::info!("Recording {} ({} channels)", document.url(), self.channel_count());
        Ok(())
    }

    fn channel_count(&self) -> usize {
        self.observers.len() + usize::from(self.mutation.is_some())
    }

    /// One event-loop turn.
    ///
    /// Finishes a deferred bootstrap if the document became ready, then
    /// drains the mutation channel followed by every external channel.
    /// Returns the number of envelopes passed to `sink`.
    pub fn pump(
        &mut self,
        document: &mut Document,
        mut sink: impl FnMut(Envelope),
    ) -> Result<usize> {
        match self.state {
            RecorderState::Idle | RecorderState::Stopped => return Ok(0),
            RecorderState::Bootstrapping => self.bootstrap(document)?,
            RecorderState::Recording => {}
        }

        let mut count = 0;
        let seq = &mut self.seq;
        let mut push = |record: Record| {
            sink(Envelope { seq: *seq, record });
            *seq += 1;
            count += 1;
        };

        if let Some(transcriber) = &mut self.mutation {
            Observer::deliver(transcriber, document, &mut push);
        }
        for observer in &mut self.observers {
            observer.deliver(document, &mut push);
        }
        Ok(count)
    }

    /// Uninstall every channel. Pending notifications are discarded, so
    /// `pump` first to keep them.
    pub fn stop(&mut self, document: &mut Document) {
        if self.state == RecorderState::Stopped {
            return;
        }
        if let Some(transcriber) = &mut self.mutation {
            Observer::uninstall(transcriber, document);
        }
        for observer in &mut self.observers {
            observer.uninstall(document);
        }
        self.state = RecorderState::Stopped;
        tracing::debug!("Recording stopped after {} records", self.seq);
    }
}

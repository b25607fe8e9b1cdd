//! Load event system for observability.
//!
//! Emits [`LoadEvent`]s via a [`tokio::sync::broadcast`] channel so that
//! external observers (loggers, progress displays, tests) can follow a load
//! without coupling to the loader internals.

use serde::{Deserialize, Serialize};

/// Events emitted while loading, resolving and transforming a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LoadEvent {
    LoadStarted {
        root_path: String,
    },
    SubtreeRetrieved {
        root_path: String,
        descendant_count: usize,
    },
    RecordsResolved {
        record_count: usize,
    },
    StageStarted {
        stage: String,
    },
    StageCompleted {
        stage: String,
        duration_ms: u64,
    },
    LoadCompleted {
        root_path: String,
        record_count: usize,
        duration_ms: u64,
    },
    LoadFailed {
        root_path: Option<String>,
        error: String,
    },
}

/// Event emitter wrapping a broadcast sender.
#[derive(Clone)]
pub struct EventEmitter {
    sender: tokio::sync::broadcast::Sender<LoadEvent>,
}

impl EventEmitter {
    /// Create a new emitter with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all current subscribers.
    ///
    /// If there are no active receivers the event is silently dropped.
    pub fn emit(&self, event: LoadEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<LoadEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(256)
    }
}

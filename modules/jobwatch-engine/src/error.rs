use jobwatch_events::TagError;
use thiserror::Error;

use crate::sink::SinkError;

/// Why an event could not be applied. The reducer never recovers locally;
/// callers decide whether to skip the event or stop.
#[derive(Debug, Error)]
pub enum ReduceError {
    #[error(transparent)]
    MalformedTag(#[from] TagError),

    #[error("return from {mid} for unknown job {jid}")]
    UnknownJob { jid: String, mid: String },

    #[error("minion {mid} is not a target of job {jid}")]
    UnknownMinion { jid: String, mid: String },

    #[error("event {tag} has missing or invalid data: {source}")]
    MissingField {
        tag: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl ReduceError {
    /// True when the observer is gone and further events are pointless.
    pub fn is_sink_failure(&self) -> bool {
        matches!(self, ReduceError::Sink(_))
    }
}

//! Salt event bus records as seen by the projection.
//!
//! An event is a slash-delimited tag plus an opaque JSON payload. This crate
//! classifies tags, decodes the payloads the projection cares about into
//! typed records, and reads events off a line-oriented feed.

pub mod source;
pub mod tag;
pub mod types;

pub use source::{parse_line, EventSource, LineError, SourceError};
pub use tag::{classify, EventKind, TagError};
pub use types::{JobReturnData, NewJobData, SaltEvent, GRAINS_FUNCTION};

//! Real-time job projection.
//!
//! `EventReducer` folds salt job events into a table of jobs (and, in grains
//! mode, a table of minions) and pushes the whole updated table to a
//! `SnapshotSink` after every change. The reducer owns its state; one
//! reducer serves one observer session.

pub mod error;
pub mod reducer;
pub mod sink;

pub use error::ReduceError;
pub use reducer::{EventReducer, Snapshot};
pub use sink::{ChannelSink, MemorySink, SinkError, SnapshotSink};

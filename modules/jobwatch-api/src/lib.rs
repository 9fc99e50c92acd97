//! Websocket service exposing the real-time job projection.
//!
//! One feeder task reads the event bus and fans events out over a broadcast
//! channel. Each websocket session that signals readiness gets its own
//! reducer fed from that channel.

pub mod feed;
pub mod routes;
pub mod session;

pub use routes::{router, AppState};

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub type JobId = String;
pub type MinionId = String;

/// All jobs known to a projection, keyed by jid.
///
/// Salt jids are `YYYYMMDDhhmmssffffff` timestamps, so key order is also
/// submission order.
pub type JobTable = BTreeMap<JobId, Job>;

/// Static minion metadata keyed by minion id.
pub type MinionTable = BTreeMap<MinionId, MinionInfo>;

// --- Jobs ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Running,
    Complete,
}

/// One execution dispatched to a set of target minions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub jid: JobId,
    pub start_time: String,
    /// Fixed at creation: one entry per targeted minion.
    pub minions: BTreeMap<MinionId, MinionResult>,
    pub fun: String,
    /// A glob string for most target types, a list for `list` targeting.
    pub tgt: Value,
    pub tgt_type: String,
    pub state: JobState,
}

impl Job {
    /// True when every targeted minion has reported `success: true`.
    /// Minions that have not reported yet count as not succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.minions.values().all(MinionResult::succeeded)
    }

    pub fn is_complete(&self) -> bool {
        self.state == JobState::Complete
    }
}

/// Per-minion outcome of a job.
///
/// Fields stay unset (and are omitted on the wire) until the minion returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinionResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(
        rename = "return",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_value"
    )]
    pub ret: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retcode: Option<i64>,
}

/// A `return` key that is present is kept, even when it is `null`.
fn present_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl MinionResult {
    /// Entry for a minion that has not returned yet. With `prefill_success`
    /// the record starts out as `{"success": false}`, otherwise as `{}`.
    pub fn pending(prefill_success: bool) -> Self {
        Self {
            success: prefill_success.then_some(false),
            ..Self::default()
        }
    }

    pub fn succeeded(&self) -> bool {
        self.success == Some(true)
    }

    pub fn has_returned(&self) -> bool {
        self.retcode.is_some() || self.ret.is_some()
    }
}

// --- Minions ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinionInfo {
    pub grains: Value,
}
